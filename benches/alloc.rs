// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Allocation and queue throughput benchmarks.
//
// Run with:
//   cargo bench --bench alloc --features bump_alloc,slab_pool
//
// Groups:
//   buffer_global    — Vec<u8> via the global allocator (baseline)
//   buffer_bump      — bumpalo arena (feature = bump_alloc)
//   slab_fixed_64    — slab pool of 64-byte blocks (feature = slab_pool)
//   mempool_chunks   — MemPool::get_chunk/free_chunk round trip
//   queue_push_pop   — LockFreeQueue push/pop round trip

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use libipc::lockfree_queue::LockFreeQueue;
use libipc::loffli::{Index, LoFFLi};
use libipc::mempool::MemPool;

// ---------------------------------------------------------------------------
// Workload sizes (mirrors the chunk sizes typical pub/sub payloads use)
// ---------------------------------------------------------------------------

const SMALL: usize = 48;
const MEDIUM: usize = 256;
const LARGE: usize = 4096;

const SIZES: &[(&str, usize)] = &[
    ("small_48", SMALL),
    ("medium_256", MEDIUM),
    ("large_4096", LARGE),
];

// ---------------------------------------------------------------------------
// Baseline: global allocator (Vec<u8>)
// ---------------------------------------------------------------------------

fn bench_global_alloc(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_global");

    for &(label, size) in SIZES {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(label), &size, |b, &sz| {
            b.iter(|| {
                let v: Vec<u8> = vec![0xABu8; sz];
                black_box(v)
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// bumpalo: allocate into arena, reset between iterations
// ---------------------------------------------------------------------------

#[cfg(feature = "bump_alloc")]
fn bench_bump_alloc(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_bump");

    for &(label, size) in SIZES {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(label), &size, |b, &sz| {
            let mut arena = libipc::mem::BumpArena::with_capacity(sz * 2);
            b.iter(|| {
                let slice = arena.alloc_bytes(sz, 1);
                slice.fill(0xAB);
                black_box(&*slice);
                arena.reset();
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// slab: fixed-size block pool — 64-byte blocks
// ---------------------------------------------------------------------------

#[cfg(feature = "slab_pool")]
fn bench_slab_64(c: &mut Criterion) {
    let mut group = c.benchmark_group("slab_fixed_64");
    group.throughput(Throughput::Bytes(64));

    group.bench_function("insert_remove", |b| {
        let mut pool = libipc::mem::SlabPool::<64>::with_capacity(32);
        b.iter(|| {
            let key = pool.insert_zeroed();
            if let Some(block) = pool.get_mut(key) {
                block[0] = 0xAB;
                black_box(&*block);
            }
            pool.remove(key);
        });
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// MemPool: get_chunk/free_chunk round trip at a few chunk sizes
// ---------------------------------------------------------------------------

fn make_mempool(chunk_size: u32, chunk_count: u32) -> (Vec<u8>, Vec<Index>, MemPool) {
    let mut chunk_mem = vec![0u8; chunk_size as usize * chunk_count as usize];
    let mut index_mem =
        vec![0 as Index; LoFFLi::required_index_memory_size(chunk_count as usize) / 4];
    let pool = unsafe {
        MemPool::new(
            chunk_size,
            chunk_count,
            chunk_mem.as_mut_ptr(),
            index_mem.as_mut_ptr(),
        )
    };
    (chunk_mem, index_mem, pool)
}

fn bench_mempool_chunks(c: &mut Criterion) {
    let mut group = c.benchmark_group("mempool_chunks");

    for &(label, size) in &[("64", 64u32), ("1024", 1024u32)] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(label), &size, |b, &chunk_size| {
            let (_mem, _idx, pool) = make_mempool(chunk_size, 256);
            b.iter(|| {
                let ptr = pool.get_chunk();
                black_box(ptr);
                pool.free_chunk(ptr);
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// LockFreeQueue: push/pop round trip
// ---------------------------------------------------------------------------

fn bench_queue_push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_push_pop");
    group.throughput(Throughput::Elements(1));

    group.bench_function("push_pop_u32_cap_256", |b| {
        let q: LockFreeQueue<u32, 256> = LockFreeQueue::new();
        let mut next = 0u32;
        b.iter(|| {
            q.try_push(next);
            next = next.wrapping_add(1);
            black_box(q.pop());
        });
    });

    group.bench_function("push_overflow_evict_cap_4", |b| {
        let q: LockFreeQueue<u32, 4> = LockFreeQueue::new();
        for i in 0..4 {
            q.try_push(i);
        }
        let mut next = 4u32;
        b.iter(|| {
            black_box(q.push(next));
            next = next.wrapping_add(1);
        });
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Criterion entry points
// ---------------------------------------------------------------------------

#[cfg(all(feature = "bump_alloc", feature = "slab_pool"))]
criterion_group!(
    benches,
    bench_global_alloc,
    bench_bump_alloc,
    bench_slab_64,
    bench_mempool_chunks,
    bench_queue_push_pop,
);

#[cfg(all(feature = "bump_alloc", not(feature = "slab_pool")))]
criterion_group!(
    benches,
    bench_global_alloc,
    bench_bump_alloc,
    bench_mempool_chunks,
    bench_queue_push_pop,
);

#[cfg(all(not(feature = "bump_alloc"), feature = "slab_pool"))]
criterion_group!(
    benches,
    bench_global_alloc,
    bench_slab_64,
    bench_mempool_chunks,
    bench_queue_push_pop,
);

#[cfg(all(not(feature = "bump_alloc"), not(feature = "slab_pool")))]
criterion_group!(
    benches,
    bench_global_alloc,
    bench_mempool_chunks,
    bench_queue_push_pop,
);

criterion_main!(benches);
