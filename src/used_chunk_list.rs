// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Port of shared_memory/include/memory/used_chunk_list.hpp.
//
// Crash-safe bookkeeping of the chunks a port (sender or receiver)
// currently holds. Two intrinsic singly-linked lists — `used` and
// `free` — share one side array of next-pointers; the payload array
// holds the actual `ShmSafeUnmanagedChunk` slots. A supervisor process
// can walk `used` via `indices[]` and release every slot even if the
// owning process crashed mid-mutation, because every chunk slot is a
// single 8-byte aligned store (see `ShmSafeUnmanagedChunk`) and
// `cleanup()` only ever reads, never relies on the owner's local state.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::relative_pointer::SegmentId;
use crate::shared_chunk::SharedChunk;
use crate::shm_safe_unmanaged_chunk::ShmSafeUnmanagedChunk;

/// Sentinel marking "no next index" / "list is empty".
const INVALID_INDEX: u32 = u32::MAX;

/// A fixed-capacity, crash-safe list of chunks held by one port.
///
/// Port of `shm::memory::UsedChunkList<Capacity>`. `CAPACITY` should be
/// `max_chunks_allocated_simultaneously + 1` for a sender, or
/// `max_chunks_held_simultaneously + 1` for a receiver (the "+1" is the
/// AUTOSAR-style "hold N, request one more to swap" headroom the spec
/// calls out in §4.12).
pub struct UsedChunkList<const CAPACITY: usize> {
    indices: [AtomicU32; CAPACITY],
    slots: [ShmSafeUnmanagedChunkCell; CAPACITY],
    used_head: AtomicU32,
    free_head: AtomicU32,
    /// Serializes `insert`/`remove` against a concurrent `cleanup()`
    /// invoked by a supervisor after this port's owning process died.
    synchronizer: AtomicBool,
    /// Segment the owning port's chunks live in. Entries are stored as
    /// real relative pointers under this id (not
    /// `RAW_POINTER_BEHAVIOUR_ID`) so a supervisor resolving them after
    /// mapping the same segment at a different base address — §8
    /// scenario 5 — recovers the correct address rather than the
    /// crashed process's own.
    segment_id: SegmentId,
}

/// `ShmSafeUnmanagedChunk` wrapped so it can sit in a plain array behind
/// an `UnsafeCell`-like raw store; the type itself is `Copy` so a direct
/// `Cell` would work too, but using atomics-backed storage keeps every
/// mutation here an explicit, ordered, single-word store matching the
/// the type's own torn-write-proof contract.
struct ShmSafeUnmanagedChunkCell(std::cell::UnsafeCell<ShmSafeUnmanagedChunk>);

unsafe impl Sync for ShmSafeUnmanagedChunkCell {}

impl ShmSafeUnmanagedChunkCell {
    const fn null() -> Self {
        Self(std::cell::UnsafeCell::new(ShmSafeUnmanagedChunk::null()))
    }

    fn get(&self) -> ShmSafeUnmanagedChunk {
        unsafe { *self.0.get() }
    }

    fn set(&self, v: ShmSafeUnmanagedChunk) {
        unsafe { *self.0.get() = v };
    }
}

impl<const CAPACITY: usize> UsedChunkList<CAPACITY> {
    /// `segment_id` is the segment the owning port's chunks are
    /// allocated from; entries are stored as relative pointers under
    /// this id so they resolve correctly for an out-of-process
    /// supervisor (see the field doc on `segment_id`).
    pub fn new(segment_id: SegmentId) -> Self {
        const ZERO: AtomicU32 = AtomicU32::new(0);
        let mut indices = [ZERO; CAPACITY];
        for (i, slot) in indices.iter_mut().enumerate() {
            *slot = AtomicU32::new(if i + 1 < CAPACITY { i as u32 + 1 } else { INVALID_INDEX });
        }
        const NULL_CELL: ShmSafeUnmanagedChunkCell = ShmSafeUnmanagedChunkCell::null();
        Self {
            indices,
            slots: [NULL_CELL; CAPACITY],
            used_head: AtomicU32::new(INVALID_INDEX),
            free_head: AtomicU32::new(if CAPACITY == 0 { INVALID_INDEX } else { 0 }),
            synchronizer: AtomicBool::new(false),
            segment_id,
        }
    }

    pub fn capacity(&self) -> usize {
        CAPACITY
    }

    fn lock(&self) {
        // Bounded spin: this flag is only ever held for a handful of
        // pointer-chasing instructions, by either the owning port or a
        // supervisor's `cleanup()`, never both validly at once.
        while self
            .synchronizer
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            std::hint::spin_loop();
        }
    }

    fn unlock(&self) {
        self.synchronizer.store(false, Ordering::Release);
    }

    /// Insert `sc` into the used list. Returns `false` (dropping `sc`'s
    /// ownership claim — caller must still release it itself) if the
    /// list is already at `CAPACITY`.
    pub fn insert(&self, sc: SharedChunk) -> bool {
        self.lock();
        let free = self.free_head.load(Ordering::Relaxed);
        if free == INVALID_INDEX {
            self.unlock();
            return false;
        }
        let next_free = self.indices[free as usize].load(Ordering::Relaxed);
        self.free_head.store(next_free, Ordering::Relaxed);

        self.slots[free as usize].set(ShmSafeUnmanagedChunk::from_shared_chunk(sc, self.segment_id));
        let used = self.used_head.load(Ordering::Relaxed);
        self.indices[free as usize].store(used, Ordering::Relaxed);
        self.used_head.store(free, Ordering::Release);
        self.unlock();
        true
    }

    /// Remove the entry whose header pointer matches `header`, returning
    /// the `SharedChunk` it held (refcount untouched). `None` if not
    /// found.
    pub fn remove(&self, header: *const crate::chunk_header::ChunkHeader) -> Option<SharedChunk> {
        self.lock();
        let mut prev = INVALID_INDEX;
        let mut cur = self.used_head.load(Ordering::Relaxed);
        while cur != INVALID_INDEX {
            let mut slot = self.slots[cur as usize].get();
            let matches = slot
                .header()
                .map(|h| h as *const _ == header)
                .unwrap_or(false);
            if matches {
                let next = self.indices[cur as usize].load(Ordering::Relaxed);
                if prev == INVALID_INDEX {
                    self.used_head.store(next, Ordering::Relaxed);
                } else {
                    self.indices[prev as usize].store(next, Ordering::Relaxed);
                }
                let sc = slot.release_to_shared_chunk();
                self.slots[cur as usize].set(ShmSafeUnmanagedChunk::null());
                let old_free = self.free_head.load(Ordering::Relaxed);
                self.indices[cur as usize].store(old_free, Ordering::Relaxed);
                self.free_head.store(cur, Ordering::Release);
                self.unlock();
                return sc;
            }
            prev = cur;
            cur = self.indices[cur as usize].load(Ordering::Relaxed);
        }
        self.unlock();
        None
    }

    /// Walk the used list and release every slot back to its pools.
    /// Intended for a supervisor cleaning up after the owning process
    /// crashed.
    ///
    /// # Safety
    /// Only sound if the owning process is actually dead: a live owner
    /// mutating the list concurrently would race with this walk.
    pub unsafe fn cleanup(&self) {
        log::warn!("UsedChunkList::cleanup invoked; releasing {} slot(s) after a crashed peer", self.len());
        self.lock();
        let mut cur = self.used_head.load(Ordering::Relaxed);
        while cur != INVALID_INDEX {
            let next = self.indices[cur as usize].load(Ordering::Relaxed);
            let mut slot = self.slots[cur as usize].get();
            drop(slot.release_to_shared_chunk());
            self.slots[cur as usize].set(ShmSafeUnmanagedChunk::null());
            cur = next;
        }
        self.used_head.store(INVALID_INDEX, Ordering::Relaxed);
        self.unlock();
    }

    fn len(&self) -> usize {
        self.lock();
        let mut n = 0;
        let mut cur = self.used_head.load(Ordering::Relaxed);
        while cur != INVALID_INDEX {
            n += 1;
            cur = self.indices[cur as usize].load(Ordering::Relaxed);
        }
        self.unlock();
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk_header::ChunkSettings;
    use crate::chunk_management::ChunkManagement;
    use crate::loffli::LoFFLi;
    use crate::mempool::MemPool;
    use crate::relative_pointer::RelativePointer;

    struct Harness {
        _chunk_mem: Vec<u8>,
        _chunk_idx: Vec<u32>,
        _mgmt_mem: Vec<u8>,
        _mgmt_idx: Vec<u32>,
        pool: Box<MemPool>,
        mgmt_pool: Box<MemPool>,
    }

    fn harness(chunk_size: u32, chunk_count: u32) -> Harness {
        let mut chunk_mem = vec![0u8; chunk_size as usize * chunk_count as usize];
        let mut chunk_idx = vec![0u32; LoFFLi::required_index_memory_size(chunk_count as usize) / 4];
        let pool = Box::new(unsafe {
            MemPool::new(chunk_size, chunk_count, chunk_mem.as_mut_ptr(), chunk_idx.as_mut_ptr())
        });
        let mgmt_size = std::mem::size_of::<ChunkManagement>() as u32;
        let mut mgmt_mem = vec![0u8; mgmt_size as usize * chunk_count as usize];
        let mut mgmt_idx = vec![0u32; LoFFLi::required_index_memory_size(chunk_count as usize) / 4];
        let mgmt_pool = Box::new(unsafe {
            MemPool::new(mgmt_size, chunk_count, mgmt_mem.as_mut_ptr(), mgmt_idx.as_mut_ptr())
        });
        Harness {
            _chunk_mem: chunk_mem,
            _chunk_idx: chunk_idx,
            _mgmt_mem: mgmt_mem,
            _mgmt_idx: mgmt_idx,
            pool,
            mgmt_pool,
        }
    }

    fn allocate(h: &Harness) -> crate::shared_chunk::SharedChunk {
        let settings = ChunkSettings {
            user_header_size: 0,
            user_header_alignment: 1,
            user_payload_size: 16,
            user_payload_alignment: 8,
        };
        let chunk_size = settings.required_chunk_size();
        let chunk_ptr = h.pool.get_chunk();
        let header = unsafe { crate::chunk_header::ChunkHeader::write_into(chunk_ptr, chunk_size, &settings) };
        let mgmt_ptr = h.mgmt_pool.get_chunk() as *mut ChunkManagement;
        unsafe {
            std::ptr::write(
                mgmt_ptr,
                ChunkManagement::new(
                    RelativePointer::from_raw(0, header as *mut _ as u64),
                    RelativePointer::from_raw(0, &*h.pool as *const MemPool as u64),
                    RelativePointer::from_raw(0, &*h.mgmt_pool as *const MemPool as u64),
                ),
            );
        }
        crate::shared_chunk::SharedChunk::new(mgmt_ptr)
    }

    #[test]
    fn insert_remove_roundtrip() {
        let h = harness(128, 2);
        let list: UsedChunkList<3> = UsedChunkList::new(0);
        let mut a = allocate(&h);
        let header_ptr = a.chunk_header_mut().unwrap() as *const _;
        assert!(list.insert(a));
        let recovered = list.remove(header_ptr).expect("must find inserted chunk");
        assert_eq!(recovered.reference_count(), 1);
    }

    #[test]
    fn insert_fails_when_full() {
        let h = harness(128, 3);
        let list: UsedChunkList<2> = UsedChunkList::new(0);
        assert!(list.insert(allocate(&h)));
        assert!(list.insert(allocate(&h)));
        assert!(!list.insert(allocate(&h)));
    }

    #[test]
    fn cleanup_releases_all_held_chunks() {
        let h = harness(128, 2);
        let list: UsedChunkList<2> = UsedChunkList::new(0);
        list.insert(allocate(&h));
        list.insert(allocate(&h));
        assert_eq!(h.pool.used_chunks(), 2);
        unsafe { list.cleanup() };
        assert_eq!(h.pool.used_chunks(), 0);
        assert_eq!(h.mgmt_pool.used_chunks(), 0);
    }
}
