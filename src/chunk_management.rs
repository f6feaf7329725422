// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Port of shared_memory/include/memory/chunk_management.hpp.
//
// The control block behind every `SharedChunk`: a relative pointer to the
// chunk's header, a refcount, and back-pointers to the two pools (user
// chunk pool and chunk-management-record pool) needed to return both the
// payload and this very record once the refcount reaches zero.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::chunk_header::ChunkHeader;
use crate::mempool::MemPool;
use crate::relative_pointer::RelativePointer;

/// Control block for one allocated chunk. Binary layout (§6): header
/// (RelPtr, 8B), refcount (u64, 8B), mempool (RelPtr, 8B),
/// chunk-management-pool (RelPtr, 8B) — 32 bytes total, well within the
/// 64-byte/8-byte-aligned budget.
#[repr(C)]
pub struct ChunkManagement {
    header: RelativePointer<ChunkHeader>,
    reference_counter: AtomicU64,
    mempool: RelativePointer<MemPool>,
    chunk_management_pool: RelativePointer<MemPool>,
}

const _: () = assert!(std::mem::size_of::<ChunkManagement>() <= 64);
const _: () = assert!(std::mem::align_of::<ChunkManagement>() <= 8);

impl ChunkManagement {
    pub fn new(
        header: RelativePointer<ChunkHeader>,
        mempool: RelativePointer<MemPool>,
        chunk_management_pool: RelativePointer<MemPool>,
    ) -> Self {
        Self {
            header,
            reference_counter: AtomicU64::new(1),
            mempool,
            chunk_management_pool,
        }
    }

    pub fn header_ptr(&self) -> *mut ChunkHeader {
        self.header.get()
    }

    pub fn mempool(&self) -> Option<&'static MemPool> {
        unsafe { self.mempool.as_ref() }
    }

    pub fn chunk_management_pool(&self) -> Option<&'static MemPool> {
        unsafe { self.chunk_management_pool.as_ref() }
    }

    pub fn reference_count(&self) -> u64 {
        self.reference_counter.load(Ordering::Acquire)
    }

    /// Relaxed increment: the caller already holds a valid reference, so
    /// there's nothing new to synchronize-with on the increment side.
    pub(crate) fn increment(&self) {
        self.reference_counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns `true` iff this decrement was the one that took the count
    /// to zero (acquire ordering so the decrementer that frees the chunk
    /// observes every prior write to the payload).
    pub(crate) fn decrement(&self) -> bool {
        self.reference_counter.fetch_sub(1, Ordering::AcqRel) == 1
    }
}
