// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Port of shared_memory/include/memory/memory_pool.hpp.
//
// A fixed-size chunk allocator: `chunk_count` chunks of `chunk_size`
// bytes carved out of one contiguous region, handed out and reclaimed via
// a LoFFLi lock-free free-list.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::fatal;
use crate::loffli::{Index, LoFFLi};

/// Chunk payload memory must be aligned (and sized in multiples of) this
/// many bytes, so every `ChunkHeader` placed at a chunk's start satisfies
/// its own alignment requirement.
pub const CHUNK_MEMORY_ALIGNMENT: usize = 8;

/// A fixed-size chunk allocator backed by a lock-free free-list.
///
/// Port of `shm::memory::MemPool`. Owns neither the chunk memory nor the
/// free-list index memory — both are supplied by the caller (typically
/// bump-allocated out of a shared-memory segment, see [`crate::config`])
/// so the pool itself can be placed inside that same segment.
pub struct MemPool {
    raw_memory: *mut u8,
    chunk_size: u32,
    chunk_count: u32,
    used_chunks: AtomicU32,
    min_free: AtomicU32,
    free_indices: LoFFLi,
}

unsafe impl Send for MemPool {}
unsafe impl Sync for MemPool {}

impl MemPool {
    /// `chunk_memory` must point to `chunk_count * chunk_size` bytes;
    /// `index_memory` must point to
    /// [`crate::loffli::LoFFLi::required_index_memory_size`]`(chunk_count)`
    /// bytes. Both must outlive the returned `MemPool`.
    ///
    /// Aborts the process if `chunk_size` is not a multiple of
    /// [`CHUNK_MEMORY_ALIGNMENT`] or is smaller than it — this is an
    /// invariant violation per §7, not a recoverable error.
    ///
    /// # Safety
    /// `chunk_memory` and `index_memory` must be valid, non-overlapping,
    /// and exclusively owned by this `MemPool` for its entire lifetime.
    pub unsafe fn new(
        chunk_size: u32,
        chunk_count: u32,
        chunk_memory: *mut u8,
        index_memory: *mut Index,
    ) -> Self {
        if chunk_size as usize % CHUNK_MEMORY_ALIGNMENT != 0 || chunk_size == 0 {
            fatal("mempool chunk_size must be a non-zero multiple of 8");
        }
        Self {
            raw_memory: chunk_memory,
            chunk_size,
            chunk_count,
            used_chunks: AtomicU32::new(0),
            min_free: AtomicU32::new(chunk_count),
            free_indices: LoFFLi::init(index_memory, chunk_count),
        }
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    pub fn chunk_count(&self) -> u32 {
        self.chunk_count
    }

    pub fn used_chunks(&self) -> u32 {
        self.used_chunks.load(Ordering::Acquire)
    }

    /// Non-increasing high-water mark of the free-list's low point.
    pub fn min_free(&self) -> u32 {
        self.min_free.load(Ordering::Acquire)
    }

    /// Pop a free chunk. Returns null if the pool is exhausted.
    pub fn get_chunk(&self) -> *mut u8 {
        match self.free_indices.pop() {
            Some(index) => {
                let used = self.used_chunks.fetch_add(1, Ordering::AcqRel) + 1;
                let free_now = self.chunk_count - used;
                self.min_free.fetch_min(free_now, Ordering::AcqRel);
                self.index_to_pointer(index)
            }
            None => std::ptr::null_mut(),
        }
    }

    /// Return a chunk previously obtained from [`Self::get_chunk`].
    /// Aborts the process on a detected double-free, matching §7's
    /// "invariant violations are fatal" policy (LoFFLi itself only
    /// reports the condition via a `bool`; this is where it's escalated).
    pub fn free_chunk(&self, ptr: *mut u8) {
        let index = self.pointer_to_index(ptr);
        if !self.free_indices.push(index) {
            fatal("mempool double-free detected");
        }
        self.used_chunks.fetch_sub(1, Ordering::AcqRel);
    }

    pub fn index_to_pointer(&self, index: Index) -> *mut u8 {
        unsafe { self.raw_memory.add(index as usize * self.chunk_size as usize) }
    }

    pub fn pointer_to_index(&self, ptr: *mut u8) -> Index {
        let diff = ptr as usize - self.raw_memory as usize;
        if diff % self.chunk_size as usize != 0 {
            fatal("pointer does not fall on a chunk boundary of this mempool");
        }
        (diff / self.chunk_size as usize) as Index
    }
}
