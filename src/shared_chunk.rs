// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Port of shared_memory/include/memory/shared_chunk.hpp.
//
// A single-owner, refcounted handle to an allocated chunk. Cloning
// increments the shared refcount in the `ChunkManagement` control block;
// dropping decrements it and, on the 1 -> 0 transition, returns the user
// chunk to its mempool and the control block itself to the
// chunk-management pool.
//
// Deliberately NOT `Send`/`Sync`: the refcount atomic only protects
// sharing *between distinct handles*; a single handle value must not be
// concurrently mutated (matches the original's non-thread-safe contract).

use std::marker::PhantomData;

use crate::chunk_header::ChunkHeader;
use crate::chunk_management::ChunkManagement;

/// Process-local, refcounted handle to one allocated chunk.
pub struct SharedChunk {
    management: *mut ChunkManagement,
    // Opt out of auto Send/Sync.
    _not_sync: PhantomData<*const ()>,
}

impl SharedChunk {
    /// Wrap a freshly-allocated control block (refcount already
    /// initialized to 1 by [`ChunkManagement::new`]).
    pub(crate) fn new(management: *mut ChunkManagement) -> Self {
        Self {
            management,
            _not_sync: PhantomData,
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.management.is_null()
    }

    pub fn chunk_header(&self) -> Option<&ChunkHeader> {
        if self.management.is_null() {
            return None;
        }
        unsafe { (*self.management).header_ptr().as_ref() }
    }

    pub fn chunk_header_mut(&mut self) -> Option<&mut ChunkHeader> {
        if self.management.is_null() {
            return None;
        }
        unsafe { (*self.management).header_ptr().as_mut() }
    }

    pub fn user_payload(&mut self) -> *mut u8 {
        match self.chunk_header_mut() {
            Some(h) => h.user_payload(),
            None => std::ptr::null_mut(),
        }
    }

    pub fn reference_count(&self) -> u64 {
        if self.management.is_null() {
            return 0;
        }
        unsafe { (*self.management).reference_count() }
    }

    /// Raw control-block pointer. Used by the SSUC conversion functions
    /// and by `UsedChunkList`; callers must not free this address
    /// themselves.
    pub(crate) fn management_ptr(&self) -> *mut ChunkManagement {
        self.management
    }

    /// Consume `self` without running `Drop` (no refcount change),
    /// handing the raw pointer to the caller. Used by
    /// `ShmSafeUnmanagedChunk::from_shared_chunk`.
    pub(crate) fn into_raw(self) -> *mut ChunkManagement {
        let ptr = self.management;
        std::mem::forget(self);
        ptr
    }

    /// Reconstruct a `SharedChunk` from a raw control-block pointer
    /// without touching the refcount. Used by
    /// `ShmSafeUnmanagedChunk::release_to_shared_chunk`.
    pub(crate) fn from_raw(management: *mut ChunkManagement) -> Self {
        Self::new(management)
    }

    fn free(&mut self) {
        if self.management.is_null() {
            return;
        }
        unsafe {
            let mgmt = &*self.management;
            let header_ptr = mgmt.header_ptr();
            if let Some(pool) = mgmt.mempool() {
                pool.free_chunk(header_ptr as *mut u8);
            }
            if let Some(mgmt_pool) = mgmt.chunk_management_pool() {
                mgmt_pool.free_chunk(self.management as *mut u8);
            }
        }
        self.management = std::ptr::null_mut();
    }
}

impl Clone for SharedChunk {
    fn clone(&self) -> Self {
        if !self.management.is_null() {
            unsafe { (*self.management).increment() };
        }
        Self {
            management: self.management,
            _not_sync: PhantomData,
        }
    }
}

impl Drop for SharedChunk {
    fn drop(&mut self) {
        if self.management.is_null() {
            return;
        }
        let was_last = unsafe { (*self.management).decrement() };
        if was_last {
            self.free();
        }
    }
}

impl PartialEq for SharedChunk {
    fn eq(&self, other: &Self) -> bool {
        self.management == other.management
    }
}
