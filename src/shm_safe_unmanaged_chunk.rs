// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Port of shared_memory/include/entity/shm_safe_unmanaged_chunk.hpp.
//
// The 8-byte, self-aligned, trivially-copyable slot type stored in every
// queue slot, history-ring slot, and `UsedChunkList` entry. Exactly one
// relative pointer to a `ChunkManagement` record; conversions to/from
// `SharedChunk` are explicit about whether they touch the refcount.

use crate::chunk_header::ChunkHeader;
use crate::chunk_management::ChunkManagement;
use crate::relative_pointer::{RelativePointerData, SegmentId};
use crate::shared_chunk::SharedChunk;

/// Shm-safe unmanaged chunk (SSUC): an 8-byte relative pointer to a
/// `ChunkManagement` record, safe to store in shared memory and read by
/// a crash-recovering observer without ever seeing a torn value.
///
/// `Copy`, like the original's `static_assert(is_trivially_copyable)` —
/// queues move these by value without touching the refcount; exactly
/// one side of a push/pop pair is responsible for treating a given copy
/// as the owning one.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ShmSafeUnmanagedChunk {
    chunk_management: RelativePointerData,
}

const _: () = assert!(std::mem::size_of::<ShmSafeUnmanagedChunk>() == 8);
const _: () = assert!(std::mem::align_of::<ShmSafeUnmanagedChunk>() == 8);

impl ShmSafeUnmanagedChunk {
    /// The logical-null slot (no chunk owned).
    pub fn null() -> Self {
        Self {
            chunk_management: RelativePointerData::null(),
        }
    }

    /// Move ownership of `sc` into this slot without touching the
    /// refcount.
    pub fn from_shared_chunk(sc: SharedChunk, segment_id: SegmentId) -> Self {
        let ptr = sc.into_raw();
        let offset = crate::pointer_repository::repository().offset_of(segment_id, ptr as *const u8);
        Self {
            chunk_management: RelativePointerData::new(segment_id, offset),
        }
    }

    pub fn is_logical_null(&self) -> bool {
        self.chunk_management.is_logical_nullptr()
    }

    fn management_ptr(&self) -> *mut ChunkManagement {
        if self.is_logical_null() {
            return std::ptr::null_mut();
        }
        let id = self.chunk_management.id();
        let offset = self.chunk_management.offset();
        crate::pointer_repository::repository().resolve(id, offset) as *mut ChunkManagement
    }

    /// Move ownership out into a `SharedChunk`. Does not touch the
    /// refcount. Nulls this slot.
    pub fn release_to_shared_chunk(&mut self) -> Option<SharedChunk> {
        if self.is_logical_null() {
            return None;
        }
        let ptr = self.management_ptr();
        self.chunk_management = RelativePointerData::null();
        Some(SharedChunk::from_raw(ptr))
    }

    /// Increment the refcount and return a new `SharedChunk`; this slot
    /// remains valid and keeps owning its share of the refcount.
    pub fn clone_to_shared_chunk(&self) -> Option<SharedChunk> {
        if self.is_logical_null() {
            return None;
        }
        let ptr = self.management_ptr();
        unsafe { (*ptr).increment() };
        Some(SharedChunk::from_raw(ptr))
    }

    pub fn header(&self) -> Option<&ChunkHeader> {
        let ptr = self.management_ptr();
        if ptr.is_null() {
            return None;
        }
        unsafe { (*ptr).header_ptr().as_ref() }
    }

    pub fn has_no_other_owners(&self) -> bool {
        let ptr = self.management_ptr();
        if ptr.is_null() {
            return true;
        }
        unsafe { (*ptr).reference_count() == 1 }
    }
}

impl Default for ShmSafeUnmanagedChunk {
    fn default() -> Self {
        Self::null()
    }
}

unsafe impl Send for ShmSafeUnmanagedChunk {}
unsafe impl Sync for ShmSafeUnmanagedChunk {}
