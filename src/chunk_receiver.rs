// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Port of shared_memory/include/entity/chunk_receiver.hpp and
// src/entity/chunk_receiver.cc.
//
// Port-level consumer: wraps a `ChunkQueuePopper` with its own
// `UsedChunkList` so chunks currently held by the receiving user process
// are recoverable if that process crashes before releasing them.

use std::sync::Arc;

use crate::chunk_header::ChunkHeader;
use crate::chunk_queue_data::ChunkQueueData;
use crate::chunk_queue_popper::ChunkQueuePopper;
use crate::relative_pointer::SegmentId;
use crate::used_chunk_list::UsedChunkList;

/// Port-level consumer.
///
/// Port of `shm::entity::ChunkReceiver<ChunkQueuePopperType>`.
///
/// `QUEUE_CAP` is the backing `ChunkQueueData`'s capacity; `USED_CAPACITY`
/// should be `max_chunks_held_simultaneously + 1` (§4.13).
pub struct ChunkReceiver<const QUEUE_CAP: usize, const USED_CAPACITY: usize> {
    popper: ChunkQueuePopper<QUEUE_CAP>,
    used_chunks: UsedChunkList<USED_CAPACITY>,
}

impl<const QUEUE_CAP: usize, const USED_CAPACITY: usize> ChunkReceiver<QUEUE_CAP, USED_CAPACITY> {
    /// `segment_id` is the segment this receiver's mapped queue/chunks
    /// live in, used to tag this receiver's `UsedChunkList` entries with
    /// real relative pointers (see `UsedChunkList::new`).
    pub fn new(data: Arc<ChunkQueueData<QUEUE_CAP>>, segment_id: SegmentId) -> Self {
        Self {
            popper: ChunkQueuePopper::new(data),
            used_chunks: UsedChunkList::new(segment_id),
        }
    }

    pub fn queue_data(&self) -> &Arc<ChunkQueueData<QUEUE_CAP>> {
        self.popper.data()
    }

    /// Pop the next queued chunk, recording it in this receiver's
    /// `UsedChunkList` so a crash leaves it recoverable by a supervisor.
    /// Returns the header pointer the user should read from; `None` if
    /// the queue is empty or the user has reached
    /// `max_chunks_held_simultaneously + 1` outstanding chunks.
    pub fn take_chunk(&self) -> Option<*mut ChunkHeader> {
        let mut sc = self.popper.pop()?;
        let header_ptr = sc.chunk_header_mut().map(|h| h as *mut ChunkHeader)?;
        if !self.used_chunks.insert(sc) {
            log::warn!(
                "ChunkReceiver::take_chunk: too many chunks held simultaneously, releasing back"
            );
            return None;
        }
        Some(header_ptr)
    }

    /// Release a chunk obtained from [`Self::take_chunk`] back to its
    /// mempool (once no other owner remains).
    pub fn release(&self, header: *mut ChunkHeader) {
        drop(self.used_chunks.remove(header));
    }

    pub fn has_lost_chunks(&self) -> bool {
        self.popper.has_lost_chunks()
    }

    pub fn empty(&self) -> bool {
        self.popper.empty()
    }

    /// Release every chunk this receiver still holds. Intended for
    /// supervisor-driven cleanup after this port's owning process
    /// crashed.
    ///
    /// # Safety
    /// Only sound if the owning process is actually dead.
    pub unsafe fn release_all(&self) {
        self.used_chunks.cleanup();
    }
}
