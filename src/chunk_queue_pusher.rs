// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Port of shared_memory/include/entity/chunk_queue_pusher.hpp.
//
// The producer-side handle onto a `ChunkQueueData`: converts a
// `SharedChunk` to its SSUC form and tries a non-blocking push, leaving
// the blocking/retry/eviction policy entirely to the caller (the
// distributor, §4.11) since a bare pusher never knows whether its queue
// is meant to block or discard.

use std::sync::Arc;

use crate::relative_pointer::SegmentId;
use crate::shared_chunk::SharedChunk;
use crate::chunk_queue_data::ChunkQueueData;

/// Producer-side handle onto one subscriber's [`ChunkQueueData`].
///
/// Port of `shm::entity::ChunkQueuePusher<ChunkQueueDataType>`.
pub struct ChunkQueuePusher<const CAPACITY: usize> {
    data: Arc<ChunkQueueData<CAPACITY>>,
}

impl<const CAPACITY: usize> ChunkQueuePusher<CAPACITY> {
    pub fn new(data: Arc<ChunkQueueData<CAPACITY>>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &Arc<ChunkQueueData<CAPACITY>> {
        &self.data
    }

    /// Try to push `chunk` without blocking. On success, ownership
    /// (the refcount share) moves into the queue slot. On failure the
    /// chunk is handed back to the caller untouched so it can decide
    /// whether to retry, drop, or escalate to `lost_a_chunk()`.
    ///
    /// An evicted sibling slot (under a `DiscardOldestData` backing
    /// queue) is returned alongside success so the caller can release
    /// its refcount share.
    pub fn push(
        &self,
        chunk: SharedChunk,
        segment_id: SegmentId,
    ) -> Result<Option<SharedChunk>, SharedChunk> {
        let ssuc = crate::shm_safe_unmanaged_chunk::ShmSafeUnmanagedChunk::from_shared_chunk(
            chunk, segment_id,
        );
        match self.data.push(ssuc) {
            None => Ok(None),
            Some(mut evicted) if evicted == ssuc => {
                // The backing queue rejected the push outright (the
                // non-overflowing variant): reclaim our own slot.
                Err(evicted.release_to_shared_chunk().expect("slot just created is non-null"))
            }
            Some(mut evicted) => {
                // An overflowing (Sofi) queue evicted a *different*,
                // older slot; our chunk is now queued.
                Ok(Some(evicted.release_to_shared_chunk().expect("evicted slot is non-null")))
            }
        }
    }

    /// Mark that a chunk could not be delivered and was lost.
    pub fn lost_a_chunk(&self) {
        self.data.set_lost_a_chunk();
    }

    pub fn has_lost_chunks(&self) -> bool {
        self.data.has_lost_chunks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port_policy::QueueFullPolicy;

    #[test]
    fn push_to_non_overflowing_queue_rejects_when_full() {
        let data: Arc<ChunkQueueData<1>> = Arc::new(ChunkQueueData::new(QueueFullPolicy::BlockProducer));
        let pusher = ChunkQueuePusher::new(data);
        let a = SharedChunk::from_raw(std::ptr::null_mut());
        assert_eq!(pusher.push(a, 0), Ok(None));
        let b = SharedChunk::from_raw(std::ptr::null_mut());
        assert!(pusher.push(b, 0).is_err());
    }
}
