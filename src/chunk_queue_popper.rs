// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Port of shared_memory/include/entity/chunk_queue_popper.hpp.
//
// The consumer-side handle onto a `ChunkQueueData`: pops an SSUC and
// turns it into an owning `SharedChunk`. Paired with `ChunkQueuePusher`
// (same `ChunkQueueData`, opposite ends).

use std::sync::Arc;

use crate::chunk_queue_data::ChunkQueueData;
use crate::shared_chunk::SharedChunk;

/// Consumer-side handle onto one [`ChunkQueueData`].
///
/// Port of `shm::entity::ChunkQueuePopper<ChunkQueueDataType>`.
pub struct ChunkQueuePopper<const CAPACITY: usize> {
    data: Arc<ChunkQueueData<CAPACITY>>,
}

impl<const CAPACITY: usize> ChunkQueuePopper<CAPACITY> {
    pub fn new(data: Arc<ChunkQueueData<CAPACITY>>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &Arc<ChunkQueueData<CAPACITY>> {
        &self.data
    }

    /// Pop the oldest queued chunk, if any, converting ownership into a
    /// `SharedChunk` the caller now holds.
    pub fn pop(&self) -> Option<SharedChunk> {
        let mut ssuc = self.data.pop()?;
        ssuc.release_to_shared_chunk()
    }

    pub fn empty(&self) -> bool {
        self.data.empty()
    }

    pub fn size(&self) -> u64 {
        self.data.size()
    }

    pub fn has_lost_chunks(&self) -> bool {
        self.data.has_lost_chunks()
    }

    pub fn clear_lost_chunks_flag(&self) {
        self.data.clear_lost_chunks_flag()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port_policy::QueueFullPolicy;

    #[test]
    fn pop_from_empty_queue_is_none() {
        let data: Arc<ChunkQueueData<2>> = Arc::new(ChunkQueueData::new(QueueFullPolicy::BlockProducer));
        let popper = ChunkQueuePopper::new(data);
        assert!(popper.pop().is_none());
        assert!(popper.empty());
    }
}
