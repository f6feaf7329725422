// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Port of shared_memory/include/entity/chunk_queue_data.hpp.
//
// The receiving side's queue state: a fixed-capacity `VariantQueue` of
// `ShmSafeUnmanagedChunk` slots, the policy a producer should follow
// once it is full, and an optional wake notifier a blocked
// `ChunkQueuePusher` (under `WaitForConsumer`) or any other waiter can
// use. The notifier is a thin, process-local stand-in for the full
// listener/trigger machinery described in the original — a single
// named `Waiter` shared by `Arc`, satisfying exactly the one signal
// this crate's queues need: "something was popped, a blocked pusher
// may proceed."

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::port_policy::QueueFullPolicy;
use crate::shm_safe_unmanaged_chunk::ShmSafeUnmanagedChunk;
use crate::unique_id::UniqueId;
use crate::variant_queue::{VariantQueue, VariantQueueType};
use crate::waiter::Waiter;

/// Port of `shm::entity::ChunkQueueData<ChunkQueueDataProperties, LockingPolicy>`.
pub struct ChunkQueueData<const CAPACITY: usize> {
    unique_id: UniqueId,
    queue: VariantQueue<ShmSafeUnmanagedChunk, CAPACITY>,
    queue_has_lost_chunks: AtomicBool,
    queue_full_policy: QueueFullPolicy,
    notifier: Mutex<Option<Arc<Waiter>>>,
}

impl<const CAPACITY: usize> ChunkQueueData<CAPACITY> {
    pub fn new(queue_full_policy: QueueFullPolicy) -> Self {
        let queue_type = match queue_full_policy {
            QueueFullPolicy::BlockProducer => VariantQueueType::FifoMultiProducerSingleConsumer,
            QueueFullPolicy::DiscardOldestData => {
                VariantQueueType::SofiMultiProducerSingleConsumer
            }
        };
        Self {
            unique_id: UniqueId::new(),
            queue: VariantQueue::new(queue_type),
            queue_has_lost_chunks: AtomicBool::new(false),
            queue_full_policy,
            notifier: Mutex::new(None),
        }
    }

    pub fn unique_id(&self) -> UniqueId {
        self.unique_id
    }

    pub fn queue_full_policy(&self) -> QueueFullPolicy {
        self.queue_full_policy
    }

    /// Record that a chunk was irrecoverably lost (a push failed under
    /// `BlockProducer` and the caller chose not to retry). Sticky until
    /// explicitly cleared by whoever consumes the diagnostic.
    pub fn set_lost_a_chunk(&self) {
        self.queue_has_lost_chunks.store(true, Ordering::Relaxed);
    }

    pub fn has_lost_chunks(&self) -> bool {
        self.queue_has_lost_chunks.load(Ordering::Relaxed)
    }

    pub fn clear_lost_chunks_flag(&self) {
        self.queue_has_lost_chunks.store(false, Ordering::Relaxed);
    }

    pub fn capacity(&self) -> u64 {
        self.queue.capacity()
    }

    pub fn size(&self) -> u64 {
        self.queue.size()
    }

    pub fn empty(&self) -> bool {
        self.queue.empty()
    }

    /// Push a chunk slot. Returns the slot that had to be evicted, if
    /// any — the caller (the pusher) is responsible for releasing it
    /// back to its `SharedChunk`/mempool.
    pub fn push(&self, chunk: ShmSafeUnmanagedChunk) -> Option<ShmSafeUnmanagedChunk> {
        self.queue.push(chunk)
    }

    pub fn pop(&self) -> Option<ShmSafeUnmanagedChunk> {
        let popped = self.queue.pop();
        if popped.is_some() {
            if let Some(notifier) = self.notifier.lock().unwrap_or_else(|e| e.into_inner()).as_ref()
            {
                let _ = notifier.notify();
            }
        }
        popped
    }

    pub fn attach_notifier(&self, notifier: Arc<Waiter>) {
        *self.notifier.lock().unwrap_or_else(|e| e.into_inner()) = Some(notifier);
    }

    pub fn detach_notifier(&self) {
        *self.notifier.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn has_notifier(&self) -> bool {
        self.notifier.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }
}
