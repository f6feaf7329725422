// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Port of shared_memory/include/entity/varaint_queue.hpp.
//
// A queue whose overflow behavior is picked at construction time rather
// than by type: non-overflowing (push fails once full) or
// overflow-evicting (push always succeeds, returning whatever it
// displaced). Backed by `LockFreeQueue` for the non-overflowing variant
// (already multi-producer/multi-consumer safe) and `Sofi` for the
// overflowing one (single-producer/single-consumer, matching its
// restricted thread-safety contract). This collapses the four
// producer/consumer-arity variants the original enumerates down to two
// backing implementations — this crate has no separate bounded
// non-overflowing single/multi-producer FIFO types to distinguish.

use crate::lockfree_queue::LockFreeQueue;
use crate::sofi::Sofi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantQueueType {
    FifoSingleProducerSingleConsumer,
    SofiSingleProducerSingleConsumer,
    FifoMultiProducerSingleConsumer,
    SofiMultiProducerSingleConsumer,
}

enum Backing<T: Copy, const CAPACITY: usize> {
    Fifo(LockFreeQueue<T, CAPACITY>),
    Sofi(Sofi<T, CAPACITY>),
}

/// Wrapper selecting a non-overflowing or overflow-evicting queue
/// implementation at runtime.
///
/// Port of `shm::entity::VariantQueue<ValueType, Capacity>`.
pub struct VariantQueue<T: Copy, const CAPACITY: usize> {
    kind: VariantQueueType,
    backing: Backing<T, CAPACITY>,
}

impl<T: Copy + Default, const CAPACITY: usize> VariantQueue<T, CAPACITY> {
    pub fn new(kind: VariantQueueType) -> Self {
        let backing = match kind {
            VariantQueueType::FifoSingleProducerSingleConsumer
            | VariantQueueType::FifoMultiProducerSingleConsumer => {
                Backing::Fifo(LockFreeQueue::new())
            }
            VariantQueueType::SofiSingleProducerSingleConsumer
            | VariantQueueType::SofiMultiProducerSingleConsumer => Backing::Sofi(Sofi::new()),
        };
        Self { kind, backing }
    }

    pub fn queue_type(&self) -> VariantQueueType {
        self.kind
    }

    /// Push `value`. Returns the displaced element: `None` for a
    /// successful non-overflowing push or `Some(evicted)`/`Some(value)`
    /// — depending on variant — when an overflow occurred.
    pub fn push(&self, value: T) -> Option<T> {
        match &self.backing {
            Backing::Fifo(q) => {
                if q.try_push(value) {
                    None
                } else {
                    Some(value)
                }
            }
            Backing::Sofi(s) => s.push(value),
        }
    }

    pub fn pop(&self) -> Option<T> {
        match &self.backing {
            Backing::Fifo(q) => q.pop(),
            Backing::Sofi(s) => s.pop(),
        }
    }

    pub fn empty(&self) -> bool {
        match &self.backing {
            Backing::Fifo(q) => q.empty(),
            Backing::Sofi(s) => s.empty(),
        }
    }

    pub fn size(&self) -> u64 {
        match &self.backing {
            Backing::Fifo(q) => q.size(),
            Backing::Sofi(s) => s.size(),
        }
    }

    pub fn capacity(&self) -> u64 {
        match &self.backing {
            Backing::Fifo(q) => q.capacity() as u64,
            Backing::Sofi(s) => s.capacity(),
        }
    }
}
