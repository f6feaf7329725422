// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Port of shared_memory/include/entity/port_policy.hpp.

/// How a producer should behave when the consumer's queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsumerTooSlowPolicy {
    /// Block until the consumer has made room.
    WaitForConsumer,
    /// Discard the oldest queued element and push the newest one.
    DiscardOldestData,
}

/// What a consumer asks the producer to do when its queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueFullPolicy {
    /// Ask the producer to block until this consumer has made room.
    BlockProducer,
    /// Ask the producer to discard the oldest queued element.
    DiscardOldestData,
}
