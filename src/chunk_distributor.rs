// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Port of shared_memory/include/entity/chunk_distributor.hpp and
// src/entity/chunk_distributor.cc.
//
// Fan-out engine: holds relative pointers to every subscriber's
// `ChunkQueueData` (so a subscriber living in another process resolves
// correctly) plus a bounded history ring of the most recently published
// chunks for late-joining subscribers. Subscriber list and history ring
// are both guarded by a `LockingPolicy` (§3.13/§9) chosen at the call
// site's type parameter — `SingleThreadedPolicy` for a port known to
// have exactly one accessor, `ThreadSafePolicy` otherwise.

use std::cell::UnsafeCell;

use crate::chunk_queue_data::ChunkQueueData;
use crate::error::ChunkDistributorError;
use crate::locking_policy::LockingPolicy;
use crate::port_policy::{ConsumerTooSlowPolicy, QueueFullPolicy};
use crate::relative_pointer::{RelativePointer, SegmentId};
use crate::shared_chunk::SharedChunk;
use crate::shm_safe_unmanaged_chunk::ShmSafeUnmanagedChunk;
use crate::unique_id::UniqueId;

/// Fan-out state shared by `ChunkSender` (and standalone publishers).
///
/// Port of `shm::entity::ChunkDistributorData<ChunkDistributorDataProperties, LockingPolicy>`.
///
/// - `MAX_QUEUES`: subscriber vector capacity.
/// - `HISTORY_CAPACITY`: history ring capacity.
/// - `QUEUE_CAP`: capacity of each subscriber's `ChunkQueueData`.
pub struct ChunkDistributorData<
    const MAX_QUEUES: usize,
    const HISTORY_CAPACITY: usize,
    const QUEUE_CAP: usize,
    L: LockingPolicy,
> {
    queues: UnsafeCell<Vec<RelativePointer<ChunkQueueData<QUEUE_CAP>>>>,
    history: UnsafeCell<History<HISTORY_CAPACITY>>,
    consumer_too_slow_policy: ConsumerTooSlowPolicy,
    segment_id: SegmentId,
    lock: L,
}

unsafe impl<const MQ: usize, const HC: usize, const QC: usize, L: LockingPolicy + Sync> Sync
    for ChunkDistributorData<MQ, HC, QC, L>
{
}

struct History<const CAPACITY: usize> {
    slots: [ShmSafeUnmanagedChunk; CAPACITY],
    /// Index of the oldest valid entry, or `CAPACITY` if empty.
    head: usize,
    len: usize,
}

impl<const CAPACITY: usize> History<CAPACITY> {
    fn new() -> Self {
        Self {
            slots: [ShmSafeUnmanagedChunk::null(); CAPACITY],
            head: 0,
            len: 0,
        }
    }

    /// Append, evicting (and releasing) the oldest entry if full.
    fn push(&mut self, sc: SharedChunk, segment_id: SegmentId) {
        if CAPACITY == 0 {
            return;
        }
        let ssuc = ShmSafeUnmanagedChunk::from_shared_chunk(sc, segment_id);
        if self.len < CAPACITY {
            let idx = (self.head + self.len) % CAPACITY;
            self.slots[idx] = ssuc;
            self.len += 1;
        } else {
            let idx = self.head;
            let mut old = self.slots[idx];
            drop(old.release_to_shared_chunk());
            self.slots[idx] = ssuc;
            self.head = (self.head + 1) % CAPACITY;
        }
    }

    /// Last `n.min(len)` entries, oldest first, each cloned (refcount
    /// incremented) so the caller can push independent ownership into a
    /// newly-joined subscriber's queue.
    fn last_n_cloned(&self, n: usize, segment_id: SegmentId) -> Vec<ShmSafeUnmanagedChunk> {
        let take = n.min(self.len);
        let start = self.len - take;
        (0..take)
            .map(|i| {
                let idx = (self.head + start + i) % CAPACITY.max(1);
                let sc = self.slots[idx].clone_to_shared_chunk();
                match sc {
                    Some(owned) => ShmSafeUnmanagedChunk::from_shared_chunk(owned, segment_id),
                    None => ShmSafeUnmanagedChunk::null(),
                }
            })
            .collect()
    }

    fn release_all(&mut self) {
        for i in 0..self.len {
            let idx = (self.head + i) % CAPACITY.max(1);
            drop(self.slots[idx].release_to_shared_chunk());
        }
        self.len = 0;
        self.head = 0;
    }
}

impl<const MAX_QUEUES: usize, const HISTORY_CAPACITY: usize, const QUEUE_CAP: usize, L>
    ChunkDistributorData<MAX_QUEUES, HISTORY_CAPACITY, QUEUE_CAP, L>
where
    L: LockingPolicy,
{
    pub fn new(consumer_too_slow_policy: ConsumerTooSlowPolicy, segment_id: SegmentId, lock: L) -> Self {
        Self {
            queues: UnsafeCell::new(Vec::with_capacity(MAX_QUEUES)),
            history: UnsafeCell::new(History::new()),
            consumer_too_slow_policy,
            segment_id,
            lock,
        }
    }

    #[allow(clippy::mut_from_ref)]
    unsafe fn queues_mut(&self) -> &mut Vec<RelativePointer<ChunkQueueData<QUEUE_CAP>>> {
        &mut *self.queues.get()
    }

    #[allow(clippy::mut_from_ref)]
    unsafe fn history_mut(&self) -> &mut History<HISTORY_CAPACITY> {
        &mut *self.history.get()
    }

    /// Register a new subscriber queue, replaying up to
    /// `requested_history` of the most recent published chunks into it.
    pub fn try_add_queue(
        &self,
        queue: RelativePointer<ChunkQueueData<QUEUE_CAP>>,
        requested_history: usize,
    ) -> Result<(), ChunkDistributorError> {
        self.lock.lock();
        let result = unsafe {
            let queues = self.queues_mut();
            if queues.iter().any(|q| *q == queue) {
                Ok(())
            } else if queues.len() >= MAX_QUEUES {
                Err(ChunkDistributorError::QueueContainerOverflow)
            } else {
                queues.push(queue.clone());
                for mut ssuc in self.history_mut().last_n_cloned(requested_history, self.segment_id) {
                    if let Some(data) = queue.as_ref() {
                        if let Some(evicted) = data.push(ssuc) {
                            let mut ev = evicted;
                            drop(ev.release_to_shared_chunk());
                        }
                    } else {
                        drop(ssuc.release_to_shared_chunk());
                    }
                }
                Ok(())
            }
        };
        self.lock.unlock();
        result
    }

    pub fn try_remove_queue(
        &self,
        queue: &RelativePointer<ChunkQueueData<QUEUE_CAP>>,
    ) -> Result<(), ChunkDistributorError> {
        self.lock.lock();
        let result = unsafe {
            let queues = self.queues_mut();
            match queues.iter().position(|q| q == queue) {
                Some(idx) => {
                    queues.remove(idx);
                    Ok(())
                }
                None => Err(ChunkDistributorError::QueueNotInContainer),
            }
        };
        self.lock.unlock();
        result
    }

    pub fn number_of_subscribers(&self) -> usize {
        self.lock.lock();
        let n = unsafe { self.queues_mut().len() };
        self.lock.unlock();
        n
    }

    /// Deliver `sc` to every subscriber, then append it to the history
    /// ring (always, regardless of delivery outcome).
    ///
    /// Returns the number of subscribers the chunk was (eventually)
    /// delivered to.
    pub fn deliver_to_all_stored_queues(&self, sc: SharedChunk) -> u64 {
        let snapshot: Vec<RelativePointer<ChunkQueueData<QUEUE_CAP>>> = {
            self.lock.lock();
            let v = unsafe { self.queues_mut().clone() };
            self.lock.unlock();
            v
        };

        let mut delivered: u64 = 0;
        let mut awaiting: Vec<RelativePointer<ChunkQueueData<QUEUE_CAP>>> = Vec::new();

        for queue in &snapshot {
            let Some(data) = (unsafe { queue.as_ref() }) else {
                continue;
            };
            let blocking = self.consumer_too_slow_policy == ConsumerTooSlowPolicy::WaitForConsumer
                && data.queue_full_policy() == QueueFullPolicy::BlockProducer;
            let ssuc = sc.clone();
            let ssuc = ShmSafeUnmanagedChunk::from_shared_chunk(ssuc, self.segment_id);
            match data.push(ssuc) {
                None => delivered += 1,
                Some(mut displaced) => {
                    if blocking {
                        // Push failed outright (non-overflowing queue at
                        // capacity): reclaim our slot, retry later.
                        drop(displaced.release_to_shared_chunk());
                        awaiting.push(queue.clone());
                    } else {
                        // Either an overflow eviction (delivered, an
                        // older entry was displaced) or a rejected push
                        // on a non-blocking policy (lost).
                        if displaced == ssuc {
                            drop(displaced.release_to_shared_chunk());
                            data.set_lost_a_chunk();
                            log::warn!(
                                "dropping chunk: subscriber queue {} is full under a \
                                 non-blocking policy",
                                data.unique_id().value()
                            );
                        } else {
                            drop(displaced.release_to_shared_chunk());
                            delivered += 1;
                        }
                    }
                }
            }
        }

        while !awaiting.is_empty() {
            log::warn!("deliver_to_all_stored_queues: spin-waiting on {} blocking subscriber(s)", awaiting.len());
            std::thread::yield_now();
            self.lock.lock();
            let still_present: Vec<RelativePointer<ChunkQueueData<QUEUE_CAP>>> =
                unsafe { self.queues_mut().iter().map(|q| q.clone()).collect() };
            self.lock.unlock();

            awaiting.retain(|q| still_present.iter().any(|s| s == q));
            let mut next_round = Vec::new();
            for queue in &awaiting {
                let Some(data) = (unsafe { queue.as_ref() }) else {
                    continue;
                };
                let ssuc = ShmSafeUnmanagedChunk::from_shared_chunk(sc.clone(), self.segment_id);
                match data.push(ssuc) {
                    None => delivered += 1,
                    Some(mut displaced) => {
                        drop(displaced.release_to_shared_chunk());
                        next_round.push(queue.clone());
                    }
                }
            }
            awaiting = next_round;
        }

        self.lock.lock();
        unsafe { self.history_mut().push(sc, self.segment_id) };
        self.lock.unlock();

        delivered
    }

    /// Deliver to exactly one subscriber, identified by `unique_id`, and
    /// do NOT touch the history ring. `hint_index` is tried first (fast
    /// path for a sender that cached the index from a prior call); a
    /// mismatch falls back to a linear search.
    pub fn deliver_to_queue(
        &self,
        unique_id: UniqueId,
        hint_index: usize,
        sc: SharedChunk,
    ) -> Result<bool, ChunkDistributorError> {
        self.lock.lock();
        let queues = unsafe { self.queues_mut() };
        let idx = if hint_index < queues.len()
            && unsafe { queues[hint_index].as_ref() }.map(|d| d.unique_id()) == Some(unique_id)
        {
            Some(hint_index)
        } else {
            queues
                .iter()
                .position(|q| unsafe { q.as_ref() }.map(|d| d.unique_id()) == Some(unique_id))
        };
        let Some(idx) = idx else {
            self.lock.unlock();
            return Err(ChunkDistributorError::QueueNotInContainer);
        };
        let queue = queues[idx].clone();
        self.lock.unlock();

        let data = unsafe { queue.as_ref() }.expect("just-found queue resolved");
        let blocking = self.consumer_too_slow_policy == ConsumerTooSlowPolicy::WaitForConsumer
            && data.queue_full_policy() == QueueFullPolicy::BlockProducer;
        loop {
            let ssuc = ShmSafeUnmanagedChunk::from_shared_chunk(sc.clone(), self.segment_id);
            match data.push(ssuc) {
                None => return Ok(true),
                Some(mut displaced) => {
                    if displaced == ssuc {
                        drop(displaced.release_to_shared_chunk());
                        if blocking {
                            std::thread::yield_now();
                            continue;
                        }
                        data.set_lost_a_chunk();
                        return Ok(false);
                    }
                    drop(displaced.release_to_shared_chunk());
                    return Ok(true);
                }
            }
        }
    }

    /// Release the history ring if the lock can be acquired without
    /// blocking. If another (possibly crashed) process holds the lock,
    /// this silently gives up — a documented tradeoff, see §4.11/§9.
    pub fn cleanup(&self) {
        if !self.lock.try_lock() {
            log::warn!("ChunkDistributorData::cleanup: could not acquire lock, history ring leaked");
            return;
        }
        unsafe { self.history_mut().release_all() };
        self.lock.unlock();
    }
}
