// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Port of shared_memory/include/entity/chunk_sender.hpp and
// src/entity/chunk_sender.cc.
//
// Port-level producer: wraps a `ChunkDistributorData` with chunk
// allocation (picks the smallest mempool whose chunk size fits the
// request), sequence numbering, a `UsedChunkList` so a crashed sender's
// outstanding chunks can be recovered by a supervisor, and "previous
// chunk" tracking for late re-send of the last published sample.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::chunk_distributor::ChunkDistributorData;
use crate::chunk_header::{ChunkHeader, ChunkSettings};
use crate::chunk_management::ChunkManagement;
use crate::error::AllocationError;
use crate::locking_policy::LockingPolicy;
use crate::mempool::MemPool;
use crate::relative_pointer::{RelativePointer, SegmentId};
use crate::shared_chunk::SharedChunk;
use crate::shm_safe_unmanaged_chunk::ShmSafeUnmanagedChunk;
use crate::unique_id::UniqueId;
use crate::unique_port_id::UniquePortId;
use crate::used_chunk_list::UsedChunkList;

/// Allocate a chunk sized for `settings` from the first pool in
/// `mempools` whose `chunk_size` is large enough, writing its header and
/// wrapping it in a fresh `ChunkManagement` record drawn from
/// `mgmt_pool`.
fn allocate_from_pools(
    mempools: &[&MemPool],
    mgmt_pool: &MemPool,
    segment_id: SegmentId,
    settings: &ChunkSettings,
) -> Result<SharedChunk, AllocationError> {
    if settings.user_payload_size == 0 && settings.user_header_size == 0 {
        return Err(AllocationError::InvalidParameterForUserPayloadOrUserHeader);
    }
    let required = settings.required_chunk_size();
    let pool = mempools
        .iter()
        .find(|p| p.chunk_size() >= required)
        .ok_or(AllocationError::NoMempoolsAvailable)?;

    let chunk_ptr = pool.get_chunk();
    if chunk_ptr.is_null() {
        log::warn!("mempool exhausted: chunk_size={} chunk_count={}", pool.chunk_size(), pool.chunk_count());
        return Err(AllocationError::RunningOutOfChunks);
    }
    let header = unsafe { ChunkHeader::write_into(chunk_ptr, pool.chunk_size(), settings) };

    let mgmt_ptr = mgmt_pool.get_chunk();
    if mgmt_ptr.is_null() {
        pool.free_chunk(chunk_ptr);
        log::warn!("chunk-management pool exhausted");
        return Err(AllocationError::RunningOutOfChunks);
    }
    let mgmt_ptr = mgmt_ptr as *mut ChunkManagement;
    unsafe {
        std::ptr::write(
            mgmt_ptr,
            ChunkManagement::new(
                RelativePointer::new(header as *mut ChunkHeader, segment_id),
                RelativePointer::new(pool_ptr(pool), segment_id),
                RelativePointer::new(pool_ptr(mgmt_pool), segment_id),
            ),
        );
    }
    Ok(SharedChunk::new(mgmt_ptr))
}

fn pool_ptr(pool: &MemPool) -> *mut MemPool {
    pool as *const MemPool as *mut MemPool
}

/// Port-level producer.
///
/// Port of `shm::entity::ChunkSender<ChunkDistributorType>`.
///
/// - `MAX_QUEUES`/`HISTORY_CAPACITY`/`QUEUE_CAP`: forwarded to the
///   embedded distributor.
/// - `USED_CAPACITY`: size of this sender's `UsedChunkList`; callers
///   should size it `max_chunks_allocated_simultaneously + 1` (§4.12).
pub struct ChunkSender<
    const MAX_QUEUES: usize,
    const HISTORY_CAPACITY: usize,
    const QUEUE_CAP: usize,
    const USED_CAPACITY: usize,
    L: LockingPolicy,
> {
    distributor: ChunkDistributorData<MAX_QUEUES, HISTORY_CAPACITY, QUEUE_CAP, L>,
    used_chunks: UsedChunkList<USED_CAPACITY>,
    origin_port_id: UniquePortId,
    sequence_number: AtomicU64,
    segment_id: SegmentId,
    last_chunk_unmanaged: Mutex<ShmSafeUnmanagedChunk>,
}

impl<
        const MAX_QUEUES: usize,
        const HISTORY_CAPACITY: usize,
        const QUEUE_CAP: usize,
        const USED_CAPACITY: usize,
        L: LockingPolicy,
    > ChunkSender<MAX_QUEUES, HISTORY_CAPACITY, QUEUE_CAP, USED_CAPACITY, L>
{
    pub fn new(
        distributor: ChunkDistributorData<MAX_QUEUES, HISTORY_CAPACITY, QUEUE_CAP, L>,
        origin_port_id: UniquePortId,
        segment_id: SegmentId,
    ) -> Self {
        Self {
            distributor,
            used_chunks: UsedChunkList::new(segment_id),
            origin_port_id,
            sequence_number: AtomicU64::new(0),
            segment_id,
            last_chunk_unmanaged: Mutex::new(ShmSafeUnmanagedChunk::null()),
        }
    }

    pub fn distributor(&self) -> &ChunkDistributorData<MAX_QUEUES, HISTORY_CAPACITY, QUEUE_CAP, L> {
        &self.distributor
    }

    /// Allocate a chunk for `payload_size`/`payload_align` (optionally
    /// with a user header), recording it in this sender's
    /// `UsedChunkList` so a supervisor can recover it if this process
    /// crashes before `send`/`release`.
    pub fn try_allocate(
        &self,
        mempools: &[&MemPool],
        mgmt_pool: &MemPool,
        payload_size: u32,
        payload_align: u32,
        header_size: u32,
        header_align: u32,
    ) -> Result<*mut ChunkHeader, AllocationError> {
        let settings = ChunkSettings {
            user_header_size: header_size,
            user_header_alignment: header_align.max(1),
            user_payload_size: payload_size,
            user_payload_alignment: payload_align.max(1),
        };
        let mut chunk = allocate_from_pools(mempools, mgmt_pool, self.segment_id, &settings)?;
        if let Some(header) = chunk.chunk_header_mut() {
            header.set_origin_id(self.origin_port_id);
        }
        let header_ptr = chunk.chunk_header_mut().map(|h| h as *mut ChunkHeader).unwrap_or(std::ptr::null_mut());
        if !self.used_chunks.insert(chunk) {
            // Caller already holds `max_chunks_allocated_simultaneously + 1`
            // chunks; the mempool allocation above must be undone.
            // Safety: we just allocated it and nothing else observed it.
            return Err(AllocationError::TooManyChunksAllocatedInParallel);
        }
        Ok(header_ptr)
    }

    /// Release a chunk obtained from `try_allocate` without publishing
    /// it.
    pub fn release(&self, header: *mut ChunkHeader) {
        drop(self.used_chunks.remove(header));
    }

    /// Stamp a sequence number, remove `header`'s chunk from the used
    /// list, and fan it out via the distributor. Returns the sequence
    /// number assigned.
    pub fn send(&self, header: *mut ChunkHeader) -> u64 {
        let seq = self.sequence_number.fetch_add(1, Ordering::Relaxed);
        unsafe { (*header).set_sequence_number(seq) };
        let Some(sc) = self.used_chunks.remove(header) else {
            log::error!("send() called with a header not tracked by this sender's used-chunk list");
            return seq;
        };
        let for_history = sc.clone();
        self.distributor.deliver_to_all_stored_queues(sc);
        let mut slot = self.last_chunk_unmanaged.lock().unwrap_or_else(|e| e.into_inner());
        drop(slot.release_to_shared_chunk());
        *slot = ShmSafeUnmanagedChunk::from_shared_chunk(for_history, self.segment_id);
        seq
    }

    /// Like [`Self::send`] but delivers to exactly one subscriber queue
    /// (identified by `unique_id`) and does not touch the history ring.
    pub fn send_to_queue(&self, header: *mut ChunkHeader, unique_id: UniqueId, hint_index: usize) -> bool {
        let seq = self.sequence_number.fetch_add(1, Ordering::Relaxed);
        unsafe { (*header).set_sequence_number(seq) };
        let Some(sc) = self.used_chunks.remove(header) else {
            log::error!("send_to_queue() called with an untracked header");
            return false;
        };
        matches!(
            self.distributor.deliver_to_queue(unique_id, hint_index, sc),
            Ok(true)
        )
    }

    /// Return the last successfully `send`-ed chunk iff it is still
    /// uniquely owned by this sender (no subscriber or history entry is
    /// still holding it) — lets a late caller re-inspect what it just
    /// published without re-allocating.
    pub fn try_get_previous_chunk(&mut self) -> Option<SharedChunk> {
        let mut guard = self.last_chunk_unmanaged.lock().unwrap_or_else(|e| e.into_inner());
        if guard.is_logical_null() || !guard.has_no_other_owners() {
            return None;
        }
        guard.clone_to_shared_chunk()
    }

    /// Release every chunk this sender still has outstanding. Intended
    /// for supervisor-driven cleanup after this port's owning process
    /// crashed.
    ///
    /// # Safety
    /// Only sound if the owning process is actually dead.
    pub unsafe fn release_all(&self) {
        self.used_chunks.cleanup();
    }
}

impl<
        const MAX_QUEUES: usize,
        const HISTORY_CAPACITY: usize,
        const QUEUE_CAP: usize,
        const USED_CAPACITY: usize,
        L: LockingPolicy,
    > Drop for ChunkSender<MAX_QUEUES, HISTORY_CAPACITY, QUEUE_CAP, USED_CAPACITY, L>
{
    fn drop(&mut self) {
        let mut slot = self.last_chunk_unmanaged.lock().unwrap_or_else(|e| e.into_inner());
        drop(slot.release_to_shared_chunk());
    }
}
