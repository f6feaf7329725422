// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Zero-copy shared-memory publish/subscribe core.
//
// Binary-compatible with the C++ shared-memory primitives this crate
// ports: relative pointers that survive re-mapping across process
// address spaces, a lock-free free-list-backed chunk mempool, refcounted
// shared chunks, lock-free SPSC/MPSC queues, and a chunk-distributor
// fan-out engine with crash-recoverable bookkeeping.
//
// The low-level named synchronization primitives (`IpcMutex`,
// `IpcCondition`, `IpcSemaphore`, `ShmHandle`) are kept from the
// underlying named-shared-memory port and used to build the higher-level
// pub/sub machinery above.

pub mod shm_name;

mod platform;

mod shm;
pub use shm::{ShmHandle, ShmOpenMode};

mod mutex;
pub use mutex::IpcMutex;

mod condition;
pub use condition::IpcCondition;

mod ipc_semaphore;
pub use ipc_semaphore::IpcSemaphore;

mod waiter;
pub use waiter::Waiter;

pub mod spin_lock;
pub use spin_lock::SpinLock;

pub mod rw_lock;
pub use rw_lock::RwLock;

pub mod mem;

// ---------------------------------------------------------------------------
// Relative pointers and the per-process segment registry
// ---------------------------------------------------------------------------

pub mod relative_pointer;
pub use relative_pointer::{RelativePointer, RelativePointerData, SegmentId};

pub mod pointer_repository;

// ---------------------------------------------------------------------------
// Lock-free free list and the fixed-size chunk mempool
// ---------------------------------------------------------------------------

pub mod loffli;
pub use loffli::LoFFLi;

pub mod mempool;
pub use mempool::MemPool;

pub mod config;
pub use config::{Config, MemPoolConfig};

// ---------------------------------------------------------------------------
// Chunk headers, management records, and shared/unmanaged chunk handles
// ---------------------------------------------------------------------------

pub mod chunk_header;
pub use chunk_header::{ChunkHeader, ChunkSettings};

pub mod chunk_management;
pub use chunk_management::ChunkManagement;

pub mod shared_chunk;
pub use shared_chunk::SharedChunk;

pub mod shm_safe_unmanaged_chunk;
pub use shm_safe_unmanaged_chunk::ShmSafeUnmanagedChunk;

// ---------------------------------------------------------------------------
// Lock-free queues
// ---------------------------------------------------------------------------

pub mod cyclic_index;
pub mod index_queue;
pub mod lockfree_queue;
pub mod resizeable_lockfree_queue;
pub mod sofi;
pub mod variant_queue;

pub use lockfree_queue::LockFreeQueue;
pub use resizeable_lockfree_queue::ResizeableLockFreeQueue;
pub use sofi::Sofi;
pub use variant_queue::VariantQueue;

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

pub mod locking_policy;
pub use locking_policy::{LockingPolicy, SingleThreadedPolicy, ThreadSafePolicy};

pub mod port_policy;
pub use port_policy::{ConsumerTooSlowPolicy, QueueFullPolicy};

// ---------------------------------------------------------------------------
// Publish/subscribe queue data and sender/receiver-facing ends
// ---------------------------------------------------------------------------

pub mod chunk_queue_data;
pub use chunk_queue_data::ChunkQueueData;

pub mod chunk_queue_pusher;
pub use chunk_queue_pusher::ChunkQueuePusher;

pub mod chunk_queue_popper;
pub use chunk_queue_popper::ChunkQueuePopper;

pub mod used_chunk_list;
pub use used_chunk_list::UsedChunkList;

pub mod chunk_distributor;
pub use chunk_distributor::ChunkDistributorData;

pub mod chunk_sender;
pub use chunk_sender::ChunkSender;

pub mod chunk_receiver;
pub use chunk_receiver::ChunkReceiver;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

pub mod unique_id;
pub use unique_id::UniqueId;

pub mod unique_port_id;
pub use unique_port_id::UniquePortId;

// ---------------------------------------------------------------------------
// Errors, fatal-abort policy, and the placement unnamed semaphore
// ---------------------------------------------------------------------------

pub mod error;
pub use error::{AllocationError, ChunkDistributorError, MemoryProviderError, SemaphoreError};

pub mod semaphore;
pub use semaphore::UnnamedSemaphore;
