// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Error taxonomies for the shared-memory chunk allocator / distributor.
// Port of the error enums scattered across
// cpp-ipc-inspired shared_memory/include/{memory,entity,sem}/*.hpp.
//
// Invariant violations that would leave a cross-process structure torn
// (double free in LoFFLi, a chunk_size that isn't a multiple of 8, a
// dead inter-process mutex) are NOT represented here: those paths log at
// `error` level and call `std::process::abort()` directly, since there is
// no safe way for a caller to continue.

use thiserror::Error;

/// Failure modes of a chunk allocation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("undefined allocation error")]
    UndefinedError,
    #[error("no mempools available for the requested chunk size")]
    NoMempoolsAvailable,
    #[error("mempool exhausted: running out of chunks")]
    RunningOutOfChunks,
    #[error("too many chunks allocated in parallel by this port")]
    TooManyChunksAllocatedInParallel,
    #[error("invalid parameter for user payload or user header")]
    InvalidParameterForUserPayloadOrUserHeader,
    #[error("invalid parameter for request header")]
    InvalidParameterForRequestHeader,
}

/// Failure modes of subscriber-queue management on the distributor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChunkDistributorError {
    #[error("subscriber queue container is full")]
    QueueContainerOverflow,
    #[error("queue is not present in the distributor")]
    QueueNotInContainer,
}

/// Failure modes reported by a shared-memory provider when creating or
/// mapping a backing segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MemoryProviderError {
    #[error("no memory blocks present")]
    NoMemoryBlocksPresent,
    #[error("memory already created")]
    MemoryAlreadyCreated,
    #[error("memory allocation failed")]
    MemoryAllocationFailed,
    #[error("memory not available")]
    MemoryNotAvailable,
    #[error("memory creation failed")]
    MemoryCreationFailed,
    #[error("memory mapping failed")]
    MemoryMappingFailed,
    #[error("memory destruction failed")]
    MemoryDestructionFailed,
}

/// Failure modes of the unnamed-semaphore wrapper (§4.17).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SemaphoreError {
    #[error("invalid semaphore handle")]
    InvalidSemaphoreHandle,
    #[error("semaphore value would overflow")]
    SemaphoreOverflow,
    #[error("interrupted by a signal handler")]
    InterruptedBySignalHandler,
    #[error("undefined semaphore error")]
    Undefined,
}

/// Abort the process after logging `msg`. Used for invariant violations
/// that would otherwise leave shared memory visible to other processes in
/// a torn state (double free, misaligned chunk size, dead robust mutex).
#[cold]
#[inline(never)]
pub fn fatal(msg: &str) -> ! {
    log::error!("fatal invariant violation, aborting: {msg}");
    std::process::abort();
}
