// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Port of shared_memory/include/types/unique_port_id.hpp.
//
// A monotonically advancing per-process counter combined with a 16-bit
// daemon-wide prefix, so samples originating from different daemons (in
// a multi-host deployment bridged by a third-party transport) remain
// globally distinguishable.

use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};

const ROUDI_ID_BIT_LENGTH: u32 = 16;
const INVALID_UNIQUE_ID: u64 = 0;

static GLOBAL_COUNTER: AtomicU64 = AtomicU64::new(1);
static DAEMON_ID: AtomicU16 = AtomicU16::new(0);
static DAEMON_ID_SET: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

/// A globally unique port id: a 48-bit monotonic per-process counter in
/// the upper bits and a 16-bit daemon id in the lower bits.
///
/// Port of `shm::types::UniquePortId`.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UniquePortId(u64);

impl UniquePortId {
    /// Create a new id, greater than any previously created `UniquePortId`
    /// in this process.
    pub fn new() -> Self {
        let counter = GLOBAL_COUNTER.fetch_add(1, Ordering::Relaxed);
        let daemon_id = DAEMON_ID.load(Ordering::Acquire) as u64;
        DAEMON_ID_SET.store(true, Ordering::Release);
        Self((counter << ROUDI_ID_BIT_LENGTH) | daemon_id)
    }

    /// An explicitly invalid port id (underlying value `0`).
    pub const fn invalid() -> Self {
        Self(INVALID_UNIQUE_ID)
    }

    pub fn is_valid(self) -> bool {
        self.0 != INVALID_UNIQUE_ID
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    /// Reconstruct a `UniquePortId` from a raw value, e.g. one read back
    /// out of a `ChunkHeader`'s `origin_id` field.
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Set the daemon id prefixed onto every subsequently created
    /// `UniquePortId`. A second call after the prefix has already been
    /// finalized (by a prior call to this function, or by creating a
    /// valid id) is a logic error: it is logged and ignored rather than
    /// routed through an error handler, since the daemon lifecycle that
    /// would own such a handler is out of scope for this crate.
    pub fn set_daemon_id(id: u16) {
        if DAEMON_ID_SET.swap(true, Ordering::AcqRel) {
            log::error!("daemon id for UniquePortId already finalized, ignoring new value {id}");
            return;
        }
        DAEMON_ID.store(id, Ordering::Release);
    }

    pub fn daemon_id() -> u16 {
        DAEMON_ID.load(Ordering::Acquire)
    }
}

impl Default for UniquePortId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<UniquePortId> for u64 {
    fn from(id: UniquePortId) -> u64 {
        id.0
    }
}
