// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Port of shared_memory/include/shm/pointer_repository.hpp.
//
// Process-local table mapping a small segment id to the (base, end)
// address range a process mapped that segment at. Populated at
// attach-time; every RelativePointer resolves through this table so the
// same (id, offset) pair produces the correct address in every process,
// regardless of where each process happened to mmap the segment.

use std::sync::{OnceLock, RwLock};

use crate::relative_pointer::{SegmentId, RAW_POINTER_BEHAVIOUR_ID};

const CAPACITY: usize = 10_000;
const MIN_ID: SegmentId = 1;
const MAX_ID: SegmentId = (CAPACITY - 1) as SegmentId;

#[derive(Clone, Copy)]
struct Info {
    base: usize,
    end: usize,
}

/// Process-local registry of mapped shared-memory segments.
///
/// Port of `shm::PointerRepository<id_t, ptr_t, CAPACITY>`. The spec's
/// design notes call for this to be a dependency-injected handle with the
/// global singleton offered only as an ergonomic convenience; this crate
/// follows that shape: [`PointerRepository`] is a plain struct usable on
/// its own, and [`repository`] hands back a process-wide default instance.
pub struct PointerRepository {
    inner: RwLock<Inner>,
}

struct Inner {
    info: Box<[Option<Info>; CAPACITY]>,
    max_registered: usize,
}

impl PointerRepository {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                info: Box::new([None; CAPACITY]),
                max_registered: 0,
            }),
        }
    }

    /// Register `base..base+size` under the first free id in
    /// `[MIN_ID, MAX_ID]`. Returns `None` if every id is taken.
    pub fn register_ptr(&self, base: *const u8, size: usize) -> Option<SegmentId> {
        let mut inner = self.inner.write().unwrap();
        for id in MIN_ID..=MAX_ID {
            if inner.info[id as usize].is_none() {
                Self::add(&mut inner, id, base, size);
                return Some(id);
            }
        }
        None
    }

    /// Register `base..base+size` under a specific `id`. Fails if `id`
    /// is already registered or out of range.
    pub fn register_ptr_with_id(&self, id: SegmentId, base: *const u8, size: usize) -> bool {
        if id < MIN_ID || id > MAX_ID {
            return false;
        }
        let mut inner = self.inner.write().unwrap();
        if inner.info[id as usize].is_some() {
            return false;
        }
        Self::add(&mut inner, id, base, size);
        true
    }

    fn add(inner: &mut Inner, id: SegmentId, base: *const u8, size: usize) {
        let base = base as usize;
        inner.info[id as usize] = Some(Info {
            base,
            end: base + size.saturating_sub(1),
        });
        inner.max_registered = inner.max_registered.max(id as usize);
    }

    /// Unregister `id`. Returns `true` if it had been registered.
    /// Every relative pointer carrying this id becomes unresolvable
    /// (resolves to null) afterwards.
    pub fn unregister_ptr(&self, id: SegmentId) -> bool {
        let mut inner = self.inner.write().unwrap();
        if id as usize >= CAPACITY {
            return false;
        }
        inner.info[id as usize].take().is_some()
    }

    /// Drop every registration. Used in tests and process teardown.
    pub fn unregister_all(&self) {
        let mut inner = self.inner.write().unwrap();
        for slot in inner.info.iter_mut() {
            *slot = None;
        }
        inner.max_registered = 0;
    }

    pub fn get_base(&self, id: SegmentId) -> *mut u8 {
        let inner = self.inner.read().unwrap();
        match inner.info.get(id as usize).copied().flatten() {
            Some(info) => info.base as *mut u8,
            None => std::ptr::null_mut(),
        }
    }

    /// Linear scan over every id ever registered, returning the id whose
    /// `[base, end]` range contains `p`, or `RAW_POINTER_BEHAVIOUR_ID`
    /// (0) if no registered segment contains it.
    pub fn search_id(&self, p: *const u8) -> SegmentId {
        let addr = p as usize;
        let inner = self.inner.read().unwrap();
        for id in MIN_ID..=(inner.max_registered as SegmentId) {
            if let Some(info) = inner.info[id as usize] {
                if addr >= info.base && addr <= info.end {
                    return id;
                }
            }
        }
        RAW_POINTER_BEHAVIOUR_ID
    }

    /// `p - base(id)`, with the raw-pointer id returning `p` itself
    /// widened to `u64` (offset is interpreted as an absolute address).
    pub fn offset_of(&self, id: SegmentId, p: *const u8) -> u64 {
        if id == RAW_POINTER_BEHAVIOUR_ID {
            return p as usize as u64;
        }
        let base = self.get_base(id);
        (p as usize - base as usize) as u64
    }

    /// `base(id) + offset`, with the raw-pointer id returning `offset`
    /// reinterpreted directly as an address.
    pub fn resolve(&self, id: SegmentId, offset: u64) -> *mut u8 {
        if id == RAW_POINTER_BEHAVIOUR_ID {
            return offset as *mut u8;
        }
        let base = self.get_base(id);
        if base.is_null() {
            return std::ptr::null_mut();
        }
        base.wrapping_add(offset as usize)
    }
}

impl Default for PointerRepository {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl Send for PointerRepository {}
unsafe impl Sync for PointerRepository {}

static REPOSITORY: OnceLock<PointerRepository> = OnceLock::new();

/// The process-wide default repository. Every [`crate::relative_pointer::RelativePointer`]
/// resolves through this instance unless the application threads its own
/// `PointerRepository` through explicitly.
pub fn repository() -> &'static PointerRepository {
    REPOSITORY.get_or_init(PointerRepository::new)
}
