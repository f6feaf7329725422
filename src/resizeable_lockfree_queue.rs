// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Port of shared_memory/include/entity/resizeable_lockfree_queue.hpp.
//
// A `LockFreeQueue`-alike whose usable capacity can shrink and grow at
// runtime, up to a compile-time upper bound `MAX_CAPACITY`. Slots beyond
// the current capacity are parked in a side list (`unused_indices`)
// instead of taking part in the free/used index rotation. Resizing is a
// single-writer operation (the port, not its subscribers, owns its own
// capacity) serialized with an atomic flag rather than a full lock.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::index_queue::{ConstructEmpty, Index, IndexQueue};

pub struct ResizeableLockFreeQueue<T: Copy, const MAX_CAPACITY: usize> {
    free_indices: IndexQueue<MAX_CAPACITY>,
    used_indices: IndexQueue<MAX_CAPACITY>,
    buffer: Box<[UnsafeCell<MaybeUninit<T>>]>,
    unused_indices: Mutex<Vec<Index>>,
    current_capacity: AtomicUsize,
    size: AtomicU64,
    resizing: AtomicBool,
}

unsafe impl<T: Copy + Send, const MAX_CAPACITY: usize> Send
    for ResizeableLockFreeQueue<T, MAX_CAPACITY>
{
}
unsafe impl<T: Copy + Send, const MAX_CAPACITY: usize> Sync
    for ResizeableLockFreeQueue<T, MAX_CAPACITY>
{
}

impl<T: Copy, const MAX_CAPACITY: usize> ResizeableLockFreeQueue<T, MAX_CAPACITY> {
    pub fn new(initial_capacity: usize) -> Self {
        assert!(initial_capacity <= MAX_CAPACITY);
        let free_indices = IndexQueue::new(ConstructEmpty);
        let mut unused = Vec::with_capacity(MAX_CAPACITY - initial_capacity);
        for i in 0..MAX_CAPACITY as Index {
            if (i as usize) < initial_capacity {
                free_indices.push(i);
            } else {
                unused.push(i);
            }
        }
        let buffer = (0..MAX_CAPACITY)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect();
        Self {
            free_indices,
            used_indices: IndexQueue::new(ConstructEmpty),
            buffer,
            unused_indices: Mutex::new(unused),
            current_capacity: AtomicUsize::new(initial_capacity),
            size: AtomicU64::new(0),
            resizing: AtomicBool::new(false),
        }
    }

    pub fn max_capacity(&self) -> usize {
        MAX_CAPACITY
    }

    pub fn capacity(&self) -> usize {
        self.current_capacity.load(Ordering::Acquire)
    }

    pub fn size(&self) -> u64 {
        self.size.load(Ordering::Acquire)
    }

    pub fn empty(&self) -> bool {
        self.size() == 0
    }

    /// Change the usable capacity to `new_capacity` (must not exceed
    /// `MAX_CAPACITY`). Returns `false` if a resize is already in
    /// progress, `new_capacity` is out of range, or (when shrinking)
    /// there are not currently enough free slots to reclaim — in that
    /// last case the capacity shrinks as far as it can and the caller
    /// should retry once more slots have been popped.
    pub fn set_capacity(&self, new_capacity: usize) -> bool {
        if new_capacity > MAX_CAPACITY {
            return false;
        }
        if self
            .resizing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let current = self.current_capacity.load(Ordering::Acquire);
        let mut unused = self.unused_indices.lock().unwrap_or_else(|e| e.into_inner());
        let fully_applied = if new_capacity > current {
            let mut grown = current;
            while grown < new_capacity {
                match unused.pop() {
                    Some(idx) => {
                        self.free_indices.push(idx);
                        grown += 1;
                    }
                    None => break,
                }
            }
            self.current_capacity.store(grown, Ordering::Release);
            grown == new_capacity
        } else if new_capacity < current {
            let mut shrunk = current;
            while shrunk > new_capacity {
                match self.free_indices.pop() {
                    Some(idx) => {
                        unused.push(idx);
                        shrunk -= 1;
                    }
                    None => break,
                }
            }
            self.current_capacity.store(shrunk, Ordering::Release);
            shrunk == new_capacity
        } else {
            true
        };
        drop(unused);
        self.resizing.store(false, Ordering::Release);
        fully_applied
    }

    unsafe fn write_at(&self, index: Index, value: T) {
        (*self.buffer[index as usize].get()).write(value);
    }

    unsafe fn read_at(&self, index: Index) -> T {
        (*self.buffer[index as usize].get()).assume_init()
    }

    pub fn try_push(&self, value: T) -> bool {
        match self.free_indices.pop() {
            Some(index) => {
                unsafe { self.write_at(index, value) };
                self.used_indices.push(index);
                self.size.fetch_add(1, Ordering::AcqRel);
                true
            }
            None => false,
        }
    }

    pub fn push(&self, value: T) -> Option<T> {
        loop {
            if let Some(index) = self.free_indices.pop() {
                unsafe { self.write_at(index, value) };
                self.used_indices.push(index);
                self.size.fetch_add(1, Ordering::AcqRel);
                return None;
            }
            if let Some(index) = self.used_indices.pop_if_full() {
                let evicted = unsafe { self.read_at(index) };
                unsafe { self.write_at(index, value) };
                self.used_indices.push(index);
                return Some(evicted);
            }
            std::hint::spin_loop();
        }
    }

    pub fn pop(&self) -> Option<T> {
        let index = self.used_indices.pop()?;
        let value = unsafe { self.read_at(index) };
        self.free_indices.push(index);
        self.size.fetch_sub(1, Ordering::AcqRel);
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_capacity_bounds_pushes() {
        let q: ResizeableLockFreeQueue<u32, 8> = ResizeableLockFreeQueue::new(2);
        assert!(q.try_push(1));
        assert!(q.try_push(2));
        assert!(!q.try_push(3));
    }

    #[test]
    fn growing_capacity_admits_more_pushes() {
        let q: ResizeableLockFreeQueue<u32, 8> = ResizeableLockFreeQueue::new(2);
        assert!(q.try_push(1));
        assert!(q.try_push(2));
        assert!(q.set_capacity(4));
        assert_eq!(q.capacity(), 4);
        assert!(q.try_push(3));
        assert!(q.try_push(4));
        assert!(!q.try_push(5));
    }

    #[test]
    fn shrinking_capacity_reclaims_free_slots_only() {
        let q: ResizeableLockFreeQueue<u32, 8> = ResizeableLockFreeQueue::new(4);
        assert!(q.try_push(1));
        assert!(q.set_capacity(1));
        assert_eq!(q.capacity(), 1);
        assert!(!q.try_push(2));
        assert_eq!(q.pop(), Some(1));
    }

    #[test]
    fn concurrent_resize_attempts_are_serialized() {
        let q: ResizeableLockFreeQueue<u32, 8> = ResizeableLockFreeQueue::new(2);
        q.resizing.store(true, Ordering::SeqCst);
        assert!(!q.set_capacity(4));
        q.resizing.store(false, Ordering::SeqCst);
        assert!(q.set_capacity(4));
    }
}
