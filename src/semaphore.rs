// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Port of shared_memory/include/sem/{unnamed_semaphore,semaphore_interface}.hpp.
//
// Unlike `IpcMutex`/`IpcCondition` (which are *named* and manage their
// own backing shm segment, see platform/posix.rs's shm cache), an
// `UnnamedSemaphore` is placed directly inside memory the caller already
// owns — typically a few bytes inside a shared-memory segment — matching
// `sem_init(sem_t*, pshared=1, value)`. It exists to back the minimal
// condition-variable contract (§4.16 of the expanded spec) on
// configurations that prefer a semaphore-based wait primitive; nothing
// else in this crate's public API depends on it.

use std::time::Duration;

use crate::error::SemaphoreError;

/// Number of consecutive `EINTR` retries tolerated before giving up and
/// surfacing [`SemaphoreError::InterruptedBySignalHandler`].
const EINTR_RETRY_BUDGET: u32 = 8;

#[cfg(unix)]
mod imp {
    use super::*;
    use std::mem::MaybeUninit;

    /// A POSIX unnamed semaphore (`sem_t`) living in caller-supplied
    /// memory, usable across processes that all map the same region.
    pub struct UnnamedSemaphore {
        sem: libc::sem_t,
    }

    impl UnnamedSemaphore {
        /// Initialize a semaphore with `initial_value` in place.
        ///
        /// # Safety
        /// `self` must not already be initialized (or must have been
        /// destroyed via [`Self::destroy`]), and the containing memory
        /// must be valid for the lifetime of every process that uses it.
        pub unsafe fn init(&mut self, initial_value: u32) -> Result<(), SemaphoreError> {
            let mut raw = MaybeUninit::<libc::sem_t>::uninit();
            let rc = libc::sem_init(raw.as_mut_ptr(), 1, initial_value);
            if rc != 0 {
                return Err(SemaphoreError::InvalidSemaphoreHandle);
            }
            self.sem = raw.assume_init();
            Ok(())
        }

        pub fn post(&self) -> Result<(), SemaphoreError> {
            let rc = unsafe { libc::sem_post(&self.sem as *const _ as *mut _) };
            if rc == 0 {
                Ok(())
            } else if std::io::Error::last_os_error().raw_os_error() == Some(libc::EOVERFLOW) {
                Err(SemaphoreError::SemaphoreOverflow)
            } else {
                Err(SemaphoreError::Undefined)
            }
        }

        pub fn wait(&self) -> Result<(), SemaphoreError> {
            let mut retries = 0;
            loop {
                let rc = unsafe { libc::sem_wait(&self.sem as *const _ as *mut _) };
                if rc == 0 {
                    return Ok(());
                }
                let err = std::io::Error::last_os_error();
                if err.raw_os_error() == Some(libc::EINTR) {
                    retries += 1;
                    if retries > EINTR_RETRY_BUDGET {
                        return Err(SemaphoreError::InterruptedBySignalHandler);
                    }
                    continue;
                }
                return Err(SemaphoreError::Undefined);
            }
        }

        /// Returns `Ok(false)` on timeout, `Ok(true)` if the wait was
        /// satisfied.
        pub fn timed_wait(&self, timeout: Duration) -> Result<bool, SemaphoreError> {
            let deadline = unsafe {
                let mut now = std::mem::zeroed::<libc::timespec>();
                libc::clock_gettime(libc::CLOCK_REALTIME, &mut now);
                let mut ts = now;
                ts.tv_sec += timeout.as_secs() as libc::time_t;
                ts.tv_nsec += timeout.subsec_nanos() as libc::c_long;
                if ts.tv_nsec >= 1_000_000_000 {
                    ts.tv_sec += 1;
                    ts.tv_nsec -= 1_000_000_000;
                }
                ts
            };
            let mut retries = 0;
            loop {
                let rc =
                    unsafe { libc::sem_timedwait(&self.sem as *const _ as *mut _, &deadline) };
                if rc == 0 {
                    return Ok(true);
                }
                let err = std::io::Error::last_os_error();
                match err.raw_os_error() {
                    Some(libc::ETIMEDOUT) => return Ok(false),
                    Some(libc::EINTR) => {
                        retries += 1;
                        if retries > EINTR_RETRY_BUDGET {
                            return Err(SemaphoreError::InterruptedBySignalHandler);
                        }
                        continue;
                    }
                    _ => return Err(SemaphoreError::Undefined),
                }
            }
        }

        /// Destroy the semaphore in place. Safe only once no process is
        /// still waiting/posting on it.
        ///
        /// # Safety
        /// Must not be called concurrently with any other operation on
        /// this semaphore, in this or any other process.
        pub unsafe fn destroy(&mut self) -> Result<(), SemaphoreError> {
            let rc = libc::sem_destroy(&mut self.sem as *mut _);
            if rc == 0 {
                Ok(())
            } else {
                Err(SemaphoreError::InvalidSemaphoreHandle)
            }
        }
    }
}

#[cfg(windows)]
mod imp {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use windows_sys::Win32::Foundation::{CloseHandle, HANDLE, WAIT_OBJECT_0, WAIT_TIMEOUT};
    use windows_sys::Win32::System::Threading::{CreateSemaphoreW, ReleaseSemaphore, WaitForSingleObject};

    /// Windows has no direct analogue of an unnamed, memory-resident
    /// `sem_t`; this wraps a process-local semaphore `HANDLE` (not itself
    /// shareable across processes without duplication, which this crate
    /// does not need since the semaphore only backs the in-process
    /// condition-variable contract on this platform).
    pub struct UnnamedSemaphore {
        handle: AtomicI64,
    }

    impl UnnamedSemaphore {
        /// # Safety
        /// See the POSIX `init` — same contract.
        pub unsafe fn init(&mut self, initial_value: u32) -> Result<(), SemaphoreError> {
            let handle: HANDLE =
                CreateSemaphoreW(std::ptr::null(), initial_value as i32, i32::MAX, std::ptr::null());
            if handle == 0 {
                return Err(SemaphoreError::InvalidSemaphoreHandle);
            }
            self.handle.store(handle, Ordering::Release);
            Ok(())
        }

        pub fn post(&self) -> Result<(), SemaphoreError> {
            let handle = self.handle.load(Ordering::Acquire);
            let ok = unsafe { ReleaseSemaphore(handle, 1, std::ptr::null_mut()) };
            if ok != 0 {
                Ok(())
            } else {
                Err(SemaphoreError::SemaphoreOverflow)
            }
        }

        pub fn wait(&self) -> Result<(), SemaphoreError> {
            let handle = self.handle.load(Ordering::Acquire);
            match unsafe { WaitForSingleObject(handle, u32::MAX) } {
                WAIT_OBJECT_0 => Ok(()),
                _ => Err(SemaphoreError::Undefined),
            }
        }

        pub fn timed_wait(&self, timeout: Duration) -> Result<bool, SemaphoreError> {
            let handle = self.handle.load(Ordering::Acquire);
            match unsafe { WaitForSingleObject(handle, timeout.as_millis() as u32) } {
                WAIT_OBJECT_0 => Ok(true),
                WAIT_TIMEOUT => Ok(false),
                _ => Err(SemaphoreError::Undefined),
            }
        }

        /// # Safety
        /// See the POSIX `destroy` — same contract.
        pub unsafe fn destroy(&mut self) -> Result<(), SemaphoreError> {
            let handle = self.handle.swap(0, Ordering::AcqRel);
            if handle != 0 && unsafe { CloseHandle(handle) } != 0 {
                Ok(())
            } else {
                Err(SemaphoreError::InvalidSemaphoreHandle)
            }
        }
    }
}

pub use imp::UnnamedSemaphore;

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::mem::MaybeUninit;
    use std::time::Duration;

    fn placement() -> Box<MaybeUninit<UnnamedSemaphore>> {
        Box::new(MaybeUninit::uninit())
    }

    #[test]
    fn init_post_wait_roundtrip() {
        let mut storage = placement();
        let sem = unsafe {
            let ptr = storage.as_mut_ptr();
            (*ptr).init(1).expect("init");
            &mut *ptr
        };
        sem.wait().expect("wait should consume initial token");
        sem.post().expect("post");
        sem.wait().expect("wait should consume posted token");
        unsafe { sem.destroy().expect("destroy") };
    }

    #[test]
    fn timed_wait_times_out_on_zero_count() {
        let mut storage = placement();
        let sem = unsafe {
            let ptr = storage.as_mut_ptr();
            (*ptr).init(0).expect("init");
            &mut *ptr
        };
        let got = sem.timed_wait(Duration::from_millis(20)).expect("timed_wait");
        assert!(!got);
        unsafe { sem.destroy().expect("destroy") };
    }
}
