// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Cross-platform named inter-process semaphore.
// POSIX: a named `sem_t` via `sem_open`. Windows: a kernel named semaphore
// via `CreateSemaphoreW`. Used internally by `IpcCondition`'s Windows
// emulation and exposed as a standalone primitive alongside `IpcMutex`.

use std::io;

/// A named, inter-process counting semaphore.
pub struct IpcSemaphore {
    #[cfg(unix)]
    inner: posix::PosixSemaphore,
    #[cfg(windows)]
    inner: windows_impl::WindowsSemaphore,
}

impl IpcSemaphore {
    /// Open (or create) a named semaphore with `initial_count`.
    pub fn open(name: &str, initial_count: u32) -> io::Result<Self> {
        #[cfg(unix)]
        let inner = posix::PosixSemaphore::open(name, initial_count)?;
        #[cfg(windows)]
        let inner = windows_impl::WindowsSemaphore::open(name, initial_count)?;
        Ok(Self { inner })
    }

    /// Wait on the semaphore. `timeout_ms` of `None` blocks indefinitely.
    /// Returns `Ok(true)` if the count was decremented, `Ok(false)` on timeout.
    pub fn wait(&self, timeout_ms: Option<u64>) -> io::Result<bool> {
        self.inner.wait(timeout_ms)
    }

    /// Increment the semaphore's count by `count`.
    pub fn post(&self, count: u32) -> io::Result<()> {
        self.inner.post(count)
    }

    /// Remove the backing storage for a named semaphore (static helper).
    pub fn clear_storage(name: &str) {
        #[cfg(unix)]
        posix::PosixSemaphore::clear_storage(name);
        #[cfg(windows)]
        {
            let _ = name;
        }
    }
}

// ---------------------------------------------------------------------------
// POSIX implementation — named sem_t via sem_open
// ---------------------------------------------------------------------------

#[cfg(unix)]
mod posix {
    use std::ffi::CString;
    use std::io;
    use std::ptr;

    use crate::shm_name;

    pub(super) struct PosixSemaphore {
        sem: *mut libc::sem_t,
        name: String,
    }

    unsafe impl Send for PosixSemaphore {}
    unsafe impl Sync for PosixSemaphore {}

    fn posix_name(name: &str) -> String {
        shm_name::make_shm_name(name)
    }

    impl PosixSemaphore {
        pub(super) fn open(name: &str, initial_count: u32) -> io::Result<Self> {
            let cname = posix_name(name);
            let c_name = CString::new(cname.as_bytes())
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

            let sem = unsafe {
                libc::sem_open(
                    c_name.as_ptr(),
                    libc::O_CREAT,
                    0o666 as libc::c_uint,
                    initial_count as libc::c_uint,
                )
            };
            if sem == libc::SEM_FAILED {
                return Err(io::Error::last_os_error());
            }

            Ok(Self {
                sem,
                name: cname,
            })
        }

        pub(super) fn wait(&self, timeout_ms: Option<u64>) -> io::Result<bool> {
            match timeout_ms {
                None => loop {
                    let ret = unsafe { libc::sem_wait(self.sem) };
                    if ret == 0 {
                        return Ok(true);
                    }
                    let err = io::Error::last_os_error();
                    if err.raw_os_error() == Some(libc::EINTR) {
                        continue;
                    }
                    return Err(err);
                },
                Some(ms) => {
                    use std::time::{SystemTime, UNIX_EPOCH};
                    let now = SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .unwrap_or_default();
                    let deadline = now + std::time::Duration::from_millis(ms);
                    let ts = libc::timespec {
                        tv_sec: deadline.as_secs() as libc::time_t,
                        tv_nsec: deadline.subsec_nanos() as libc::c_long,
                    };
                    loop {
                        let ret = unsafe { libc::sem_timedwait(self.sem, &ts) };
                        if ret == 0 {
                            return Ok(true);
                        }
                        let err = io::Error::last_os_error();
                        match err.raw_os_error() {
                            Some(libc::EINTR) => continue,
                            Some(libc::ETIMEDOUT) => return Ok(false),
                            _ => return Err(err),
                        }
                    }
                }
            }
        }

        pub(super) fn post(&self, count: u32) -> io::Result<()> {
            for _ in 0..count {
                if unsafe { libc::sem_post(self.sem) } != 0 {
                    return Err(io::Error::last_os_error());
                }
            }
            Ok(())
        }

        pub(super) fn clear_storage(name: &str) {
            let cname = posix_name(name);
            if let Ok(c_name) = CString::new(cname.as_bytes()) {
                unsafe { libc::sem_unlink(c_name.as_ptr()) };
            }
        }
    }

    impl Drop for PosixSemaphore {
        fn drop(&mut self) {
            if !self.sem.is_null() {
                unsafe { libc::sem_close(self.sem) };
            }
            let _ = ptr::addr_of!(self.name);
        }
    }
}

// ---------------------------------------------------------------------------
// Windows implementation — named kernel semaphore via CreateSemaphoreW
// ---------------------------------------------------------------------------

#[cfg(windows)]
mod windows_impl {
    use std::io;
    use std::ptr;

    use windows_sys::Win32::Foundation::{CloseHandle, HANDLE};
    use windows_sys::Win32::System::Threading::{
        CreateSemaphoreW, ReleaseSemaphore, WaitForSingleObject,
    };

    const WAIT_OBJECT_0: u32 = 0;
    const WAIT_TIMEOUT: u32 = 0x0000_0102;
    const INFINITE: u32 = 0xFFFF_FFFF;

    fn to_wide(s: &str) -> Vec<u16> {
        s.encode_utf16().chain(std::iter::once(0)).collect()
    }

    pub(super) struct WindowsSemaphore {
        handle: HANDLE,
    }

    unsafe impl Send for WindowsSemaphore {}
    unsafe impl Sync for WindowsSemaphore {}

    impl WindowsSemaphore {
        pub(super) fn open(name: &str, initial_count: u32) -> io::Result<Self> {
            let wide = to_wide(name);
            let handle = unsafe {
                CreateSemaphoreW(ptr::null(), initial_count as i32, i32::MAX, wide.as_ptr())
            };
            if handle == 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(Self { handle })
        }

        pub(super) fn wait(&self, timeout_ms: Option<u64>) -> io::Result<bool> {
            let ms = match timeout_ms {
                None => INFINITE,
                Some(ms) => ms as u32,
            };
            let ret = unsafe { WaitForSingleObject(self.handle, ms) };
            match ret {
                WAIT_OBJECT_0 => Ok(true),
                WAIT_TIMEOUT => Ok(false),
                _ => Err(io::Error::last_os_error()),
            }
        }

        pub(super) fn post(&self, count: u32) -> io::Result<()> {
            if count == 0 {
                return Ok(());
            }
            let ok = unsafe { ReleaseSemaphore(self.handle, count as i32, ptr::null_mut()) };
            if ok == 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        }
    }

    impl Drop for WindowsSemaphore {
        fn drop(&mut self) {
            if self.handle != 0 {
                unsafe { CloseHandle(self.handle) };
            }
        }
    }
}
