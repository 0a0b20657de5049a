//! Windows lock dialect: the data file itself is the lock. Opening it with
//! `FILE_SHARE_READ` (denying other writers) is the OS-level exclusivity
//! primitive; `poll` retries on share violations until the deadline.

use super::{Dialect, LockToken};
use crate::diag::note;
use crate::error::{Error, Result};
use chrono::Utc;
use std::os::windows::ffi::OsStrExt;
use std::os::windows::io::FromRawHandle;
use std::path::Path;
use std::time::{Duration, Instant};
use uuid::Uuid;
use winapi::um::fileapi::{CreateFileW, OPEN_ALWAYS};
use winapi::um::handleapi::INVALID_HANDLE_VALUE;
use winapi::um::winnt::{FILE_ATTRIBUTE_NORMAL, FILE_SHARE_READ, GENERIC_READ, GENERIC_WRITE};

#[derive(Debug)]
pub struct ShareReadHandle {
    file: std::fs::File,
}

fn wide_path(path: &Path) -> Vec<u16> {
    path.as_os_str()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

fn try_open(path: &Path) -> std::io::Result<std::fs::File> {
    let wide = wide_path(path);
    // SAFETY: `wide` is a valid NUL-terminated UTF-16 string for the
    // duration of this call, and the returned handle is checked before use.
    let handle = unsafe {
        CreateFileW(
            wide.as_ptr(),
            GENERIC_READ | GENERIC_WRITE,
            FILE_SHARE_READ,
            std::ptr::null_mut(),
            OPEN_ALWAYS,
            FILE_ATTRIBUTE_NORMAL,
            std::ptr::null_mut(),
        )
    };
    if handle == INVALID_HANDLE_VALUE {
        return Err(std::io::Error::last_os_error());
    }
    // SAFETY: `handle` was just returned by `CreateFileW` as valid and
    // exclusively owned by this call site.
    Ok(unsafe { std::fs::File::from_raw_handle(handle as *mut _) })
}

pub(super) fn acquire(data_path: &Path, timeout: Duration, poll_interval: Duration) -> Result<LockToken> {
    let deadline = Instant::now() + timeout;
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match try_open(data_path) {
            Ok(file) => {
                return Ok(LockToken {
                    pid: std::process::id(),
                    pid_start_time_utc: None,
                    timestamp_utc: Utc::now(),
                    hostname: std::env::var("COMPUTERNAME").unwrap_or_else(|_| "unknown-host".into()),
                    user: std::env::var("USERNAME").unwrap_or_else(|_| "unknown-user".into()),
                    lock_id: Uuid::new_v4(),
                    data_file_path: data_path.to_path_buf(),
                    dialect: Dialect::Windows { handle: ShareReadHandle { file } },
                });
            }
            Err(e) => {
                let share_violation = e.raw_os_error() == Some(32 /* ERROR_SHARING_VIOLATION */);
                if !share_violation {
                    return Err(Error::Io(e));
                }
                note!(2, "lock {}: share violation, poll {attempt}", data_path.display());
                if Instant::now() >= deadline {
                    return Err(Error::LockContention);
                }
                std::thread::sleep(poll_interval.min(deadline.saturating_duration_since(Instant::now())));
            }
        }
    }
}

pub(super) fn release(handle: ShareReadHandle) -> Result<()> {
    drop(handle.file);
    Ok(())
}
