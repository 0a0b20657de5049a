//! L1 — the cross-process exclusive writer lock.
//!
//! Two platform dialects share one contract: `acquire` blocks (bounded by a
//! deadline) until this process is the sole writer for `data_path`, and
//! returns a [`LockToken`] that `release` later gives back. The dialects
//! differ in how exclusivity is implemented, not in what they guarantee.

mod metadata;
#[cfg(unix)]
mod posix;
#[cfg(windows)]
mod windows;

pub use metadata::LockMetadata;

#[cfg(not(any(unix, windows)))]
use crate::error::Error;
use crate::error::Result;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

#[cfg(unix)]
#[derive(Debug)]
enum Dialect {
    Posix { sidecar_path: PathBuf },
}

#[cfg(windows)]
#[derive(Debug)]
enum Dialect {
    Windows { handle: windows::ShareReadHandle },
}

/// A held writer lock. Dropping it without calling [`release`] leaks the
/// sidecar/handle until the process exits; callers should always release
/// explicitly (the engine does this on `Drop`).
#[derive(Debug)]
pub struct LockToken {
    pub pid: u32,
    pub pid_start_time_utc: Option<DateTime<Utc>>,
    pub timestamp_utc: DateTime<Utc>,
    pub hostname: String,
    pub user: String,
    pub lock_id: Uuid,
    pub data_file_path: PathBuf,
    dialect: Dialect,
}

/// Acquire the exclusive writer lock for `data_path`, polling every
/// `poll_interval` until either it succeeds or `timeout` elapses.
///
/// `also_lock_data` additionally denies other writers to the data file
/// itself; on the Windows dialect the data file open already implies this,
/// on POSIX it is a request to also attempt an advisory lock on the data
/// file as a secondary defense. Non-Windows platforms otherwise rely solely
/// on the sidecar.
pub fn acquire(
    data_path: &Path,
    timeout: Duration,
    poll_interval: Duration,
    also_lock_data: bool,
) -> Result<LockToken> {
    #[cfg(unix)]
    {
        posix::acquire(data_path, timeout, poll_interval, also_lock_data)
    }
    #[cfg(windows)]
    {
        let _ = also_lock_data;
        windows::acquire(data_path, timeout, poll_interval)
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = (data_path, timeout, poll_interval, also_lock_data);
        Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "writer lock is only implemented for unix and windows",
        )))
    }
}

/// Release a previously-acquired writer lock.
pub fn release(token: LockToken) -> Result<()> {
    match token.dialect {
        #[cfg(unix)]
        Dialect::Posix { sidecar_path } => posix::release(&sidecar_path),
        #[cfg(windows)]
        Dialect::Windows { handle } => windows::release(handle),
    }
}
