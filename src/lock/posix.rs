//! POSIX lock dialect: an atomically-created `<data>.lock` sidecar holding
//! JSON metadata about the owning process.

use super::{Dialect, LockMetadata, LockToken};
use crate::diag::note;
use crate::error::{Error, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use nix::sys::signal::kill;
use nix::unistd::Pid;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use uuid::Uuid;

fn lock_sidecar_path(data_path: &Path) -> PathBuf {
    let mut s = data_path.as_os_str().to_owned();
    s.push(".lock");
    PathBuf::from(s)
}

fn hostname() -> String {
    nix::unistd::gethostname()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown-host".to_string())
}

fn username() -> String {
    nix::unistd::User::from_uid(nix::unistd::getuid())
        .ok()
        .flatten()
        .map(|u| u.name)
        .unwrap_or_else(|| "unknown-user".to_string())
}

fn process_exists(pid: u32) -> bool {
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

/// Best-effort process start time, read from `/proc/<pid>/stat` on Linux.
/// Returns `None` on any other platform or on parse failure, in which case
/// the caller falls back to the 24-hour staleness heuristic.
#[cfg(target_os = "linux")]
fn process_start_time_utc(pid: u32) -> Option<DateTime<Utc>> {
    let stat = std::fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
    let after_comm = stat.rsplit_once(')')?.1;
    let fields: Vec<&str> = after_comm.split_whitespace().collect();
    // fields[0] is pid's `state` (field 3 overall); starttime is field 22
    // overall, i.e. index 22 - 3 = 19 here.
    let starttime_ticks: u64 = fields.get(19)?.parse().ok()?;

    let clk_tck = nix::unistd::sysconf(nix::unistd::SysconfVar::CLK_TCK)
        .ok()
        .flatten()
        .unwrap_or(100) as u64;

    let proc_stat = std::fs::read_to_string("/proc/stat").ok()?;
    let btime: i64 = proc_stat
        .lines()
        .find_map(|l| l.strip_prefix("btime "))
        .and_then(|v| v.trim().parse().ok())?;

    let offset_secs = (starttime_ticks / clk_tck) as i64;
    let started = DateTime::<Utc>::from_timestamp(btime + offset_secs, 0)?;
    Some(started)
}

#[cfg(not(target_os = "linux"))]
fn process_start_time_utc(_pid: u32) -> Option<DateTime<Utc>> {
    None
}

/// Whether `meta`'s recorded owner should be considered gone.
fn is_stale(meta: &LockMetadata, now: DateTime<Utc>) -> bool {
    if !process_exists(meta.pid) {
        return true;
    }
    match process_start_time_utc(meta.pid) {
        Some(live_start) => match meta.pid_start_time_utc {
            Some(recorded) => (live_start - recorded).num_seconds().abs() > 1,
            None => false,
        },
        None => now - meta.timestamp_utc > ChronoDuration::hours(24),
    }
}

fn write_metadata(path: &Path, meta: &LockMetadata) -> Result<()> {
    let json = serde_json::to_vec_pretty(meta)
        .map_err(|e| Error::Corruption(format!("failed to serialize lock metadata: {e}")))?;
    let tmp = path.with_extension(format!("lock.tmp-{}", Uuid::new_v4()));
    {
        let mut f = OpenOptions::new().write(true).create_new(true).open(&tmp)?;
        f.write_all(&json)?;
        f.flush()?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn read_metadata(path: &Path) -> Option<LockMetadata> {
    let mut buf = String::new();
    std::fs::File::open(path).ok()?.read_to_string(&mut buf).ok()?;
    serde_json::from_str(&buf).ok()
}

pub(super) fn acquire(
    data_path: &Path,
    timeout: Duration,
    poll_interval: Duration,
    _also_lock_data: bool,
) -> Result<LockToken> {
    let sidecar = lock_sidecar_path(data_path);
    let deadline = Instant::now() + timeout;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let now = Utc::now();
        let meta = LockMetadata {
            pid: std::process::id(),
            pid_start_time_utc: process_start_time_utc(std::process::id()),
            timestamp_utc: now,
            hostname: hostname(),
            user: username(),
            lock_id: Uuid::new_v4(),
            data_file_path: data_path.to_string_lossy().into_owned(),
        };

        match OpenOptions::new().write(true).create_new(true).open(&sidecar) {
            Ok(mut f) => {
                let json = serde_json::to_vec_pretty(&meta)
                    .map_err(|e| Error::Corruption(format!("failed to serialize lock metadata: {e}")))?;
                f.write_all(&json)?;
                f.flush()?;
                f.sync_all()?;
                return Ok(make_token(meta, sidecar));
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let stale = match read_metadata(&sidecar) {
                    Some(existing) => is_stale(&existing, now),
                    None => true,
                };
                if stale {
                    note!(1, "lock {}: recovering stale sidecar on attempt {attempt}", sidecar.display());
                    write_metadata(&sidecar, &meta)?;
                    return Ok(make_token(meta, sidecar));
                }
                note!(2, "lock {}: held by another process, poll {attempt}", sidecar.display());
                if Instant::now() >= deadline {
                    return Err(Error::LockTimeout { waited: timeout });
                }
                std::thread::sleep(poll_interval.min(deadline.saturating_duration_since(Instant::now())));
            }
            Err(e) => return Err(Error::Io(e)),
        }
    }
}

fn make_token(meta: LockMetadata, sidecar: PathBuf) -> LockToken {
    LockToken {
        pid: meta.pid,
        pid_start_time_utc: meta.pid_start_time_utc,
        timestamp_utc: meta.timestamp_utc,
        hostname: meta.hostname,
        user: meta.user,
        lock_id: meta.lock_id,
        data_file_path: PathBuf::from(meta.data_file_path),
        dialect: Dialect::Posix { sidecar_path: sidecar },
    }
}

pub(super) fn release(sidecar_path: &Path) -> Result<()> {
    match std::fs::remove_file(sidecar_path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Io(e)),
    }
}
