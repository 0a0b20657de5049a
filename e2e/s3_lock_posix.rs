use mmarray::error::Error;
use mmarray::lock;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

const ROLE_VAR: &str = "MMARRAY_E2E_LOCK_CHILD";
const PATH_VAR: &str = "MMARRAY_E2E_LOCK_PATH";
const HOLD_MS_VAR: &str = "MMARRAY_E2E_LOCK_HOLD_MS";

/// Re-executed as the child role: acquire the lock on the given path and
/// hold it for `MMARRAY_E2E_LOCK_HOLD_MS` milliseconds before releasing.
#[test]
fn contending_writer_times_out_then_succeeds_after_release() {
    if std::env::var(ROLE_VAR).is_ok() {
        run_as_lock_holder();
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let path: PathBuf = dir.path().join("s3.bt");

    let mut child = Command::new(std::env::current_exe().unwrap())
        .arg("contending_writer_times_out_then_succeeds_after_release")
        .arg("--exact")
        .arg("--nocapture")
        .env(ROLE_VAR, "1")
        .env(PATH_VAR, &path)
        .env(HOLD_MS_VAR, "400")
        .spawn()
        .unwrap();

    // Give the child a generous head start to create the sidecar.
    std::thread::sleep(Duration::from_millis(150));

    let start = std::time::Instant::now();
    let err = lock::acquire(&path, Duration::from_millis(100), Duration::from_millis(10), false)
        .unwrap_err();
    assert!(start.elapsed() >= Duration::from_millis(90));
    assert!(matches!(err, Error::LockTimeout { .. }));

    let status = child.wait().unwrap();
    assert!(status.success());

    let retried = lock::acquire(&path, Duration::from_secs(5), Duration::from_millis(10), false).unwrap();
    lock::release(retried).unwrap();
}

fn run_as_lock_holder() {
    let path = PathBuf::from(std::env::var(PATH_VAR).unwrap());
    let hold_ms: u64 = std::env::var(HOLD_MS_VAR).unwrap().parse().unwrap();
    let token = lock::acquire(&path, Duration::from_secs(5), Duration::from_millis(10), false).unwrap();
    std::thread::sleep(Duration::from_millis(hold_ms));
    lock::release(token).unwrap();
}
