use mmarray::error::Error;
use mmarray::lock;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn acquire_then_release_removes_the_sidecar_and_allows_a_retry() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("prices.dat");
    let sidecar = PathBuf::from(format!("{}.lock", path.display()));

    let token = lock::acquire(&path, Duration::from_secs(1), Duration::from_millis(10), false).unwrap();
    assert!(sidecar.exists());
    assert_eq!(token.data_file_path, path);

    lock::release(token).unwrap();
    assert!(!sidecar.exists());

    let token2 = lock::acquire(&path, Duration::from_secs(1), Duration::from_millis(10), false).unwrap();
    lock::release(token2).unwrap();
}

const ROLE_VAR: &str = "MMARRAY_LOCK_TEST_CHILD";
const PATH_VAR: &str = "MMARRAY_LOCK_TEST_PATH";
const HOLD_MS_VAR: &str = "MMARRAY_LOCK_TEST_HOLD_MS";

#[test]
fn acquire_times_out_while_a_live_process_holds_the_sidecar() {
    if std::env::var(ROLE_VAR).is_ok() {
        run_as_lock_holder();
        return;
    }

    let dir = tempdir().unwrap();
    let path: PathBuf = dir.path().join("held.dat");

    let mut child = Command::new(std::env::current_exe().unwrap())
        .arg("acquire_times_out_while_a_live_process_holds_the_sidecar")
        .arg("--exact")
        .arg("--nocapture")
        .env(ROLE_VAR, "1")
        .env(PATH_VAR, &path)
        .env(HOLD_MS_VAR, "350")
        .spawn()
        .unwrap();

    std::thread::sleep(Duration::from_millis(120));

    let err = lock::acquire(&path, Duration::from_millis(80), Duration::from_millis(10), false).unwrap_err();
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
