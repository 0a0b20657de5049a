use mmarray::lock::{self, LockMetadata};
use std::io::Write;
use std::time::{Duration, Instant};

#[test]
fn acquire_recovers_a_sidecar_with_an_absent_pid() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("s4.bt");
    let sidecar_path = {
        let mut s = data_path.as_os_str().to_owned();
        s.push(".lock");
        std::path::PathBuf::from(s)
    };

    let stale = LockMetadata {
        pid: 2_147_483_647,
        pid_start_time_utc: None,
        timestamp_utc: chrono::Utc::now(),
        hostname: "stale-host".into(),
        user: "stale-user".into(),
        lock_id: uuid::Uuid::new_v4(),
        data_file_path: data_path.to_string_lossy().into_owned(),
    };
    let json = serde_json::to_vec_pretty(&stale).unwrap();
    std::fs::File::create(&sidecar_path).unwrap().write_all(&json).unwrap();

    let start = Instant::now();
    let token = lock::acquire(&data_path, Duration::from_secs(5), Duration::from_millis(50), false)
        .unwrap();
    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(token.pid, std::process::id());

    let recovered: LockMetadata =
        serde_json::from_str(&std::fs::read_to_string(&sidecar_path).unwrap()).unwrap();
    assert_eq!(recovered.pid, std::process::id());

    lock::release(token).unwrap();
}
