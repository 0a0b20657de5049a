use mmarray::error::Error;
use mmarray::{OpenOptions, OrderingMode, TimeSeries};
use tempfile::tempdir;

#[test]
fn ascending_ticks_reject_a_repeat_and_support_search() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("s5.dat");

    let t0 = 638_400_000_000_000_000i64; // 2024-01-01T00:00:00Z in .NET ticks, illustrative
    let t1 = t0 + 10_000_000; // +1s in 100ns ticks

    let mut ts = TimeSeries::<i64>::open_ticks(&path, OpenOptions::default(), OrderingMode::Ascending)
        .unwrap();
    ts.append(t0).unwrap();
    ts.append(t1).unwrap();

    let err = ts.append(t1).unwrap_err();
    assert!(matches!(err, Error::OutOfOrder { .. }));

    assert_eq!(ts.upper_bound(t0).unwrap(), 1);
    assert_eq!(ts.binary_search(t1).unwrap(), 1);
}
