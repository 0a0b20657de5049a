use mmarray::error::Error;
use mmarray::{OpenOptions, OrderingMode, TimeSeries};
use tempfile::tempdir;

#[test]
fn set_last_enforces_ordering_against_the_prior_entry() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bars.dat");
    let mut ts = TimeSeries::<i64>::open_ticks(&path, OpenOptions::default(), OrderingMode::Ascending).unwrap();
    ts.append_range([100, 200, 300]).unwrap();

    ts.set_last(250).unwrap();
    assert_eq!(ts.get(2).unwrap(), 250);

    let err = ts.set_last(150).unwrap_err();
    assert!(matches!(err, Error::OutOfOrder { previous: 200, attempted: 150 }));
}

#[test]
fn trim_excess_shrinks_file_after_truncate_tail() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bars.dat");
    let mut ts = TimeSeries::<i64>::open_ticks(&path, OpenOptions::default(), OrderingMode::Ascending).unwrap();
    ts.append_range(1..50_000).unwrap();
    let len_before = std::fs::metadata(&path).unwrap().len();

    ts.truncate_tail(10).unwrap();
    ts.trim_excess().unwrap();

    let len_after = std::fs::metadata(&path).unwrap().len();
    assert!(len_after < len_before);
    assert_eq!(ts.len(), 10);
}

#[test]
fn disallow_remap_turns_growth_into_reset_disallowed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bars.dat");
    let mut ts = TimeSeries::<i64>::open_ticks(&path, OpenOptions::default(), OrderingMode::Ascending).unwrap();
    ts.disallow_remap();

    let err = (1..200_000).try_for_each(|v| ts.append(v)).unwrap_err();
    assert!(matches!(err, Error::ResetDisallowed));
}

#[test]
fn truncate_head_then_reopen_preserves_remaining_order() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bars.dat");
    {
        let mut ts =
            TimeSeries::<i32>::open_seconds(&path, OpenOptions::default(), OrderingMode::Ascending).unwrap();
        ts.append_range([10, 20, 30, 40, 50]).unwrap();
        ts.truncate_head(3, None).unwrap();
        ts.close().unwrap();
    }
    let reopened =
        TimeSeries::<i32>::open_seconds(&path, OpenOptions::default(), OrderingMode::Ascending).unwrap();
    assert_eq!(reopened.len(), 3);
    assert_eq!(reopened.as_span(0, 3).unwrap(), vec![30, 40, 50]);
}
