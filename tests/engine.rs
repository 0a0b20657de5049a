use mmarray::error::{BoundsMode, Error};
use mmarray::{DataType, MArray, Mode, OpenOptions};
use tempfile::tempdir;

#[test]
fn disallow_remap_turns_growth_into_reset_disallowed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fixed.dat");
    let mut engine = MArray::<i64>::open(&path, DataType::Int64, OpenOptions::default()).unwrap();
    engine.disallow_remap();

    for i in 0..engine.capacity() {
        engine.append(i).unwrap();
    }
    let err = engine.append(999).unwrap_err();
    assert!(matches!(err, Error::ResetDisallowed));
}

#[test]
fn trim_excess_shrinks_file_after_truncate_tail() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shrink.dat");
    let mut engine = MArray::<i32>::open(&path, DataType::Int32, OpenOptions::default()).unwrap();
    engine.append_range(0..5000).unwrap();
    let len_before = std::fs::metadata(&path).unwrap().len();

    engine.truncate_tail(10).unwrap();
    engine.trim_excess().unwrap();

    let len_after = std::fs::metadata(&path).unwrap().len();
    assert!(len_after < len_before);
    assert_eq!(engine.len(), 10);
    for i in 0..10 {
        assert_eq!(engine.read(i).unwrap(), i as i32);
    }
}

#[test]
fn opening_a_truncated_file_reports_corruption() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("truncated.dat");
    {
        let mut engine = MArray::<i64>::open(&path, DataType::Int64, OpenOptions::default()).unwrap();
        engine.append(1).unwrap();
        engine.close().unwrap();
    }
    let f = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
    f.set_len(8).unwrap();

    let result = MArray::<i64>::open(
        &path,
        DataType::Int64,
        OpenOptions { mode: Mode::ReadOnly, ..Default::default() },
    );
    match result {
        Err(err) => assert!(matches!(err, Error::Corruption(_))),
        Ok(_) => panic!("expected Corruption error"),
    }
}

#[test]
fn bounded_reads_past_a_racing_truncation_report_truncated() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("race.dat");
    let mut engine = MArray::<i32>::open(&path, DataType::Int32, OpenOptions::default()).unwrap();
    engine.append_range([1, 2, 3, 4, 5]).unwrap();

    engine.truncate_tail(2).unwrap();

    let err = engine.read_bounded(4, BoundsMode::ExpectConcurrentTruncation).unwrap_err();
    assert!(matches!(err, Error::Truncated { index: 4, len: 2 }));
    assert!(matches!(engine.read(4), Err(Error::OutOfRange { .. })));

    let err = engine.as_span_bounded(0, 5, BoundsMode::ExpectConcurrentTruncation).unwrap_err();
    assert!(matches!(err, Error::Truncated { index: 5, len: 2 }));
}

#[test]
fn read_only_writes_are_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ro.dat");
    {
        let mut engine = MArray::<i32>::open(&path, DataType::Int32, OpenOptions::default()).unwrap();
        engine.append_range([1, 2, 3]).unwrap();
        engine.close().unwrap();
    }
    let mut reader = MArray::<i32>::open(
        &path,
        DataType::Int32,
        OpenOptions { mode: Mode::ReadOnly, ..Default::default() },
    )
    .unwrap();
    assert_eq!(reader.as_span(0, 3).unwrap(), vec![1, 2, 3]);
    let err = reader.append(4).unwrap_err();
    assert!(matches!(err, Error::ReadOnly));
}
