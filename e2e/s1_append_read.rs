use mmarray::{DataType, MArray, Mode, OpenOptions};
use tempfile::tempdir;

#[test]
fn append_read_round_trip_then_reopen_as_reader() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("s1.dat");

    let mut writer = MArray::<i32>::open(
        &path,
        DataType::Int32,
        OpenOptions { mode: Mode::ReadWrite, ..Default::default() },
    )
    .unwrap();
    writer.append_range([1, 2, 3, 4, 5]).unwrap();
    assert_eq!(writer.len(), 5);
    assert_eq!(writer.read(2).unwrap(), 3);
    assert_eq!(writer.as_span(1, 3).unwrap(), vec![2, 3, 4]);
    writer.close().unwrap();

    let reader = MArray::<i32>::open(
        &path,
        DataType::Int32,
        OpenOptions { mode: Mode::ReadOnly, ..Default::default() },
    )
    .unwrap();
    assert_eq!(reader.len(), 5);
    assert_eq!(reader.read(4).unwrap(), 5);
}
