use mmarray::{DataType, MArray, OpenOptions};
use tempfile::tempdir;

#[test]
fn truncate_head_drops_leading_elements_in_place() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("s6.dat");

    let mut engine = MArray::<i32>::open(&path, DataType::Int32, OpenOptions::default()).unwrap();
    engine.append_range([10, 20, 30, 40, 50]).unwrap();
    let capacity_before = engine.capacity();

    engine.truncate_head(2, None).unwrap();

    assert_eq!(engine.len(), 2);
    assert_eq!(engine.read(0).unwrap(), 40);
    assert_eq!(engine.read(1).unwrap(), 50);
    assert_eq!(engine.capacity(), capacity_before);
}
