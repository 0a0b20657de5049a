use mmarray::{DataType, MArray, Mode, OpenOptions};
use tempfile::tempdir;

#[test]
fn append_through_a_capacity_grow() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("s2.dat");

    let mut engine = MArray::<u8>::open(
        &path,
        DataType::Byte,
        OpenOptions { mode: Mode::ReadWrite, initial_capacity_items: 0, ..Default::default() },
    )
    .unwrap();

    let first_page_capacity = engine.capacity();
    assert_eq!(first_page_capacity, 4096 - 16); // one page minus the 16-byte base header

    for i in 0..first_page_capacity {
        engine.append((i % 256) as u8).unwrap();
    }
    let len_before_grow = std::fs::metadata(&path).unwrap().len();
    assert_eq!(len_before_grow, 4096);

    engine.append(255).unwrap();

    let len_after_grow = std::fs::metadata(&path).unwrap().len();
    assert_eq!(len_after_grow, 8192);
    assert_eq!(engine.len(), first_page_capacity + 1);
    assert_eq!(engine.read(first_page_capacity).unwrap(), 255);
}
