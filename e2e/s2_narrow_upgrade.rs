use mmarray::codec::IntegerDomain;
use mmarray::{DataType, NarrowAdapter, OpenOptions};
use tempfile::tempdir;

#[test]
fn narrow_adapter_migrates_on_overflow() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("s2prime.dat");

    let mut adapter = NarrowAdapter::open_with_initial_domain(
        &path,
        OpenOptions::default(),
        IntegerDomain::Narrow(mmarray::codec::NarrowWidth::Int24),
    )
    .unwrap();
    adapter.append(1_000_000).unwrap();
    assert_eq!(adapter.domain().data_type(), DataType::Int24AsInt64);

    adapter.append(1 << 23).unwrap();
    assert_eq!(adapter.domain().data_type(), DataType::Int32);
    adapter.close().unwrap();

    let reopened = NarrowAdapter::open(&path, OpenOptions::default()).unwrap();
    assert_eq!(reopened.domain().data_type(), DataType::Int32);
    assert_eq!(reopened.len(), 2);
    assert_eq!(reopened.get(0).unwrap(), 1_000_000);
    assert_eq!(reopened.get(1).unwrap(), 8_388_608);
}
