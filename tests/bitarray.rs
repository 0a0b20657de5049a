use mmarray::{BitArray, OpenOptions};
use tempfile::tempdir;

#[test]
fn reopening_preserves_bits_across_a_word_boundary() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("flags.dat");
    {
        let mut bits = BitArray::open(&path, OpenOptions::default()).unwrap();
        for i in 0..40 {
            bits.append(i % 3 == 0).unwrap();
        }
        bits.close().unwrap();
    }
    let reopened = BitArray::open(&path, OpenOptions::default()).unwrap();
    assert_eq!(reopened.length(), 40);
    for i in 0..40 {
        assert_eq!(reopened.get(i).unwrap(), i % 3 == 0);
    }
}

#[test]
fn cardinality_reflects_a_truncated_length_then_not_complements_each_bit() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mask.dat");
    let mut bits = BitArray::open(&path, OpenOptions::default()).unwrap();
    for i in 0..70 {
        bits.set(i, i % 2 == 0).unwrap();
    }
    bits.truncate_tail(65).unwrap();
    assert_eq!(bits.cardinality().unwrap(), 33);

    bits.not().unwrap();
    for i in 0..65 {
        assert_eq!(bits.get(i).unwrap(), i % 2 != 0);
    }
}

#[test]
fn trim_excess_shrinks_file_after_truncate_tail() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shrink.dat");
    let mut bits = BitArray::open(&path, OpenOptions::default()).unwrap();
    for i in 0..200_000 {
        bits.append(i % 2 == 0).unwrap();
    }
    let len_before = std::fs::metadata(&path).unwrap().len();

    bits.truncate_tail(10).unwrap();
    bits.trim_excess().unwrap();

    let len_after = std::fs::metadata(&path).unwrap().len();
    assert!(len_after < len_before);
    assert_eq!(bits.length(), 10);
}

#[test]
fn disallow_remap_turns_growth_into_reset_disallowed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fixed.dat");
    let mut bits = BitArray::open(&path, OpenOptions::default()).unwrap();
    bits.disallow_remap();

    let err = (0..200_000).try_for_each(|_| bits.append(true)).unwrap_err();
    assert!(matches!(err, mmarray::error::Error::ResetDisallowed));
}

#[test]
fn and_combines_two_bit_arrays_word_wise() {
    let dir = tempdir().unwrap();
    let a_path = dir.path().join("a.dat");
    let b_path = dir.path().join("b.dat");
    let mut a = BitArray::open(&a_path, OpenOptions::default()).unwrap();
    let mut b = BitArray::open(&b_path, OpenOptions::default()).unwrap();
    for i in 0..32 {
        a.append(i % 2 == 0).unwrap();
        b.append(i % 3 == 0).unwrap();
    }

    a.and(&b).unwrap();
    for i in 0..32 {
        assert_eq!(a.get(i).unwrap(), i % 2 == 0 && i % 3 == 0);
    }
}
