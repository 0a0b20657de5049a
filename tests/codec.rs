use mmarray::codec::{smallest_type, IntegerDomain, NarrowWidth};
use mmarray::DataType;

#[test]
fn narrow_width_round_trips_extreme_values_through_data_type() {
    for w in NarrowWidth::ALL {
        assert_eq!(NarrowWidth::from_data_type(w.data_type()), Some(w));
        let mut buf = [0u8; 8];
        w.encode(w.max(), &mut buf[..w.byte_width()]);
        assert_eq!(w.decode(&buf[..w.byte_width()]), w.max());
        w.encode(w.min(), &mut buf[..w.byte_width()]);
        assert_eq!(w.decode(&buf[..w.byte_width()]), w.min());
    }
}

#[test]
fn widening_table_picks_the_exact_boundary_rungs() {
    assert_eq!(smallest_type(0, 0), IntegerDomain::Bit);
    assert_eq!(smallest_type(-128, 127), IntegerDomain::Native(DataType::SByte));
    assert_eq!(
        smallest_type(NarrowWidth::UInt24.max(), NarrowWidth::UInt24.max()),
        IntegerDomain::Narrow(NarrowWidth::UInt24)
    );
    assert_eq!(
        smallest_type(NarrowWidth::UInt24.max() + 1, NarrowWidth::UInt24.max() + 1),
        IntegerDomain::Native(DataType::UInt32)
    );
}

#[test]
fn data_type_element_width_matches_narrow_byte_width() {
    for w in NarrowWidth::ALL {
        assert_eq!(w.data_type().element_width(), w.byte_width());
        assert!(w.data_type().is_narrow());
    }
    assert!(!DataType::Int32.is_narrow());
}
