//! The `data_type` header discriminant and its byte width.

/// Discriminant stored in the file header at offset 4. The exact integer
/// values are part of the on-disk format and must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum DataType {
    AnyStruct = 0,
    Bit = 1,
    SByte = 2,
    Byte = 3,
    Int16 = 4,
    UInt16 = 5,
    Int32 = 6,
    UInt32 = 7,
    Int64 = 8,
    UInt64 = 9,
    Single = 10,
    Double = 11,
    DateTime = 12,
    UnixSeconds = 13,
    Int24AsInt64 = 14,
    Int40AsInt64 = 15,
    Int48AsInt64 = 16,
    Int56AsInt64 = 17,
    UInt24AsInt64 = 18,
    UInt40AsInt64 = 19,
    UInt48AsInt64 = 20,
    UInt56AsInt64 = 21,
}

impl DataType {
    pub fn from_i32(v: i32) -> Option<Self> {
        use DataType::*;
        Some(match v {
            0 => AnyStruct,
            1 => Bit,
            2 => SByte,
            3 => Byte,
            4 => Int16,
            5 => UInt16,
            6 => Int32,
            7 => UInt32,
            8 => Int64,
            9 => UInt64,
            10 => Single,
            11 => Double,
            12 => DateTime,
            13 => UnixSeconds,
            14 => Int24AsInt64,
            15 => Int40AsInt64,
            16 => Int48AsInt64,
            17 => Int56AsInt64,
            18 => UInt24AsInt64,
            19 => UInt40AsInt64,
            20 => UInt48AsInt64,
            21 => UInt56AsInt64,
            _ => return None,
        })
    }

    /// Element byte width implied by this discriminant. `Bit` reports the
    /// width of its backing `u32` word, not one bit.
    pub fn element_width(self) -> usize {
        use DataType::*;
        match self {
            AnyStruct => 0,
            Bit => 4,
            SByte | Byte => 1,
            Int16 | UInt16 => 2,
            Int24AsInt64 | UInt24AsInt64 => 3,
            Int32 | UInt32 | Single | UnixSeconds => 4,
            Int40AsInt64 | UInt40AsInt64 => 5,
            Int48AsInt64 | UInt48AsInt64 => 6,
            Int56AsInt64 | UInt56AsInt64 => 7,
            Int64 | UInt64 | Double | DateTime => 8,
        }
    }

    pub fn is_narrow(self) -> bool {
        use DataType::*;
        matches!(
            self,
            Int24AsInt64
                | Int40AsInt64
                | Int48AsInt64
                | Int56AsInt64
                | UInt24AsInt64
                | UInt40AsInt64
                | UInt48AsInt64
                | UInt56AsInt64
        )
    }
}
