//! Fixed-width element encodings used directly by the mapped array engine.
//!
//! Narrow (3/5/6/7-byte) encodings are *not* `Element`s: they are only ever
//! reached through the narrow-integer adapter (`narrow` module), which owns
//! its own byte-slot engine. Every `Element` here is bitwise-identical to
//! its on-disk representation, which is what makes `MArray::as_span`
//! zero-copy for them.

/// A fixed-width value that can be read from / written to a little-endian
/// byte slot of exactly `WIDTH` bytes.
pub trait Element: Copy + Send + Sync + 'static {
    const WIDTH: usize;
    fn encode(self, out: &mut [u8]);
    fn decode(bytes: &[u8]) -> Self;
    /// Zero value used to fill newly-grown capacity.
    fn zero() -> Self;
}

macro_rules! impl_element_int {
    ($t:ty) => {
        impl Element for $t {
            const WIDTH: usize = std::mem::size_of::<$t>();
            #[inline]
            fn encode(self, out: &mut [u8]) {
                out[..Self::WIDTH].copy_from_slice(&self.to_le_bytes());
            }
            #[inline]
            fn decode(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$t>()];
                buf.copy_from_slice(&bytes[..Self::WIDTH]);
                <$t>::from_le_bytes(buf)
            }
            #[inline]
            fn zero() -> Self {
                0 as $t
            }
        }
    };
}

impl_element_int!(i8);
impl_element_int!(u8);
impl_element_int!(i16);
impl_element_int!(u16);
impl_element_int!(i32);
impl_element_int!(u32);
impl_element_int!(i64);
impl_element_int!(u64);

impl Element for f32 {
    const WIDTH: usize = 4;
    #[inline]
    fn encode(self, out: &mut [u8]) {
        out[..4].copy_from_slice(&self.to_le_bytes());
    }
    #[inline]
    fn decode(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&bytes[..4]);
        f32::from_le_bytes(buf)
    }
    #[inline]
    fn zero() -> Self {
        0.0
    }
}

impl Element for f64 {
    const WIDTH: usize = 8;
    #[inline]
    fn encode(self, out: &mut [u8]) {
        out[..8].copy_from_slice(&self.to_le_bytes());
    }
    #[inline]
    fn decode(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&bytes[..8]);
        f64::from_le_bytes(buf)
    }
    #[inline]
    fn zero() -> Self {
        0.0
    }
}
