//! L3a — the bit-array overlay.
//!
//! A bit array layers a boolean-valued, bit-addressed view over
//! `MArray<u32>`. The overlay reserves 8 bytes right after the base header
//! for an independent bit-length (distinct from the engine's word `count`);
//! those bytes are zero-filled by the OS when the file is first extended,
//! which is exactly the all-clear initial state, so there is nothing to
//! initialise explicitly on creation.

use crate::engine::{MArray, OpenOptions};
use crate::error::{BoundsMode, Error, Result};
use crate::progress::ProgressSink;
use crate::types::DataType;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};

const OVERLAY_BYTES: usize = 8;
/// Offset of the bit-length field within the file: right after the 16-byte
/// base header, before the `u32` word array begins.
const BIT_LEN_OFFSET: usize = 16;

pub struct BitArray {
    engine: MArray<u32>,
}

impl BitArray {
    pub fn open<P: AsRef<Path>>(path: P, opts: OpenOptions) -> Result<Self> {
        let mut opts = opts;
        opts.extra_header_bytes = OVERLAY_BYTES;
        let engine = MArray::open(path, DataType::Bit, opts)?;
        Ok(BitArray { engine })
    }

    fn bit_len_ptr(&self) -> *mut i64 {
        unsafe { self.engine.raw_bytes().as_ptr().add(BIT_LEN_OFFSET) as *mut i64 }
    }

    fn load_length(&self) -> i64 {
        unsafe { (*AtomicI64::from_ptr(self.bit_len_ptr())).load(Ordering::Acquire) }
    }

    fn store_length(&mut self, v: i64) {
        unsafe { (*AtomicI64::from_ptr(self.bit_len_ptr())).store(v, Ordering::Release) };
    }

    /// Logical bit count, distinct from the backing engine's word `count`.
    pub fn length(&self) -> i64 {
        self.load_length()
    }

    pub fn is_empty(&self) -> bool {
        self.length() == 0
    }

    pub fn word_count(&self) -> i64 {
        self.engine.len()
    }

    pub fn get(&self, i: i64) -> Result<bool> {
        self.get_bounded(i, BoundsMode::Strict)
    }

    /// Like [`Self::get`], but `bounds` selects whether an index at or past
    /// the current length is reported as `OutOfRange` or `Truncated`.
    pub fn get_bounded(&self, i: i64, bounds: BoundsMode) -> Result<bool> {
        let len = self.length();
        if i < 0 {
            return Err(Error::OutOfRange { index: i, len });
        }
        if i >= len {
            return Err(bounds.past_end(i, len));
        }
        let word = self.engine.read(i >> 5)?;
        Ok(word & (1u32 << (i & 31)) != 0)
    }

    pub fn set(&mut self, i: i64, b: bool) -> Result<()> {
        self.engine.require_writer()?;
        if i < 0 {
            return Err(Error::OutOfRange { index: i, len: self.length() });
        }
        if i >= self.length() {
            self.extend_to(i + 1)?;
        }
        self.set_bit_no_extend(i, b)
    }

    pub fn append(&mut self, b: bool) -> Result<()> {
        self.engine.require_writer()?;
        let new_len = self.length() + 1;
        self.extend_to(new_len)?;
        self.set_bit_no_extend(new_len - 1, b)
    }

    fn set_bit_no_extend(&mut self, i: i64, b: bool) -> Result<()> {
        let word_idx = i >> 5;
        let mut word = self.engine.read(word_idx)?;
        let mask = 1u32 << (i & 31);
        if b {
            word |= mask;
        } else {
            word &= !mask;
        }
        self.engine.write_unchecked(word_idx, word);
        Ok(())
    }

    fn extend_to(&mut self, new_bit_len: i64) -> Result<()> {
        let needed_words = (new_bit_len + 31) >> 5;
        let cur_words = self.engine.len();
        if needed_words > cur_words {
            let extra = (needed_words - cur_words) as usize;
            self.engine.append_range(std::iter::repeat_n(0u32, extra))?;
        }
        self.store_length(new_bit_len);
        Ok(())
    }

    fn mask_last_word(&mut self) -> Result<()> {
        let len = self.length();
        if len == 0 {
            return Ok(());
        }
        let bit_in_word = len & 31;
        if bit_in_word == 0 {
            return Ok(());
        }
        let word_idx = (len - 1) >> 5;
        let mask = (1u32 << bit_in_word) - 1;
        let word = self.engine.read(word_idx)?;
        self.engine.write_unchecked(word_idx, word & mask);
        Ok(())
    }

    pub fn truncate_tail(&mut self, n: i64) -> Result<()> {
        self.engine.require_writer()?;
        let len = self.length();
        if n < 0 || n > len {
            return Err(Error::OutOfRange { index: n, len });
        }
        self.store_length(n);
        self.engine.truncate_tail((n + 31) >> 5)?;
        self.mask_last_word()
    }

    pub fn truncate_head(&mut self, n: i64, progress: Option<&dyn ProgressSink>) -> Result<()> {
        self.engine.require_writer()?;
        let len = self.length();
        if n < 0 || n > len {
            return Err(Error::OutOfRange { index: n, len });
        }
        let start = len - n;
        let total = n.max(1) as u64;
        for i in 0..n {
            let bit = self.get(start + i)?;
            self.set_bit_no_extend(i, bit)?;
            if let Some(sink) = progress {
                sink.report((i + 1) as u64, total, "truncate_head");
            }
        }
        self.store_length(n);
        self.mask_last_word()
    }

    pub fn trim_excess(&mut self) -> Result<()> {
        self.engine.trim_excess()
    }

    pub fn disallow_remap(&mut self) {
        self.engine.disallow_remap()
    }

    fn binop(&mut self, other: &BitArray, f: impl Fn(u32, u32) -> u32) -> Result<()> {
        self.engine.require_writer()?;
        let words = self.engine.len().min(other.engine.len());
        for w in 0..words {
            let a = self.engine.read(w)?;
            let b = other.engine.read(w)?;
            self.engine.write_unchecked(w, f(a, b));
        }
        Ok(())
    }

    pub fn and(&mut self, other: &BitArray) -> Result<()> {
        self.binop(other, |a, b| a & b)
    }

    pub fn or(&mut self, other: &BitArray) -> Result<()> {
        self.binop(other, |a, b| a | b)
    }

    pub fn xor(&mut self, other: &BitArray) -> Result<()> {
        self.binop(other, |a, b| a ^ b)
    }

    pub fn not(&mut self) -> Result<()> {
        self.engine.require_writer()?;
        let words = self.engine.len();
        for w in 0..words {
            let a = self.engine.read(w)?;
            self.engine.write_unchecked(w, !a);
        }
        Ok(())
    }

    pub fn cardinality(&self) -> Result<u64> {
        let words = (self.length() + 31) >> 5;
        let mut total = 0u64;
        for w in 0..words {
            total += self.engine.read(w)?.count_ones() as u64;
        }
        Ok(total)
    }

    pub fn as_span(&self, start: i64, length: i64) -> Result<Vec<bool>> {
        self.as_span_bounded(start, length, BoundsMode::Strict)
    }

    /// Like [`Self::as_span`], but `bounds` selects whether a window
    /// running past the current length is reported as `OutOfRange` or
    /// `Truncated`.
    pub fn as_span_bounded(&self, start: i64, length: i64, bounds: BoundsMode) -> Result<Vec<bool>> {
        let len = self.length();
        if length > i32::MAX as i64 {
            return Err(Error::Only32BitLengthSupported { requested: length });
        }
        if start < 0 || length < 0 {
            return Err(Error::OutOfRange { index: start, len });
        }
        if start + length > len {
            return Err(bounds.past_end(start + length, len));
        }
        let mut out = Vec::with_capacity(length as usize);
        for i in start..start + length {
            out.push(self.get(i)?);
        }
        Ok(out)
    }

    pub fn close(self) -> Result<()> {
        self.engine.close()
    }
}

impl crate::view::ReadableArray for BitArray {
    type Item = bool;
    fn len(&self) -> i64 {
        BitArray::length(self)
    }
    fn read(&self, index: i64) -> Result<bool> {
        BitArray::get(self, index)
    }
    fn read_bounded(&self, index: i64, bounds: BoundsMode) -> Result<bool> {
        BitArray::get_bounded(self, index, bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Mode;
    use tempfile::tempdir;

    fn opts() -> OpenOptions {
        OpenOptions { mode: Mode::ReadWrite, ..Default::default() }
    }

    #[test]
    fn append_and_get_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bits.dat");
        let mut bits = BitArray::open(&path, opts()).unwrap();
        for i in 0..100 {
            bits.append(i % 3 == 0).unwrap();
        }
        assert_eq!(bits.length(), 100);
        for i in 0..100 {
            assert_eq!(bits.get(i).unwrap(), i % 3 == 0);
        }
    }

    #[test]
    fn concurrent_truncation_hint_reports_truncated_instead_of_out_of_range() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bits.dat");
        let mut bits = BitArray::open(&path, opts()).unwrap();
        for i in 0..10 {
            bits.append(i % 2 == 0).unwrap();
        }
        let err = bits.get_bounded(20, BoundsMode::ExpectConcurrentTruncation).unwrap_err();
        assert!(matches!(err, Error::Truncated { index: 20, len: 10 }));
        assert!(matches!(bits.get(20), Err(Error::OutOfRange { .. })));
    }

    #[test]
    fn set_beyond_length_extends_with_zero_fill() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bits.dat");
        let mut bits = BitArray::open(&path, opts()).unwrap();
        bits.set(70, true).unwrap();
        assert_eq!(bits.length(), 71);
        for i in 0..70 {
            assert!(!bits.get(i).unwrap());
        }
        assert!(bits.get(70).unwrap());
    }

    #[test]
    fn truncate_tail_masks_trailing_bits() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bits.dat");
        let mut bits = BitArray::open(&path, opts()).unwrap();
        for _ in 0..40 {
            bits.append(true).unwrap();
        }
        bits.truncate_tail(35).unwrap();
        assert_eq!(bits.length(), 35);
        assert_eq!(bits.word_count(), 2);
        bits.set(35, true).unwrap();
        assert_eq!(bits.length(), 36);
        assert!(bits.get(35).unwrap());
        for i in 0..35 {
            assert!(bits.get(i).unwrap());
        }
    }

    #[test]
    fn truncate_head_shifts_bits_down() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bits.dat");
        let mut bits = BitArray::open(&path, opts()).unwrap();
        for i in 0..10 {
            bits.append(i % 2 == 0).unwrap();
        }
        bits.truncate_head(4, None).unwrap();
        assert_eq!(bits.length(), 4);
        for i in 0..4 {
            assert_eq!(bits.get(i).unwrap(), (6 + i) % 2 == 0);
        }
    }

    #[test]
    fn bulk_operators_and_cardinality() {
        let dir = tempdir().unwrap();
        let path_a = dir.path().join("a.dat");
        let path_b = dir.path().join("b.dat");
        let mut a = BitArray::open(&path_a, opts()).unwrap();
        let mut b = BitArray::open(&path_b, opts()).unwrap();
        for i in 0..8 {
            a.append(i % 2 == 0).unwrap();
            b.append(i % 3 == 0).unwrap();
        }
        assert_eq!(a.cardinality().unwrap(), 4);
        a.and(&b).unwrap();
        let expected: Vec<bool> = (0..8).map(|i| i % 2 == 0 && i % 3 == 0).collect();
        assert_eq!(a.as_span(0, 8).unwrap(), expected);
    }

    #[test]
    fn reopen_reader_sees_persisted_length() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bits.dat");
        {
            let mut bits = BitArray::open(&path, opts()).unwrap();
            for i in 0..50 {
                bits.append(i % 5 == 0).unwrap();
            }
            bits.close().unwrap();
        }
        let reader_opts = OpenOptions { mode: Mode::ReadOnly, ..Default::default() };
        let bits = BitArray::open(&path, reader_opts).unwrap();
        assert_eq!(bits.length(), 50);
        assert!(bits.get(0).unwrap());
        assert!(!bits.get(1).unwrap());
    }
}
