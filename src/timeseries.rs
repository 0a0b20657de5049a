//! L3b — the ordered time-series overlay.
//!
//! Two precisions share one ordering model and one set of `O(log n)` search
//! primitives: tick precision stores `DateTime.Ticks` in `MArray<i64>`
//! (`data_type = DateTime`); second precision stores Unix-epoch seconds in
//! `MArray<i32>` (`data_type = UnixSeconds`, `INT_MIN` standing in for
//! `DateTime::MinValue`). Zero is reserved: writing it is rejected outright,
//! and finding one on read is treated as corruption.

use crate::diag::note;
use crate::element::Element;
use crate::engine::{MArray, OpenOptions};
use crate::error::{BoundsMode, Error, Result};
use crate::types::DataType;
use std::path::Path;

/// Widens a timestamp element to/from the `i64` value space the overlay's
/// public API works in.
pub trait TimestampElement: Element {
    fn to_i64(self) -> i64;
    fn from_i64(v: i64) -> Self;
}

impl TimestampElement for i64 {
    fn to_i64(self) -> i64 {
        self
    }
    fn from_i64(v: i64) -> Self {
        v
    }
}

impl TimestampElement for i32 {
    fn to_i64(self) -> i64 {
        self as i64
    }
    fn from_i64(v: i64) -> Self {
        v as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingMode {
    None,
    Ascending,
    AscendingOrEqual,
}

/// How many elements a backward corruption scan inspects per chunk.
const DIAGNOSTIC_SCAN_CHUNK: i64 = 1000;

pub struct TimeSeries<T: TimestampElement> {
    engine: MArray<T>,
    ordering: OrderingMode,
}

impl TimeSeries<i64> {
    /// Open a tick-precision time series (`DateTime.Ticks`).
    pub fn open_ticks<P: AsRef<Path>>(
        path: P,
        opts: OpenOptions,
        ordering: OrderingMode,
    ) -> Result<Self> {
        let engine = MArray::open(path, DataType::DateTime, opts)?;
        Ok(TimeSeries { engine, ordering })
    }
}

impl TimeSeries<i32> {
    /// Open a second-precision time series (Unix epoch seconds).
    pub fn open_seconds<P: AsRef<Path>>(
        path: P,
        opts: OpenOptions,
        ordering: OrderingMode,
    ) -> Result<Self> {
        let engine = MArray::open(path, DataType::UnixSeconds, opts)?;
        Ok(TimeSeries { engine, ordering })
    }
}

impl<T: TimestampElement> TimeSeries<T> {
    pub fn len(&self) -> i64 {
        self.engine.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> i64 {
        self.engine.capacity()
    }

    pub fn ordering(&self) -> OrderingMode {
        self.ordering
    }

    fn scan_backward_for_diagnostic(&self, from: i64) -> Option<(i64, i64)> {
        let mut idx = from - 1;
        while idx >= 0 {
            let chunk_start = (idx - (DIAGNOSTIC_SCAN_CHUNK - 1)).max(0);
            for j in (chunk_start..=idx).rev() {
                let raw = self.engine.read(j).ok()?.to_i64();
                if raw != 0 {
                    return Some((j, raw));
                }
            }
            idx = chunk_start - 1;
        }
        None
    }

    fn read_checked(&self, i: i64) -> Result<i64> {
        let raw = self.engine.read(i)?.to_i64();
        if raw == 0 {
            let last_non_zero = self.scan_backward_for_diagnostic(i);
            note!(1, "zero timestamp at index {i}, last non-zero {last_non_zero:?}");
            let detail = match last_non_zero {
                Some((j, v)) => {
                    format!("zero timestamp at index {i}; most recent non-zero entry is {v} at index {j}")
                }
                None => format!("zero timestamp at index {i}"),
            };
            return Err(Error::Corruption(detail));
        }
        Ok(raw)
    }

    pub fn get(&self, i: i64) -> Result<i64> {
        self.get_bounded(i, BoundsMode::Strict)
    }

    /// Like [`Self::get`], but `bounds` selects whether an index at or past
    /// the current length is reported as `OutOfRange` or `Truncated`.
    pub fn get_bounded(&self, i: i64, bounds: BoundsMode) -> Result<i64> {
        let len = self.len();
        if i < 0 {
            return Err(Error::OutOfRange { index: i, len });
        }
        if i >= len {
            return Err(bounds.past_end(i, len));
        }
        self.read_checked(i)
    }

    pub fn as_span(&self, start: i64, length: i64) -> Result<Vec<i64>> {
        self.as_span_bounded(start, length, BoundsMode::Strict)
    }

    /// Like [`Self::as_span`], but `bounds` selects whether a window
    /// running past the current length is reported as `OutOfRange` or
    /// `Truncated`.
    pub fn as_span_bounded(&self, start: i64, length: i64, bounds: BoundsMode) -> Result<Vec<i64>> {
        Ok(self
            .engine
            .as_span_bounded(start, length, bounds)?
            .into_iter()
            .map(TimestampElement::to_i64)
            .collect())
    }

    fn order_ok(&self, previous: i64, attempted: i64) -> bool {
        match self.ordering {
            OrderingMode::None => true,
            OrderingMode::Ascending => attempted > previous,
            OrderingMode::AscendingOrEqual => attempted >= previous,
        }
    }

    fn check_append(&self, v: i64) -> Result<()> {
        let previous = if !self.is_empty() { Some(self.read_checked(self.len() - 1)?) } else { None };
        if v == 0 {
            return Err(Error::OutOfOrder { previous: previous.unwrap_or(0), attempted: 0 });
        }
        if self.ordering == OrderingMode::None {
            return Ok(());
        }
        if let Some(previous) = previous {
            if !self.order_ok(previous, v) {
                return Err(Error::OutOfOrder { previous, attempted: v });
            }
        }
        Ok(())
    }

    pub fn append(&mut self, v: i64) -> Result<()> {
        self.engine.require_writer()?;
        self.check_append(v)?;
        self.engine.append(T::from_i64(v))
    }

    pub fn append_range<I: IntoIterator<Item = i64>>(&mut self, values: I) -> Result<()> {
        self.engine.require_writer()?;
        let mut previous = if !self.is_empty() { Some(self.read_checked(self.len() - 1)?) } else { None };
        let mut encoded = Vec::new();
        for v in values.into_iter() {
            if v == 0 {
                return Err(Error::OutOfOrder { previous: previous.unwrap_or(0), attempted: 0 });
            }
            if let Some(p) = previous {
                if self.ordering != OrderingMode::None && !self.order_ok(p, v) {
                    return Err(Error::OutOfOrder { previous: p, attempted: v });
                }
            }
            previous = Some(v);
            encoded.push(T::from_i64(v));
        }
        self.engine.append_range(encoded)
    }

    pub fn set_last(&mut self, v: i64) -> Result<()> {
        self.engine.require_writer()?;
        let len = self.len();
        if len < 1 {
            return Err(Error::OutOfRange { index: -1, len });
        }
        let previous_for_zero = if len >= 2 { Some(self.read_checked(len - 2)?) } else { None };
        if v == 0 {
            return Err(Error::OutOfOrder { previous: previous_for_zero.unwrap_or(0), attempted: 0 });
        }
        if self.ordering != OrderingMode::None {
            if let Some(previous) = previous_for_zero {
                if !self.order_ok(previous, v) {
                    return Err(Error::OutOfOrder { previous, attempted: v });
                }
            }
        }
        self.engine.set_last(T::from_i64(v))
    }

    pub fn truncate_tail(&mut self, n: i64) -> Result<()> {
        self.engine.truncate_tail(n)
    }

    pub fn truncate_head(&mut self, n: i64, progress: Option<&dyn crate::progress::ProgressSink>) -> Result<()> {
        self.engine.truncate_head(n, progress)
    }

    pub fn trim_excess(&mut self) -> Result<()> {
        self.engine.trim_excess()
    }

    pub fn disallow_remap(&mut self) {
        self.engine.disallow_remap()
    }

    fn validate_range(&self, start: i64, length: i64) -> Result<()> {
        let len = self.len();
        if start < 0 || length < 0 || start + length > len {
            return Err(Error::OutOfRange { index: start + length, len });
        }
        Ok(())
    }

    /// Returns the index of `v` if present, else the bitwise complement of
    /// the insertion point.
    pub fn binary_search_range(&self, v: i64, start: i64, length: i64) -> Result<i64> {
        self.validate_range(start, length)?;
        let mut lo = start;
        let mut hi = start + length;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let mv = self.get(mid)?;
            if mv == v {
                return Ok(mid);
            } else if mv < v {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Ok(!lo)
    }

    pub fn binary_search(&self, v: i64) -> Result<i64> {
        self.binary_search_range(v, 0, self.len())
    }

    /// Least index whose stored value is not less than `v`.
    pub fn lower_bound_range(&self, v: i64, start: i64, length: i64) -> Result<i64> {
        self.validate_range(start, length)?;
        let mut lo = start;
        let mut hi = start + length;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.get(mid)? < v {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Ok(lo)
    }

    pub fn lower_bound(&self, v: i64) -> Result<i64> {
        self.lower_bound_range(v, 0, self.len())
    }

    /// Least index whose stored value is strictly greater than `v`.
    pub fn upper_bound_range(&self, v: i64, start: i64, length: i64) -> Result<i64> {
        self.validate_range(start, length)?;
        let mut lo = start;
        let mut hi = start + length;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.get(mid)? <= v {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Ok(lo)
    }

    pub fn upper_bound(&self, v: i64) -> Result<i64> {
        self.upper_bound_range(v, 0, self.len())
    }

    /// A found index, or `-1` if `v` is strictly below the first or
    /// strictly above the last element, else the index of the first
    /// element greater than `v`.
    pub fn get_index_range(&self, v: i64, start: i64, length: i64) -> Result<i64> {
        self.validate_range(start, length)?;
        if length == 0 {
            return Ok(-1);
        }
        let first = self.get(start)?;
        let last = self.get(start + length - 1)?;
        if v < first || v > last {
            return Ok(-1);
        }
        let found = self.binary_search_range(v, start, length)?;
        if found >= 0 {
            return Ok(found);
        }
        self.upper_bound_range(v, start, length)
    }

    pub fn get_index(&self, v: i64) -> Result<i64> {
        self.get_index_range(v, 0, self.len())
    }

    pub fn close(self) -> Result<()> {
        self.engine.close()
    }
}

impl<T: TimestampElement> crate::view::ReadableArray for TimeSeries<T> {
    type Item = i64;
    fn len(&self) -> i64 {
        TimeSeries::len(self)
    }
    fn read(&self, index: i64) -> Result<i64> {
        TimeSeries::get(self, index)
    }
    fn read_bounded(&self, index: i64, bounds: BoundsMode) -> Result<i64> {
        TimeSeries::get_bounded(self, index, bounds)
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
    fn ascending_append_enforced() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ticks.dat");
        let mut ts = TimeSeries::<i64>::open_ticks(&path, opts(), OrderingMode::Ascending).unwrap();
        ts.append(100).unwrap();
        ts.append(200).unwrap();
        let err = ts.append(200).unwrap_err();
        assert!(matches!(err, Error::OutOfOrder { previous: 200, attempted: 200 }));
    }

    #[test]
    fn ascending_or_equal_allows_ties() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ticks.dat");
        let mut ts =
            TimeSeries::<i64>::open_ticks(&path, opts(), OrderingMode::AscendingOrEqual).unwrap();
        ts.append(100).unwrap();
        ts.append(100).unwrap();
        ts.append(150).unwrap();
        assert_eq!(ts.len(), 3);
    }

    #[test]
    fn concurrent_truncation_hint_reports_truncated_instead_of_out_of_range() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ticks.dat");
        let mut ts = TimeSeries::<i64>::open_ticks(&path, opts(), OrderingMode::Ascending).unwrap();
        ts.append_range([100, 200, 300]).unwrap();
        let err = ts.get_bounded(10, BoundsMode::ExpectConcurrentTruncation).unwrap_err();
        assert!(matches!(err, Error::Truncated { index: 10, len: 3 }));
        assert!(matches!(ts.get(10), Err(Error::OutOfRange { .. })));
    }

    #[test]
    fn zero_timestamp_rejected_on_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ticks.dat");
        let mut ts = TimeSeries::<i64>::open_ticks(&path, opts(), OrderingMode::None).unwrap();
        let err = ts.append(0).unwrap_err();
        assert!(matches!(err, Error::OutOfOrder { attempted: 0, .. }));
    }

    #[test]
    fn search_primitives_on_second_precision() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("secs.dat");
        let mut ts =
            TimeSeries::<i32>::open_seconds(&path, opts(), OrderingMode::Ascending).unwrap();
        ts.append_range([10, 20, 30, 40, 50]).unwrap();
        assert_eq!(ts.binary_search(30).unwrap(), 2);
        assert_eq!(ts.binary_search(25).unwrap(), !2);
        assert_eq!(ts.lower_bound(25).unwrap(), 2);
        assert_eq!(ts.upper_bound(30).unwrap(), 3);
        assert_eq!(ts.get_index(25).unwrap(), 2);
        assert_eq!(ts.get_index(5).unwrap(), -1);
        assert_eq!(ts.get_index(55).unwrap(), -1);
        assert_eq!(ts.get_index(30).unwrap(), 2);
    }

    #[test]
    fn append_range_validates_whole_batch_before_committing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ticks.dat");
        let mut ts = TimeSeries::<i64>::open_ticks(&path, opts(), OrderingMode::Ascending).unwrap();
        ts.append(10).unwrap();
        let err = ts.append_range([20, 30, 25, 40]).unwrap_err();
        assert!(matches!(err, Error::OutOfOrder { .. }));
        assert_eq!(ts.len(), 1);
    }
}
