//! L4 — the narrow-integer adapter and auto-upgrade path.
//!
//! The adapter exposes an `i64`-valued array whose backing storage is the
//! narrowest integer encoding on the widening ladder that still covers every
//! value ever written. A write outside the current domain triggers an
//! offline migration: the whole file is re-encoded into a wider type under
//! a temporary path and swapped in by rename.
//!
//! The backing byte-slot types for the four narrow widths are not
//! `Element`s in the ordinary sense of being bitwise-identical to a Rust
//! primitive; `Int24Slot` and friends below give each narrow encoding its
//! own zero-sized wrapper so the generic mapped-array engine can still own
//! and grow them like any other fixed-width array.

use crate::codec::{smallest_type, IntegerDomain, NarrowWidth};
use crate::diag::note;
use crate::element::Element;
use crate::engine::{MArray, OpenOptions, MIGRATION_CHUNK};
use crate::error::{BoundsMode, Error, Result};
use crate::progress::ProgressSink;
use crate::types::DataType;
use std::path::{Path, PathBuf};

/// Widens a backing slot value to/from the adapter's `i64` value space.
pub trait NarrowSlot: Element {
    fn to_i64(self) -> i64;
    fn from_i64(v: i64) -> Self;
}

macro_rules! narrow_native_slot {
    ($t:ty) => {
        impl NarrowSlot for $t {
            fn to_i64(self) -> i64 {
                self as i64
            }
            fn from_i64(v: i64) -> Self {
                v as $t
            }
        }
    };
}

narrow_native_slot!(i8);
narrow_native_slot!(u8);
narrow_native_slot!(i16);
narrow_native_slot!(u16);
narrow_native_slot!(i32);
narrow_native_slot!(u32);
narrow_native_slot!(i64);

macro_rules! narrow_packed_slot {
    ($name:ident, $width:literal, $narrow:expr) => {
        /// Byte-slot wrapper for one of the packed narrow encodings.
        #[derive(Debug, Clone, Copy)]
        pub struct $name(i64);

        impl Element for $name {
            const WIDTH: usize = $width;
            fn encode(self, out: &mut [u8]) {
                $narrow.encode(self.0, out);
            }
            fn decode(bytes: &[u8]) -> Self {
                $name($narrow.decode(bytes))
            }
            fn zero() -> Self {
                $name(0)
            }
        }

        impl NarrowSlot for $name {
            fn to_i64(self) -> i64 {
                self.0
            }
            fn from_i64(v: i64) -> Self {
                $name(v)
            }
        }
    };
}

narrow_packed_slot!(Int24Slot, 3, NarrowWidth::Int24);
narrow_packed_slot!(UInt24Slot, 3, NarrowWidth::UInt24);
narrow_packed_slot!(Int40Slot, 5, NarrowWidth::Int40);
narrow_packed_slot!(UInt40Slot, 5, NarrowWidth::UInt40);
narrow_packed_slot!(Int48Slot, 6, NarrowWidth::Int48);
narrow_packed_slot!(UInt48Slot, 6, NarrowWidth::UInt48);
narrow_packed_slot!(Int56Slot, 7, NarrowWidth::Int56);
narrow_packed_slot!(UInt56Slot, 7, NarrowWidth::UInt56);

/// Every rung of the widening ladder the adapter can sit on, except
/// `Bit`: a binary domain is served directly by [`crate::bitarray`] rather
/// than through this adapter.
enum Backing {
    SByte(MArray<i8>),
    Byte(MArray<u8>),
    Int16(MArray<i16>),
    UInt16(MArray<u16>),
    Int24(MArray<Int24Slot>),
    UInt24(MArray<UInt24Slot>),
    Int32(MArray<i32>),
    UInt32(MArray<u32>),
    Int40(MArray<Int40Slot>),
    UInt40(MArray<UInt40Slot>),
    Int48(MArray<Int48Slot>),
    UInt48(MArray<UInt48Slot>),
    Int56(MArray<Int56Slot>),
    UInt56(MArray<UInt56Slot>),
    Int64(MArray<i64>),
}

/// Dispatches a generic `MArray<E>` operation across every [`Backing`]
/// variant. Works for `&Backing`, `&mut Backing`, and owned `Backing`
/// scrutinees via Rust's match ergonomics.
macro_rules! dispatch {
    ($scrutinee:expr, $e:ident => $body:expr) => {
        match $scrutinee {
            Backing::SByte($e) => $body,
            Backing::Byte($e) => $body,
            Backing::Int16($e) => $body,
            Backing::UInt16($e) => $body,
            Backing::Int24($e) => $body,
            Backing::UInt24($e) => $body,
            Backing::Int32($e) => $body,
            Backing::UInt32($e) => $body,
            Backing::Int40($e) => $body,
            Backing::UInt40($e) => $body,
            Backing::Int48($e) => $body,
            Backing::UInt48($e) => $body,
            Backing::Int56($e) => $body,
            Backing::UInt56($e) => $body,
            Backing::Int64($e) => $body,
        }
    };
}

fn clamp_above_bit(domain: IntegerDomain) -> IntegerDomain {
    match domain {
        IntegerDomain::Bit => IntegerDomain::Native(DataType::Byte),
        other => other,
    }
}

fn domain_for_data_type(dt: DataType) -> Result<IntegerDomain> {
    use DataType::*;
    Ok(match dt {
        SByte | Byte | Int16 | UInt16 | Int32 | UInt32 | Int64 => IntegerDomain::Native(dt),
        _ => match NarrowWidth::from_data_type(dt) {
            Some(w) => IntegerDomain::Narrow(w),
            None => {
                return Err(Error::Corruption(format!("{dt:?} is not a narrow-adapter rung")))
            }
        },
    })
}

fn detect_existing_domain(path: &Path) -> Result<Option<IntegerDomain>> {
    if !path.exists() {
        return Ok(None);
    }
    use std::io::Read;
    let mut file = std::fs::File::open(path)?;
    let mut header = [0u8; 8];
    file.read_exact(&mut header)?;
    let dt = i32::from_le_bytes(header[4..8].try_into().unwrap());
    let data_type = DataType::from_i32(dt)
        .ok_or_else(|| Error::Corruption("unrecognised data_type discriminant".into()))?;
    Ok(Some(domain_for_data_type(data_type)?))
}

impl Backing {
    fn domain(&self) -> IntegerDomain {
        match self {
            Backing::SByte(_) => IntegerDomain::Native(DataType::SByte),
            Backing::Byte(_) => IntegerDomain::Native(DataType::Byte),
            Backing::Int16(_) => IntegerDomain::Native(DataType::Int16),
            Backing::UInt16(_) => IntegerDomain::Native(DataType::UInt16),
            Backing::Int24(_) => IntegerDomain::Narrow(NarrowWidth::Int24),
            Backing::UInt24(_) => IntegerDomain::Narrow(NarrowWidth::UInt24),
            Backing::Int32(_) => IntegerDomain::Native(DataType::Int32),
            Backing::UInt32(_) => IntegerDomain::Native(DataType::UInt32),
            Backing::Int40(_) => IntegerDomain::Narrow(NarrowWidth::Int40),
            Backing::UInt40(_) => IntegerDomain::Narrow(NarrowWidth::UInt40),
            Backing::Int48(_) => IntegerDomain::Narrow(NarrowWidth::Int48),
            Backing::UInt48(_) => IntegerDomain::Narrow(NarrowWidth::UInt48),
            Backing::Int56(_) => IntegerDomain::Narrow(NarrowWidth::Int56),
            Backing::UInt56(_) => IntegerDomain::Narrow(NarrowWidth::UInt56),
            Backing::Int64(_) => IntegerDomain::Native(DataType::Int64),
        }
    }

    fn open(path: &Path, domain: IntegerDomain, opts: OpenOptions) -> Result<Self> {
        let dt = domain.data_type();
        Ok(match domain {
            IntegerDomain::Bit => unreachable!("bit rung is not a narrow-adapter backing"),
            IntegerDomain::Native(DataType::SByte) => Backing::SByte(MArray::open(path, dt, opts)?),
            IntegerDomain::Native(DataType::Byte) => Backing::Byte(MArray::open(path, dt, opts)?),
            IntegerDomain::Native(DataType::Int16) => Backing::Int16(MArray::open(path, dt, opts)?),
            IntegerDomain::Native(DataType::UInt16) => Backing::UInt16(MArray::open(path, dt, opts)?),
            IntegerDomain::Native(DataType::Int32) => Backing::Int32(MArray::open(path, dt, opts)?),
            IntegerDomain::Native(DataType::UInt32) => Backing::UInt32(MArray::open(path, dt, opts)?),
            IntegerDomain::Native(DataType::Int64) => Backing::Int64(MArray::open(path, dt, opts)?),
            IntegerDomain::Native(other) => {
                unreachable!("{other:?} is not a narrow-adapter rung")
            }
            IntegerDomain::Narrow(NarrowWidth::Int24) => Backing::Int24(MArray::open(path, dt, opts)?),
            IntegerDomain::Narrow(NarrowWidth::UInt24) => Backing::UInt24(MArray::open(path, dt, opts)?),
            IntegerDomain::Narrow(NarrowWidth::Int40) => Backing::Int40(MArray::open(path, dt, opts)?),
            IntegerDomain::Narrow(NarrowWidth::UInt40) => Backing::UInt40(MArray::open(path, dt, opts)?),
            IntegerDomain::Narrow(NarrowWidth::Int48) => Backing::Int48(MArray::open(path, dt, opts)?),
            IntegerDomain::Narrow(NarrowWidth::UInt48) => Backing::UInt48(MArray::open(path, dt, opts)?),
            IntegerDomain::Narrow(NarrowWidth::Int56) => Backing::Int56(MArray::open(path, dt, opts)?),
            IntegerDomain::Narrow(NarrowWidth::UInt56) => Backing::UInt56(MArray::open(path, dt, opts)?),
        })
    }

    fn close(self) -> Result<()> {
        match self {
            Backing::SByte(e) => e.close(),
            Backing::Byte(e) => e.close(),
            Backing::Int16(e) => e.close(),
            Backing::UInt16(e) => e.close(),
            Backing::Int24(e) => e.close(),
            Backing::UInt24(e) => e.close(),
            Backing::Int32(e) => e.close(),
            Backing::UInt32(e) => e.close(),
            Backing::Int40(e) => e.close(),
            Backing::UInt40(e) => e.close(),
            Backing::Int48(e) => e.close(),
            Backing::UInt48(e) => e.close(),
            Backing::Int56(e) => e.close(),
            Backing::UInt56(e) => e.close(),
            Backing::Int64(e) => e.close(),
        }
    }
}

fn scan_min_max<E: NarrowSlot>(e: &MArray<E>) -> (i64, i64) {
    let len = e.len();
    let mut lo = i64::MAX;
    let mut hi = i64::MIN;
    for i in 0..len {
        let v = e.read_unchecked(i).to_i64();
        lo = lo.min(v);
        hi = hi.max(v);
    }
    (lo, hi)
}

/// Snapshot returned by [`NarrowAdapter::utilisation_status`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtilisationStatus {
    pub ratio: f64,
    pub observed_min: i64,
    pub observed_max: i64,
    pub allowed_min: i64,
    pub allowed_max: i64,
    pub count: i64,
}

pub struct NarrowAdapter {
    path: PathBuf,
    opts: OpenOptions,
    backing: Option<Backing>,
    observed_min: i64,
    observed_max: i64,
    has_data: bool,
    /// Whether the file's domain lives in the signed or unsigned
    /// ladder. Fixed at open time and preserved across migrations: a column
    /// that starts signed stays signed even while every observed value so
    /// far happens to be non-negative.
    signed_family: bool,
    utilisation_threshold: Option<f64>,
    utilisation_callback: Option<Box<dyn Fn(UtilisationStatus) + Send + Sync>>,
    utilisation_fired: bool,
}

impl NarrowAdapter {
    /// Open `path`, inferring the domain from its on-disk `data_type` if it
    /// already exists, or starting from `SByte` for a brand-new file.
    pub fn open<P: AsRef<Path>>(path: P, opts: OpenOptions) -> Result<Self> {
        Self::open_with_initial_domain(path, opts, IntegerDomain::Native(DataType::SByte))
    }

    pub fn open_with_initial_domain<P: AsRef<Path>>(
        path: P,
        opts: OpenOptions,
        initial_domain_for_new_file: IntegerDomain,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let domain = match detect_existing_domain(&path)? {
            Some(d) => d,
            None => clamp_above_bit(initial_domain_for_new_file),
        };
        let backing = Backing::open(&path, domain, opts.clone())?;
        let (observed_min, observed_max, has_data) = {
            let len = dispatch!(&backing, e => e.len());
            if len == 0 {
                (0, 0, false)
            } else {
                let (lo, hi) = dispatch!(&backing, e => scan_min_max(e));
                (lo, hi, true)
            }
        };
        Ok(NarrowAdapter {
            path,
            opts,
            signed_family: domain.is_signed(),
            backing: Some(backing),
            observed_min,
            observed_max,
            has_data,
            utilisation_threshold: None,
            utilisation_callback: None,
            utilisation_fired: false,
        })
    }

    fn backing(&self) -> &Backing {
        self.backing.as_ref().expect("adapter used after close")
    }

    fn backing_mut(&mut self) -> &mut Backing {
        self.backing.as_mut().expect("adapter used after close")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn domain(&self) -> IntegerDomain {
        self.backing().domain()
    }

    pub fn len(&self) -> i64 {
        dispatch!(self.backing(), e => e.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> i64 {
        dispatch!(self.backing(), e => e.capacity())
    }

    pub fn get(&self, i: i64) -> Result<i64> {
        self.get_bounded(i, BoundsMode::Strict)
    }

    /// Like [`Self::get`], but `bounds` selects whether an index at or past
    /// the current length is reported as `OutOfRange` or `Truncated`.
    pub fn get_bounded(&self, i: i64, bounds: BoundsMode) -> Result<i64> {
        dispatch!(self.backing(), e => Ok(e.read_bounded(i, bounds)?.to_i64()))
    }

    pub fn as_span(&self, start: i64, length: i64) -> Result<Vec<i64>> {
        self.as_span_bounded(start, length, BoundsMode::Strict)
    }

    /// Like [`Self::as_span`], but `bounds` selects whether a window
    /// running past the current length is reported as `OutOfRange` or
    /// `Truncated`.
    pub fn as_span_bounded(&self, start: i64, length: i64, bounds: BoundsMode) -> Result<Vec<i64>> {
        dispatch!(self.backing(), e => {
            Ok(e.as_span_bounded(start, length, bounds)?.into_iter().map(NarrowSlot::to_i64).collect())
        })
    }

    fn ensure_domain_for(&mut self, v: i64) -> Result<()> {
        if self.domain().contains_value(v) {
            return Ok(());
        }
        let new_min = if self.has_data { self.observed_min.min(v) } else { v };
        let new_max = if self.has_data { self.observed_max.max(v) } else { v };
        let ladder_min = if self.signed_family { new_min.min(-1) } else { new_min.max(0) };
        let target = clamp_above_bit(smallest_type(ladder_min, new_max));
        self.migrate_to(target)?;
        if !self.domain().contains_value(v) {
            return Err(Error::DataTypeOverflow {
                value: v,
                min: self.domain().min_value(),
                max: self.domain().max_value(),
            });
        }
        Ok(())
    }

    /// offline migration: re-encode the whole file into `target`
    /// under a temporary path, then swap it in by rename.
    fn migrate_to(&mut self, target: IntegerDomain) -> Result<()> {
        let mut tmp_os = self.path.as_os_str().to_owned();
        tmp_os.push(".upgrading");
        let tmp_path = PathBuf::from(tmp_os);
        let mut tmp_lock_os = tmp_path.as_os_str().to_owned();
        tmp_lock_os.push(".lock");
        let tmp_lock_path = PathBuf::from(tmp_lock_os);
        let _ = std::fs::remove_file(&tmp_path);
        let _ = std::fs::remove_file(&tmp_lock_path);

        note!(
            1,
            "narrow adapter {}: migrating {:?} -> {:?}",
            self.path.display(),
            self.domain(),
            target
        );

        let migrate_result = (|| -> Result<()> {
            let source_capacity = dispatch!(self.backing(), e => e.capacity());
            let source_count = self.len();
            let mut tmp_opts = self.opts.clone();
            tmp_opts.initial_capacity_items = source_capacity.max(source_count);
            let mut tmp_backing = Backing::open(&tmp_path, target, tmp_opts)?;

            let mut offset = 0i64;
            let total = source_count.max(1) as u64;
            while offset < source_count {
                let take = (source_count - offset).min(MIGRATION_CHUNK as i64);
                let chunk: Vec<i64> = dispatch!(self.backing(), e => {
                    e.as_span(offset, take).map(|v| v.into_iter().map(NarrowSlot::to_i64).collect::<Vec<i64>>())
                })?;
                dispatch!(&mut tmp_backing, e => {
                    e.append_range(chunk.into_iter().map(NarrowSlot::from_i64))
                })?;
                offset += take;
                note!(2, "narrow migration {}: {}/{}", self.path.display(), offset, total);
            }
            tmp_backing.close()
        })();

        if let Err(e) = migrate_result {
            let _ = std::fs::remove_file(&tmp_path);
            let _ = std::fs::remove_file(&tmp_lock_path);
            return Err(e);
        }

        let old_backing = self.backing.take().expect("adapter used after close");
        old_backing.close()?;
        std::fs::remove_file(&self.path)?;
        std::fs::rename(&tmp_path, &self.path)?;
        self.backing = Some(Backing::open(&self.path, target, self.opts.clone())?);
        self.utilisation_fired = false;
        Ok(())
    }

    pub fn append(&mut self, v: i64) -> Result<()> {
        self.ensure_domain_for(v)?;
        dispatch!(self.backing_mut(), e => e.append(NarrowSlot::from_i64(v)))?;
        self.record_observed(v);
        Ok(())
    }

    pub fn append_range<I: IntoIterator<Item = i64>>(&mut self, values: I) -> Result<()> {
        for v in values {
            self.append(v)?;
        }
        Ok(())
    }

    pub fn set_last(&mut self, v: i64) -> Result<()> {
        if self.is_empty() {
            return Err(Error::OutOfRange { index: -1, len: self.len() });
        }
        self.ensure_domain_for(v)?;
        dispatch!(self.backing_mut(), e => e.set_last(NarrowSlot::from_i64(v)))?;
        self.record_observed(v);
        Ok(())
    }

    pub fn truncate_tail(&mut self, n: i64) -> Result<()> {
        dispatch!(self.backing_mut(), e => e.truncate_tail(n))
    }

    pub fn truncate_head(&mut self, n: i64, progress: Option<&dyn ProgressSink>) -> Result<()> {
        dispatch!(self.backing_mut(), e => e.truncate_head(n, progress))
    }

    pub fn trim_excess(&mut self) -> Result<()> {
        dispatch!(self.backing_mut(), e => e.trim_excess())
    }

    pub fn disallow_remap(&mut self) {
        dispatch!(self.backing_mut(), e => e.disallow_remap())
    }

    fn record_observed(&mut self, v: i64) {
        if !self.has_data {
            self.observed_min = v;
            self.observed_max = v;
            self.has_data = true;
        } else {
            self.observed_min = self.observed_min.min(v);
            self.observed_max = self.observed_max.max(v);
        }
        self.check_utilisation();
    }

    /// Configure the utilisation-warning callback. `threshold`
    /// must be in `(0, 1]`. The callback fires at most once per migration.
    pub fn configure_utilisation_warning<F>(&mut self, threshold: f64, callback: F)
    where
        F: Fn(UtilisationStatus) + Send + Sync + 'static,
    {
        assert!(threshold > 0.0 && threshold <= 1.0, "utilisation threshold must be in (0, 1]");
        self.utilisation_threshold = Some(threshold);
        self.utilisation_callback = Some(Box::new(callback));
        self.utilisation_fired = false;
    }

    pub fn utilisation_status(&self) -> UtilisationStatus {
        let domain = self.domain();
        let allowed_min = domain.min_value();
        let allowed_max = domain.max_value();
        let ratio_min = if allowed_min != 0 {
            (self.observed_min as f64 / allowed_min as f64).abs()
        } else {
            0.0
        };
        let ratio_max = if allowed_max != 0 {
            (self.observed_max as f64 / allowed_max as f64).abs()
        } else {
            0.0
        };
        UtilisationStatus {
            ratio: ratio_min.max(ratio_max),
            observed_min: self.observed_min,
            observed_max: self.observed_max,
            allowed_min,
            allowed_max,
            count: self.len(),
        }
    }

    fn check_utilisation(&mut self) {
        let Some(threshold) = self.utilisation_threshold else { return };
        if self.utilisation_fired {
            return;
        }
        let status = self.utilisation_status();
        if status.ratio >= threshold {
            self.utilisation_fired = true;
            if let Some(cb) = &self.utilisation_callback {
                cb(status);
            }
        }
    }

    pub fn close(mut self) -> Result<()> {
        self.backing.take().expect("adapter used after close").close()
    }
}

impl crate::view::ReadableArray for NarrowAdapter {
    type Item = i64;
    fn len(&self) -> i64 {
        NarrowAdapter::len(self)
    }
    fn read(&self, index: i64) -> Result<i64> {
        NarrowAdapter::get(self, index)
    }
    fn read_bounded(&self, index: i64, bounds: BoundsMode) -> Result<i64> {
        NarrowAdapter::get_bounded(self, index, bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Mode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn opts() -> OpenOptions {
        OpenOptions { mode: Mode::ReadWrite, ..Default::default() }
    }

    #[test]
    fn starts_narrow_and_stays_there_within_domain() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("narrow.dat");
        let mut adapter = NarrowAdapter::open(&path, opts()).unwrap();
        assert_eq!(adapter.domain(), IntegerDomain::Native(DataType::SByte));
        for v in [-10, 0, 50, 127, -128] {
            adapter.append(v).unwrap();
        }
        assert_eq!(adapter.domain(), IntegerDomain::Native(DataType::SByte));
        for (i, v) in [-10, 0, 50, 127, -128].into_iter().enumerate() {
            assert_eq!(adapter.get(i as i64).unwrap(), v);
        }
    }

    #[test]
    fn concurrent_truncation_hint_reports_truncated_instead_of_out_of_range() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("narrow.dat");
        let mut adapter = NarrowAdapter::open(&path, opts()).unwrap();
        adapter.append_range([1, 2, 3]).unwrap();
        let err = adapter.get_bounded(5, crate::error::BoundsMode::ExpectConcurrentTruncation).unwrap_err();
        assert!(matches!(err, Error::Truncated { index: 5, len: 3 }));
        assert!(matches!(adapter.get(5), Err(Error::OutOfRange { .. })));
    }

    #[test]
    fn overflow_triggers_migration_and_preserves_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("narrow.dat");
        let mut adapter = NarrowAdapter::open(&path, opts()).unwrap();
        for v in [1, 2, 3, 127] {
            adapter.append(v).unwrap();
        }
        assert_eq!(adapter.domain(), IntegerDomain::Native(DataType::SByte));
        adapter.append(1_000_000).unwrap();
        assert_eq!(adapter.domain(), IntegerDomain::Narrow(NarrowWidth::Int24));
        assert_eq!(adapter.len(), 5);
        for (i, v) in [1i64, 2, 3, 127, 1_000_000].into_iter().enumerate() {
            assert_eq!(adapter.get(i as i64).unwrap(), v);
        }
        let mut tmp = path.clone().into_os_string();
        tmp.push(".upgrading");
        assert!(!PathBuf::from(tmp).exists());
    }

    #[test]
    fn migration_widens_into_narrow_rungs_too() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("narrow.dat");
        let mut adapter = NarrowAdapter::open(&path, opts()).unwrap();
        adapter.append(100).unwrap();
        adapter.append(1 << 20).unwrap();
        assert_eq!(adapter.domain(), IntegerDomain::Narrow(NarrowWidth::Int24));
        assert_eq!(adapter.get(0).unwrap(), 100);
        assert_eq!(adapter.get(1).unwrap(), 1 << 20);
    }

    #[test]
    fn utilisation_warning_fires_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("narrow.dat");
        let mut adapter = NarrowAdapter::open(&path, opts()).unwrap();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired2 = fired.clone();
        adapter.configure_utilisation_warning(0.5, move |_status| {
            fired2.fetch_add(1, Ordering::SeqCst);
        });
        adapter.append(1).unwrap();
        adapter.append(100).unwrap();
        adapter.append(120).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reopen_infers_domain_from_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("narrow.dat");
        {
            let mut adapter = NarrowAdapter::open(&path, opts()).unwrap();
            adapter.append(1_000_000).unwrap();
            adapter.close().unwrap();
        }
        let reopened = NarrowAdapter::open(&path, opts()).unwrap();
        assert_eq!(reopened.domain(), IntegerDomain::Narrow(NarrowWidth::Int24));
        assert_eq!(reopened.get(0).unwrap(), 1_000_000);
    }
}
