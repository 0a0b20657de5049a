//! L2 — the mapped array engine.
//!
//! `MArray<E>` owns the file, the mapping, the header, and the capacity for
//! a single data file whose elements are all the fixed-width type `E`.
//! Narrow (odd-byte) encodings are handled separately by [`crate::narrow`],
//! which owns its own byte-slot engine rather than implementing `Element`.

use crate::diag::note;
use crate::element::Element;
use crate::error::{BoundsMode, Error, Result};
use crate::lock::{self, LockToken};
use crate::progress::ProgressSink;
use crate::types::DataType;
use memmap2::{Mmap, MmapMut};
use std::fs::OpenOptions as StdOpenOptions;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Every data file is page-aligned; writes into the rounded slack area are
/// legal and never observed.
pub const PAGE_SIZE: usize = 4096;
/// Doubling cap for the grow-capacity policy: double up to this
/// many elements, then add this many per subsequent grow.
pub const GROW_DOUBLE_CAP: i64 = 1 << 30;
/// Chunk size `trim_excess`/migration/truncate_head use for progress
/// reporting and bounded scratch buffers.
pub const MIGRATION_CHUNK: usize = 4096;
/// `trim_excess` shrinks capacity once `count < TRIM_EXCESS_RATIO * capacity`.
pub const TRIM_EXCESS_RATIO: f64 = 0.9;

const BASE_HEADER_LEN: usize = 16;

fn round_up_page(bytes: usize) -> usize {
    bytes.div_ceil(PAGE_SIZE) * PAGE_SIZE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    ReadOnly,
    ReadWrite,
}

/// Parameters for [`MArray::open`]. `Default` matches the behaviour of an
/// engine that does not care about initial sizing or lock tuning.
#[derive(Debug, Clone)]
pub struct OpenOptions {
    pub mode: Mode,
    pub initial_capacity_items: i64,
    pub extra_header_bytes: usize,
    pub lock_timeout: Duration,
    pub lock_poll_interval: Duration,
}

impl Default for OpenOptions {
    fn default() -> Self {
        OpenOptions {
            mode: Mode::ReadWrite,
            initial_capacity_items: 0,
            extra_header_bytes: 0,
            lock_timeout: Duration::from_secs(30),
            lock_poll_interval: Duration::from_millis(50),
        }
    }
}

enum Mapping {
    Reader(Mmap),
    Writer(MmapMut),
}

impl Mapping {
    fn as_slice(&self) -> &[u8] {
        match self {
            Mapping::Reader(m) => &m[..],
            Mapping::Writer(m) => &m[..],
        }
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            Mapping::Writer(m) => &mut m[..],
            Mapping::Reader(_) => unreachable!("mutating a read-only mapping"),
        }
    }

    fn len(&self) -> usize {
        self.as_slice().len()
    }
}

/// A single data file mapped as a typed, append-oriented array of `E`.
pub struct MArray<E: Element> {
    path: PathBuf,
    file: std::fs::File,
    mapping: Option<Mapping>,
    mode: Mode,
    header_len: usize,
    data_type: DataType,
    capacity: i64,
    lock: Option<LockToken>,
    disallow_remap: bool,
    disposed: bool,
    _marker: PhantomData<E>,
}

impl<E: Element> MArray<E> {
    pub fn open<P: AsRef<Path>>(path: P, data_type: DataType, opts: OpenOptions) -> Result<Self> {
        assert_eq!(
            opts.extra_header_bytes % 8,
            0,
            "extra_header_bytes must be a multiple of 8"
        );
        assert_eq!(
            data_type.element_width(),
            E::WIDTH,
            "data_type element width does not match the requested Element"
        );
        let header_len = BASE_HEADER_LEN + opts.extra_header_bytes;
        let path = path.as_ref().to_path_buf();
        match opts.mode {
            Mode::ReadOnly => Self::open_reader(path, data_type, header_len),
            Mode::ReadWrite => Self::open_writer(path, data_type, header_len, opts),
        }
    }

    fn open_reader(path: PathBuf, data_type: DataType, header_len: usize) -> Result<Self> {
        let file = std::fs::File::open(&path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        let (capacity, count) = Self::validate_header(&mmap, header_len, data_type)?;
        let _ = count;
        Ok(MArray {
            path,
            file,
            mapping: Some(Mapping::Reader(mmap)),
            mode: Mode::ReadOnly,
            header_len,
            data_type,
            capacity,
            lock: None,
            disallow_remap: false,
            disposed: false,
            _marker: PhantomData,
        })
    }

    fn open_writer(path: PathBuf, data_type: DataType, header_len: usize, opts: OpenOptions) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let existed_before = path.exists();
        let lock = lock::acquire(&path, opts.lock_timeout, opts.lock_poll_interval, false)?;

        match Self::open_writer_locked(&path, data_type, header_len, &opts) {
            Ok(mut engine) => {
                engine.lock = Some(lock);
                Ok(engine)
            }
            Err(e) => {
                let _ = lock::release(lock);
                if !existed_before {
                    let _ = std::fs::remove_file(&path);
                }
                Err(e)
            }
        }
    }

    fn open_writer_locked(
        path: &Path,
        data_type: DataType,
        header_len: usize,
        opts: &OpenOptions,
    ) -> Result<Self> {
        let is_new = !path.exists();
        let file = StdOpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let existing_len = file.metadata()?.len() as usize;
        let min_items = opts.initial_capacity_items.max(0) as usize;
        let min_bytes = header_len + min_items * E::WIDTH;
        let file_len = if is_new {
            let len = round_up_page(min_bytes.max(1));
            file.set_len(len as u64)?;
            len
        } else {
            existing_len
        };
        if file_len < header_len {
            return Err(Error::Corruption(format!(
                "file of {file_len} bytes shorter than header of {header_len} bytes"
            )));
        }
        let mut mmap = unsafe { MmapMut::map_mut(&file)? };
        if is_new {
            mmap[0..4].copy_from_slice(&0i32.to_le_bytes());
            mmap[4..8].copy_from_slice(&(data_type as i32).to_le_bytes());
            mmap[8..16].copy_from_slice(&0i64.to_le_bytes());
            mmap.flush()?;
        }
        let (capacity, _count) = Self::validate_header(&mmap, header_len, data_type)?;
        Ok(MArray {
            path: path.to_path_buf(),
            file,
            mapping: Some(Mapping::Writer(mmap)),
            mode: Mode::ReadWrite,
            header_len,
            data_type,
            capacity,
            lock: None,
            disallow_remap: false,
            disposed: false,
            _marker: PhantomData,
        })
    }

    fn validate_header(bytes: &[u8], header_len: usize, data_type: DataType) -> Result<(i64, i64)> {
        if bytes.len() < header_len {
            return Err(Error::Corruption(format!(
                "file of {} bytes shorter than header of {header_len} bytes",
                bytes.len()
            )));
        }
        let stored_type = DataType::from_i32(i32::from_le_bytes(bytes[4..8].try_into().unwrap()))
            .ok_or_else(|| Error::Corruption("unrecognised data_type discriminant".into()))?;
        if stored_type != data_type {
            return Err(Error::Corruption(format!(
                "data_type mismatch: file has {stored_type:?}, opened as {data_type:?}"
            )));
        }
        let count = i64::from_le_bytes(bytes[8..16].try_into().unwrap());
        let capacity = ((bytes.len() - header_len) / E::WIDTH) as i64;
        if capacity < count {
            return Err(Error::Corruption(format!(
                "capacity {capacity} below count {count}"
            )));
        }
        Ok((capacity, count))
    }

    fn map(&self) -> &Mapping {
        self.mapping.as_ref().expect("mapping missing outside remap")
    }

    fn map_mut(&mut self) -> &mut Mapping {
        self.mapping.as_mut().expect("mapping missing outside remap")
    }

    fn count_ptr(&self) -> *const i64 {
        unsafe { self.map().as_slice().as_ptr().add(8) as *const i64 }
    }

    fn load_count_raw(&self) -> i64 {
        unsafe { (*AtomicI64::from_ptr(self.count_ptr() as *mut i64)).load(Ordering::Acquire) }
    }

    fn store_count_raw(&mut self, value: i64) {
        let ptr = self.count_ptr() as *mut i64;
        unsafe { (*AtomicI64::from_ptr(ptr)).store(value, Ordering::Release) };
    }

    pub(crate) fn require_writer(&self) -> Result<()> {
        if self.disposed {
            return Err(Error::Disposed);
        }
        if self.mode != Mode::ReadWrite {
            return Err(Error::ReadOnly);
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn len(&self) -> i64 {
        if self.disposed {
            0
        } else {
            self.load_count_raw()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> i64 {
        self.capacity
    }

    fn slot_offset(&self, index: i64) -> usize {
        self.header_len + index as usize * E::WIDTH
    }

    pub fn read(&self, index: i64) -> Result<E> {
        self.read_bounded(index, BoundsMode::Strict)
    }

    /// Like [`Self::read`], but `bounds` selects whether an index at or past
    /// the current length is reported as `OutOfRange` or, when the caller
    /// expects a concurrent writer may have truncated since it last sampled
    /// `len()`, as `Truncated`.
    pub fn read_bounded(&self, index: i64, bounds: BoundsMode) -> Result<E> {
        if self.disposed {
            return Err(Error::Disposed);
        }
        let len = self.len();
        if index < 0 {
            return Err(Error::OutOfRange { index, len });
        }
        if index >= len {
            return Err(bounds.past_end(index, len));
        }
        Ok(self.read_unchecked(index))
    }

    /// Read element `index` without a bounds check. Caller must ensure
    /// `0 <= index < len()`.
    pub fn read_unchecked(&self, index: i64) -> E {
        let off = self.slot_offset(index);
        E::decode(&self.map().as_slice()[off..off + E::WIDTH])
    }

    pub fn as_span(&self, start: i64, length: i64) -> Result<Vec<E>> {
        self.as_span_bounded(start, length, BoundsMode::Strict)
    }

    /// Like [`Self::as_span`], but `bounds` selects whether a window
    /// running past the current length is reported as `OutOfRange` or
    /// `Truncated`.
    pub fn as_span_bounded(&self, start: i64, length: i64, bounds: BoundsMode) -> Result<Vec<E>> {
        if self.disposed {
            return Err(Error::Disposed);
        }
        if length > (i32::MAX as i64) {
            return Err(Error::Only32BitLengthSupported { requested: length });
        }
        let len = self.len();
        if start < 0 || length < 0 {
            return Err(Error::OutOfRange { index: start, len });
        }
        if start + length > len {
            return Err(bounds.past_end(start + length, len));
        }
        let mut out = Vec::with_capacity(length as usize);
        for i in start..start + length {
            out.push(self.read_unchecked(i));
        }
        Ok(out)
    }

    fn reserve(&mut self, min_capacity_items: i64) -> Result<()> {
        if min_capacity_items <= self.capacity {
            return Ok(());
        }
        if self.disallow_remap {
            return Err(Error::ResetDisallowed);
        }
        let new_capacity = min_capacity_items.max(self.capacity + self.capacity.min(GROW_DOUBLE_CAP));
        let required_bytes = self.header_len + new_capacity as usize * E::WIDTH;
        let new_file_len = round_up_page(required_bytes);
        note!(
            2,
            "engine {}: growing capacity {} -> {} ({} -> {} bytes)",
            self.path.display(),
            self.capacity,
            new_capacity,
            self.map().len(),
            new_file_len
        );
        self.remap_to(new_file_len)?;
        self.capacity = ((new_file_len - self.header_len) / E::WIDTH) as i64;
        Ok(())
    }

    fn shrink_to(&mut self, min_capacity_items: i64) -> Result<()> {
        if self.disallow_remap {
            return Err(Error::ResetDisallowed);
        }
        let required_bytes = self.header_len + min_capacity_items.max(0) as usize * E::WIDTH;
        let new_file_len = round_up_page(required_bytes).max(PAGE_SIZE);
        if new_file_len >= self.map().len() {
            return Ok(());
        }
        note!(
            2,
            "engine {}: shrinking capacity {} -> {} ({} -> {} bytes)",
            self.path.display(),
            self.capacity,
            min_capacity_items,
            self.map().len(),
            new_file_len
        );
        self.remap_to(new_file_len)?;
        self.capacity = ((new_file_len - self.header_len) / E::WIDTH) as i64;
        Ok(())
    }

    fn remap_to(&mut self, new_file_len: usize) -> Result<()> {
        // Release order: drop the view/mapping before resizing the file,
        // then remap.
        let old = self.mapping.take();
        drop(old);
        let result = (|| -> Result<MmapMut> {
            self.file.set_len(new_file_len as u64)?;
            let mmap = unsafe { MmapMut::map_mut(&self.file)? };
            Ok(mmap)
        })();
        match result {
            Ok(mmap) => {
                self.mapping = Some(Mapping::Writer(mmap));
                Ok(())
            }
            Err(e) => {
                // Remapping failed with the old mapping already dropped; go
                // through the real disposal path so the writer lock is
                // released rather than leaking it behind a hand-set flag.
                let _ = self.dispose();
                Err(e)
            }
        }
    }

    pub fn append(&mut self, value: E) -> Result<()> {
        self.require_writer()?;
        let len = self.len();
        if len == i64::MAX {
            return Err(Error::OutOfRange { index: len, len });
        }
        self.reserve(len + 1)?;
        let off = self.slot_offset(len);
        value.encode(&mut self.map_mut().as_mut_slice()[off..off + E::WIDTH]);
        self.store_count_raw(len + 1);
        Ok(())
    }

    pub fn append_range<I: IntoIterator<Item = E>>(&mut self, items: I) -> Result<()> {
        self.require_writer()?;
        let iter = items.into_iter();
        let (lower, _) = iter.size_hint();
        let start = self.len();
        if lower > 0 {
            self.reserve(start + lower as i64)?;
        }
        let mut written = 0i64;
        for value in iter {
            self.reserve(start + written + 1)?;
            let off = self.slot_offset(start + written);
            value.encode(&mut self.map_mut().as_mut_slice()[off..off + E::WIDTH]);
            written += 1;
        }
        self.store_count_raw(start + written);
        Ok(())
    }

    pub fn set_last(&mut self, value: E) -> Result<()> {
        self.require_writer()?;
        let len = self.len();
        if len < 1 {
            return Err(Error::OutOfRange { index: -1, len });
        }
        let off = self.slot_offset(len - 1);
        value.encode(&mut self.map_mut().as_mut_slice()[off..off + E::WIDTH]);
        Ok(())
    }

    pub fn truncate_tail(&mut self, n: i64) -> Result<()> {
        self.require_writer()?;
        let len = self.len();
        if n < 0 || n > len {
            return Err(Error::OutOfRange { index: n, len });
        }
        self.store_count_raw(n);
        // Best-effort shrink: a failure here leaves the count change in
        // place.
        let _ = self.shrink_to(n);
        Ok(())
    }

    pub fn truncate_head(&mut self, n: i64, progress: Option<&dyn ProgressSink>) -> Result<()> {
        self.require_writer()?;
        let len = self.len();
        if n < 0 || n > len {
            return Err(Error::OutOfRange { index: n, len });
        }
        let start = len - n;
        let total = n.max(1) as u64;
        let chunk = MIGRATION_CHUNK as i64;
        let mut moved = 0i64;
        while moved < n {
            let take = chunk.min(n - moved);
            let src_off = self.slot_offset(start + moved);
            let dst_off = self.slot_offset(moved);
            let bytes = take as usize * E::WIDTH;
            self.map_mut()
                .as_mut_slice()
                .copy_within(src_off..src_off + bytes, dst_off);
            moved += take;
            if let Some(sink) = progress {
                sink.report(moved as u64, total, "truncate_head");
            }
        }
        self.store_count_raw(n);
        Ok(())
    }

    pub fn trim_excess(&mut self) -> Result<()> {
        self.require_writer()?;
        let len = self.len();
        if self.capacity > 0 && (len as f64) < TRIM_EXCESS_RATIO * self.capacity as f64 {
            self.shrink_to(len)?;
        }
        Ok(())
    }

    pub fn disallow_remap(&mut self) {
        self.disallow_remap = true;
    }

    /// Low-level accessor used by overlays (bit array, time series) that
    /// need direct byte access to element slots beyond what `read`/`append`
    /// expose, and by the narrow adapter's migration reader.
    pub(crate) fn raw_bytes(&self) -> &[u8] {
        self.map().as_slice()
    }

    /// Overwrite an already-committed slot (`index < len()`) in place.
    /// Overlays use this for bitwise operations and in-place bit flips that
    /// do not change `count`.
    pub(crate) fn write_unchecked(&mut self, index: i64, value: E) {
        let off = self.slot_offset(index);
        value.encode(&mut self.map_mut().as_mut_slice()[off..off + E::WIDTH]);
    }

    pub fn close(mut self) -> Result<()> {
        self.dispose()
    }

    fn dispose(&mut self) -> Result<()> {
        if self.disposed {
            return Ok(());
        }
        self.disposed = true;
        self.mapping = None;
        if let Some(lock) = self.lock.take() {
            lock::release(lock)?;
        }
        Ok(())
    }
}

impl<E: Element> Drop for MArray<E> {
    fn drop(&mut self) {
        let _ = self.dispose();
    }
}

impl<E: Element> crate::view::ReadableArray for MArray<E> {
    type Item = E;
    fn len(&self) -> i64 {
        MArray::len(self)
    }
    fn read(&self, index: i64) -> Result<E> {
        MArray::read(self, index)
    }
    fn read_bounded(&self, index: i64, bounds: BoundsMode) -> Result<E> {
        MArray::read_bounded(self, index, bounds)
    }
}
