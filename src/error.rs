//! Crate-wide error taxonomy.
//!
//! One flat, non-generic enum carries every failure mode the engine, the
//! lock, the codecs, and the overlays can produce. Callers match on the
//! variant rather than downcasting a trait object.

use std::fmt;
use std::time::Duration;

/// Every way a `mmarray` operation can fail.
#[derive(Debug)]
pub enum Error {
    /// Header fields unreadable, `capacity < count`, or an overlay byte
    /// mismatch. Carries a human-readable detail for diagnostics.
    Corruption(String),
    /// Checked indexed access outside `[0, len)`.
    OutOfRange { index: i64, len: i64 },
    /// Indexed access above `len` where the caller signalled that
    /// concurrent truncation is possible.
    Truncated { index: i64, len: i64 },
    /// Mutation attempted on a reader handle.
    ReadOnly,
    /// Grow/shrink attempted after `disallow_remap()`.
    ResetDisallowed,
    /// Narrow-integer write outside the current domain and the adapter
    /// could not (or was told not to) migrate.
    DataTypeOverflow { value: i64, min: i64, max: i64 },
    /// Time-series write violates the configured ordering mode. Also
    /// raised for an attempt to write the reserved zero timestamp: a zero
    /// write is treated as an ordering violation rather than a distinct
    /// error kind.
    OutOfOrder { previous: i64, attempted: i64 },
    /// Writer lock not acquired within the deadline.
    LockTimeout { waited: Duration },
    /// Writer lock already held (Windows share violation, or an
    /// immediate-fail POSIX contention check).
    LockContention,
    /// `as_span` was asked for more than `2^31 - 1` elements.
    Only32BitLengthSupported { requested: i64 },
    /// Underlying OS error.
    Io(std::io::Error),
    /// The handle has already been closed.
    Disposed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Corruption(detail) => write!(f, "corrupt data file: {detail}"),
            Error::OutOfRange { index, len } => {
                write!(f, "index {index} out of range for length {len}")
            }
            Error::Truncated { index, len } => {
                write!(f, "index {index} above length {len} (possibly truncated concurrently)")
            }
            Error::ReadOnly => write!(f, "mutation attempted on a read-only handle"),
            Error::ResetDisallowed => {
                write!(f, "operation requires remapping but remap has been disallowed")
            }
            Error::DataTypeOverflow { value, min, max } => {
                write!(f, "value {value} outside domain [{min}, {max}]")
            }
            Error::OutOfOrder { previous, attempted } => write!(
                f,
                "time-series write {attempted} would violate ordering after {previous}"
            ),
            Error::LockTimeout { waited } => {
                write!(f, "writer lock not acquired after {waited:?}")
            }
            Error::LockContention => write!(f, "writer lock already held by another process"),
            Error::Only32BitLengthSupported { requested } => {
                write!(f, "as_span length {requested} exceeds 2^31 - 1")
            }
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Disposed => write!(f, "handle has been closed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// How a checked read reports an index at or beyond the current length.
///
/// Plain `read`/`get`/`as_span` calls use [`BoundsMode::Strict`]: an index
/// past the end is always a caller bug. A reader that took a length
/// snapshot earlier and is racing a writer's `truncate_head`/`truncate_tail`
/// can instead pass [`BoundsMode::ExpectConcurrentTruncation`] to the
/// `_bounded` sibling of that call, so the same condition is reported as
/// [`Error::Truncated`] rather than [`Error::OutOfRange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsMode {
    Strict,
    ExpectConcurrentTruncation,
}

impl BoundsMode {
    pub(crate) fn past_end(self, index: i64, len: i64) -> Error {
        match self {
            BoundsMode::Strict => Error::OutOfRange { index, len },
            BoundsMode::ExpectConcurrentTruncation => Error::Truncated { index, len },
        }
    }
}

/// Optional hook invoked before an error is returned from a writer-mutating
/// call, so embedders can centralize diagnostics without this crate picking
/// a logging backend for them.
pub trait ErrorSink {
    fn observe(&self, error: &Error);
}

impl<F: Fn(&Error)> ErrorSink for F {
    fn observe(&self, error: &Error) {
        self(error)
    }
}
