//! Process-wide verbosity gate for diagnostic output.
//!
//! Mirrors the `DISPLAY_LEVEL` approach used elsewhere in this codebase:
//! a single `AtomicI32` the embedding application tunes at startup, with
//! `eprintln!`-based sinks gated on it. No subscriber registration, no log
//! file, no sink configuration format — that remains an application concern.

use std::sync::atomic::{AtomicI32, Ordering};

/// 0 = silent, 1 = notable events (lock recovery, migrations), 2 = verbose
/// (every poll attempt, every remap decision).
pub static VERBOSITY: AtomicI32 = AtomicI32::new(0);

/// Set the process-wide verbosity level.
pub fn set_verbosity(level: i32) {
    VERBOSITY.store(level, Ordering::Relaxed);
}

#[inline]
pub fn level() -> i32 {
    VERBOSITY.load(Ordering::Relaxed)
}

macro_rules! note {
    ($lvl:expr, $($arg:tt)*) => {
        if $crate::diag::level() >= $lvl {
            eprintln!($($arg)*);
        }
    };
}

pub(crate) use note;
