//! The progress-reporting collaborator surface.
//!
//! `truncate_head` and narrow-integer migration report progress through
//! this trait rather than the crate choosing a UI or logging backend.

/// Receives `(current, total, label)` updates. `label` identifies which
/// long-running operation is reporting (`"truncate_head"`, `"migration"`).
pub trait ProgressSink {
    fn report(&self, current: u64, total: u64, label: &str);
}

impl<F: Fn(u64, u64, &str)> ProgressSink for F {
    fn report(&self, current: u64, total: u64, label: &str) {
        self(current, total, label)
    }
}
