//! The open-instance tracker collaborator surface.
//!
//! Pure in-memory bookkeeping for leak/debug instrumentation built on top
//! of this crate; the crate itself never consults this registry when
//! deciding behaviour.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Opaque handle returned by [`InstanceTracker::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token(u64);

#[derive(Default)]
pub struct InstanceTracker {
    next: AtomicU64,
    open: Mutex<Vec<(Token, String)>>,
}

impl InstanceTracker {
    pub fn new() -> Self {
        InstanceTracker::default()
    }

    pub fn open(&self, name: &str) -> Token {
        let token = Token(self.next.fetch_add(1, Ordering::Relaxed));
        self.open.lock().unwrap().push((token, name.to_string()));
        token
    }

    pub fn close(&self, token: Token) {
        self.open.lock().unwrap().retain(|(t, _)| *t != token);
    }

    pub fn list(&self) -> Vec<(Token, String)> {
        self.open.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_close_round_trip() {
        let tracker = InstanceTracker::new();
        let a = tracker.open("a.bt");
        let b = tracker.open("b.bt");
        assert_eq!(tracker.list().len(), 2);
        tracker.close(a);
        let remaining = tracker.list();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].0, b);
    }
}
