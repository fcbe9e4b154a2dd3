//! Nullable clock — deterministic time for testing.

use std::sync::atomic::{AtomicU64, Ordering};

use credscore_engine::Clock;
use credscore_types::Timestamp;

/// A deterministic clock for testing.
///
/// Time only advances when you tell it to. Shareable across threads so a
/// service under test and the test body see the same time.
#[derive(Debug, Default)]
pub struct NullClock {
    current: AtomicU64,
}

impl NullClock {
    pub fn new(initial_secs: u64) -> Self {
        Self {
            current: AtomicU64::new(initial_secs),
        }
    }

    /// Advance time by a number of seconds.
    pub fn advance(&self, secs: u64) {
        self.current.fetch_add(secs, Ordering::SeqCst);
    }

    /// Set the time to a specific value.
    pub fn set(&self, secs: u64) {
        self.current.store(secs, Ordering::SeqCst);
    }
}

impl Clock for NullClock {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.current.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_only_on_request() {
        let clock = NullClock::new(10);
        assert_eq!(clock.now(), Timestamp::new(10));
        clock.advance(86_400);
        assert_eq!(clock.now(), Timestamp::new(86_410));
        clock.set(3);
        assert_eq!(clock.now(), Timestamp::new(3));
    }
}
