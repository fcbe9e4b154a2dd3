//! Time source for operations that do not carry an explicit `now`.

use credscore_types::Timestamp;

/// Supplies the current time. Swap in a controllable clock for tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}
