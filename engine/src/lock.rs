//! Per-record lock gating approval revocation.

use credscore_types::{Identity, Timestamp};
use serde::{Deserialize, Serialize};

/// Who holds a lock and since when.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockHold {
    pub by: Identity,
    pub since: Timestamp,
}

/// Lock flag of a single record. Unlocked by default.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockState {
    hold: Option<LockHold>,
}

impl LockState {
    /// Whether the lock is in force at `now`. With `max_lock_secs` set, a
    /// hold older than the limit no longer counts.
    pub fn is_locked(&self, now: Timestamp, max_lock_secs: Option<u64>) -> bool {
        match (&self.hold, max_lock_secs) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(hold), Some(max)) => !hold.since.has_elapsed(max, now),
        }
    }

    /// Set the lock. Re-locking replaces the holder and restarts the expiry window.
    pub fn set(&mut self, by: Identity, now: Timestamp) {
        self.hold = Some(LockHold { by, since: now });
    }

    /// Clear the lock, returning the previous hold if any.
    pub fn clear(&mut self) -> Option<LockHold> {
        self.hold.take()
    }

    pub fn hold(&self) -> Option<&LockHold> {
        self.hold.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_unlocked() {
        assert!(!LockState::default().is_locked(Timestamp::new(0), None));
    }

    #[test]
    fn lock_without_expiry_persists() {
        let mut l = LockState::default();
        l.set(Identity::new("lender"), Timestamp::new(10));
        assert!(l.is_locked(Timestamp::new(u64::MAX), None));
    }

    #[test]
    fn lock_expires_under_policy() {
        let mut l = LockState::default();
        l.set(Identity::new("lender"), Timestamp::new(100));
        assert!(l.is_locked(Timestamp::new(199), Some(100)));
        assert!(!l.is_locked(Timestamp::new(200), Some(100)));
    }

    #[test]
    fn clear_returns_hold() {
        let mut l = LockState::default();
        l.set(Identity::new("lender"), Timestamp::new(1));
        assert_eq!(l.clear().map(|h| h.by), Some(Identity::new("lender")));
        assert!(l.clear().is_none());
        assert!(!l.is_locked(Timestamp::new(1), None));
    }
}
