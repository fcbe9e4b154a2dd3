//! Per-(integration, owner) adjustment throttle.
//!
//! Only successful adjustments write an entry. A missing entry means the
//! integration has never adjusted this owner's record and is always eligible.

use std::collections::HashMap;

use credscore_types::{Identity, Timestamp};

#[derive(Clone, Debug, Default)]
pub struct RateLimitTracker {
    last_update: HashMap<(Identity, Identity), Timestamp>,
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the last successful adjustment, or `None` if there was
    /// none (an unbounded wait).
    pub fn time_since_last(
        &self,
        integration: &Identity,
        owner: &Identity,
        now: Timestamp,
    ) -> Option<u64> {
        self.last_update
            .get(&(integration.clone(), owner.clone()))
            .map(|last| last.elapsed_since(now))
    }

    /// Seconds left before `integration` may adjust `owner` again; zero when eligible.
    pub fn remaining(
        &self,
        integration: &Identity,
        owner: &Identity,
        now: Timestamp,
        cooldown_secs: u64,
    ) -> u64 {
        match self.time_since_last(integration, owner, now) {
            Some(elapsed) => cooldown_secs.saturating_sub(elapsed),
            None => 0,
        }
    }

    pub fn record_update(&mut self, integration: &Identity, owner: &Identity, now: Timestamp) {
        self.last_update
            .insert((integration.clone(), owner.clone()), now);
    }

    /// All entries as `(integration, owner, last)`, sorted for deterministic output.
    pub fn entries(&self) -> Vec<(Identity, Identity, Timestamp)> {
        let mut out: Vec<_> = self
            .last_update
            .iter()
            .map(|((integration, owner), ts)| (integration.clone(), owner.clone(), *ts))
            .collect();
        out.sort();
        out
    }

    pub fn len(&self) -> usize {
        self.last_update.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_update.is_empty()
    }
}

impl FromIterator<(Identity, Identity, Timestamp)> for RateLimitTracker {
    fn from_iter<T: IntoIterator<Item = (Identity, Identity, Timestamp)>>(iter: T) -> Self {
        Self {
            last_update: iter
                .into_iter()
                .map(|(integration, owner, ts)| ((integration, owner), ts))
                .collect(),
        }
    }
}
