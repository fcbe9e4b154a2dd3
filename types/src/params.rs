//! Credit parameters — the score window, per-call bound, throttle and pricing.
//!
//! Every field has a default matching the reference deployment; operators may
//! override them through the daemon's `[params]` config table.

use serde::{Deserialize, Serialize};

use crate::{Amount, Score, TypesError};

/// Tunable policy for the score-update engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditParams {
    /// Lowest score a record may ever hold.
    pub min_score: u32,

    /// Highest score a record may ever hold.
    pub max_score: u32,

    /// Score assigned to a newly created record.
    pub initial_score: u32,

    /// Largest absolute delta accepted in a single adjustment.
    pub max_delta: u32,

    /// Minimum seconds between two successful adjustments by the same
    /// integration on the same owner.
    pub cooldown_secs: u64,

    /// Exact payment required to create a record.
    pub record_price: Amount,

    /// Optional lock expiry. `None` keeps a lock until it is explicitly
    /// released, which means a vanished integration can pin approvals forever.
    pub max_lock_secs: Option<u64>,
}

impl Default for CreditParams {
    fn default() -> Self {
        Self {
            min_score: 350,
            max_score: 900,
            initial_score: 500,
            max_delta: 10,
            cooldown_secs: 86_400,
            // 0.01 of an 18-decimal currency unit.
            record_price: Amount::new(10_000_000_000_000_000),
            max_lock_secs: None,
        }
    }
}

impl CreditParams {
    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), TypesError> {
        if self.min_score > self.max_score {
            return Err(TypesError::InvalidParams(format!(
                "min_score {} exceeds max_score {}",
                self.min_score, self.max_score
            )));
        }
        if !(self.min_score..=self.max_score).contains(&self.initial_score) {
            return Err(TypesError::InvalidParams(format!(
                "initial_score {} outside [{}, {}]",
                self.initial_score, self.min_score, self.max_score
            )));
        }
        if self.max_delta == 0 {
            return Err(TypesError::InvalidParams(
                "max_delta must be positive".to_string(),
            ));
        }
        if self.max_delta > i32::MAX as u32 {
            return Err(TypesError::InvalidParams(format!(
                "max_delta {} does not fit a signed delta",
                self.max_delta
            )));
        }
        if self.max_lock_secs == Some(0) {
            return Err(TypesError::InvalidParams(
                "max_lock_secs must be positive when set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn initial(&self) -> Score {
        Score::new(self.initial_score)
    }

    /// Whether `score` lies inside the allowed window.
    pub fn in_bounds(&self, score: Score) -> bool {
        (self.min_score..=self.max_score).contains(&score.value())
    }

    /// Fewest adjustment windows a single integration needs to move a record
    /// across the whole score range.
    pub fn min_traversal_windows(&self) -> u32 {
        self.max_score
            .saturating_sub(self.min_score)
            .div_ceil(self.max_delta.max(1))
    }
}
