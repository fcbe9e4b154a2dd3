//! Validation rules of the score-update protocol.
//!
//! These functions decide whether an adjustment may proceed and what the new
//! score is; they never mutate anything. [`CreditService::adjust_score`]
//! gathers the inputs under the record's write lock, calls
//! [`validate_adjustment`], and commits the result.
//!
//! [`CreditService::adjust_score`]: crate::CreditService::adjust_score

use credscore_types::{CreditParams, Identity, Score, ScoreDelta};

use crate::error::CreditError;

/// Reject a delta whose magnitude exceeds `max_delta`. Depends on nothing but
/// the input, so it runs before any state is consulted.
pub fn check_delta(params: &CreditParams, delta: ScoreDelta) -> Result<(), CreditError> {
    if delta.magnitude() > params.max_delta {
        return Err(CreditError::DeltaOutOfRange {
            delta,
            max: params.max_delta,
        });
    }
    Ok(())
}

/// Everything the protocol needs to judge one adjustment.
#[derive(Debug, Clone)]
pub struct AdjustmentCheck<'a> {
    pub owner: &'a Identity,
    pub integration: &'a Identity,
    pub approved: bool,
    /// Cooldown left for this integration on this owner; zero when eligible.
    pub retry_after_secs: u64,
    pub current: Score,
    pub delta: ScoreDelta,
}

/// Run the approval, delta, throttle and bounds checks in order and return
/// the score the record would hold afterwards.
pub fn validate_adjustment(
    params: &CreditParams,
    check: &AdjustmentCheck<'_>,
) -> Result<Score, CreditError> {
    if !check.approved {
        return Err(CreditError::NotApproved {
            owner: check.owner.clone(),
            integration: check.integration.clone(),
        });
    }

    check_delta(params, check.delta)?;

    if check.retry_after_secs > 0 {
        return Err(CreditError::RateLimited {
            retry_after_secs: check.retry_after_secs,
        });
    }

    let out_of_bounds = || CreditError::ScoreOutOfBounds {
        candidate: i64::from(check.current.value()) + i64::from(check.delta.value()),
        min: params.min_score,
        max: params.max_score,
    };
    let candidate = check.current.apply(check.delta).ok_or_else(out_of_bounds)?;
    if !params.in_bounds(candidate) {
        return Err(out_of_bounds());
    }
    Ok(candidate)
}
