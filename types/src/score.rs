//! Credit score and signed score adjustment.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A credit score value.
///
/// The type itself is unbounded; the `[min_score, max_score]` window is a
/// policy carried by [`crate::CreditParams`] and enforced by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Score(u32);

impl Score {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// Apply a signed delta. Returns `None` if the result would be negative
    /// or overflow `u32`; range policy is checked separately.
    pub fn apply(self, delta: ScoreDelta) -> Option<Self> {
        let candidate = i64::from(self.0) + i64::from(delta.value());
        u32::try_from(candidate).ok().map(Self)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A signed adjustment proposed by an integration.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ScoreDelta(i32);

impl ScoreDelta {
    pub const ZERO: Self = Self(0);

    pub fn new(value: i32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i32 {
        self.0
    }

    /// Absolute size of the adjustment.
    pub fn magnitude(&self) -> u32 {
        self.0.unsigned_abs()
    }
}

impl fmt::Display for ScoreDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}", self.0)
    }
}
