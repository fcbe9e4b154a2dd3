use std::fmt;

use credscore_ownership::OwnershipError;
use credscore_types::{Amount, Identity, ScoreDelta, TokenId, TypesError};
use thiserror::Error;

/// How a record was addressed when it could not be found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordRef {
    Token(TokenId),
    Owner(Identity),
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordRef::Token(token) => write!(f, "token {token}"),
            RecordRef::Owner(owner) => write!(f, "owner {owner}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CreditError {
    #[error("{0} already owns a credit record")]
    AlreadyOwnsRecord(Identity),

    #[error("destination {0} already owns a credit record")]
    DestinationAlreadyOwnsRecord(Identity),

    #[error("no credit record for {0}")]
    RecordNotFound(RecordRef),

    #[error("integration {integration} is not approved by {owner}")]
    NotApproved { owner: Identity, integration: Identity },

    #[error("score delta {delta} outside [-{max}, +{max}]")]
    DeltaOutOfRange { delta: ScoreDelta, max: u32 },

    #[error("rate limited: retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("resulting score {candidate} outside [{min}, {max}]")]
    ScoreOutOfBounds { candidate: i64, min: u32, max: u32 },

    #[error("credit record {0} is locked")]
    RecordLocked(TokenId),

    #[error("invalid payment: expected {expected}, got {got}")]
    InvalidPayment { expected: Amount, got: Amount },

    #[error("{0} is not authorized for this operation")]
    Unauthorized(Identity),

    #[error("ownership registry: {0}")]
    Ownership(#[from] OwnershipError),

    #[error("invalid parameters: {0}")]
    Params(#[from] TypesError),

    #[error("snapshot error: {0}")]
    Snapshot(String),
}

/// Coarse classification so callers can tell "try later" from "never" from
/// "needs authorization".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RetryLater,
    Permanent,
    NeedsAuthorization,
    NotFound,
    Conflict,
    Internal,
}

impl CreditError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CreditError::RateLimited { .. } => ErrorKind::RetryLater,
            CreditError::DeltaOutOfRange { .. }
            | CreditError::ScoreOutOfBounds { .. }
            | CreditError::InvalidPayment { .. }
            | CreditError::Params(_) => ErrorKind::Permanent,
            CreditError::NotApproved { .. }
            | CreditError::RecordLocked(_)
            | CreditError::Unauthorized(_) => ErrorKind::NeedsAuthorization,
            CreditError::RecordNotFound(_) => ErrorKind::NotFound,
            CreditError::AlreadyOwnsRecord(_) | CreditError::DestinationAlreadyOwnsRecord(_) => {
                ErrorKind::Conflict
            }
            CreditError::Ownership(_) | CreditError::Snapshot(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            CreditError::AlreadyOwnsRecord(_) => "already_owns_record",
            CreditError::DestinationAlreadyOwnsRecord(_) => "destination_already_owns_record",
            CreditError::RecordNotFound(_) => "record_not_found",
            CreditError::NotApproved { .. } => "not_approved",
            CreditError::DeltaOutOfRange { .. } => "delta_out_of_range",
            CreditError::RateLimited { .. } => "rate_limited",
            CreditError::ScoreOutOfBounds { .. } => "score_out_of_bounds",
            CreditError::RecordLocked(_) => "record_locked",
            CreditError::InvalidPayment { .. } => "invalid_payment",
            CreditError::Unauthorized(_) => "unauthorized",
            CreditError::Ownership(_) => "ownership_registry",
            CreditError::Params(_) => "invalid_params",
            CreditError::Snapshot(_) => "snapshot",
        }
    }
}
