//! Errors raised while constructing or validating fundamental types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("invalid token id: {0}")]
    InvalidTokenId(String),

    #[error("invalid credit parameters: {0}")]
    InvalidParams(String),
}
