use credscore_types::{Identity, TokenId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OwnershipError {
    #[error("token {0} does not exist")]
    TokenNotFound(TokenId),

    #[error("{0} already holds a token")]
    AlreadyHoldsToken(Identity),

    #[error("{claimed} is not the owner of token {token}")]
    NotOwner { token: TokenId, claimed: Identity },

    #[error("token id space exhausted")]
    SupplyExhausted,

    #[error("registry backend error: {0}")]
    Backend(String),
}
