//! The interface the credit engine requires from the token layer.

use credscore_types::{Identity, TokenId};

use crate::OwnershipError;

/// Source of truth for "who currently owns token X".
///
/// Implementations must make `mint` and `transfer` atomic with respect to
/// the one-token-per-identity rule: two concurrent calls must never leave an
/// identity holding two tokens.
pub trait OwnershipRegistry: Send + Sync {
    /// Issue a new token to `owner`. Fails with
    /// [`OwnershipError::AlreadyHoldsToken`] if `owner` already has one.
    fn mint(&self, owner: &Identity) -> Result<TokenId, OwnershipError>;

    /// Current owner of `token`.
    fn owner_of(&self, token: TokenId) -> Result<Identity, OwnershipError>;

    /// Token currently held by `owner`, if any.
    fn token_of(&self, owner: &Identity) -> Result<Option<TokenId>, OwnershipError>;

    fn exists(&self, token: TokenId) -> Result<bool, OwnershipError>;

    /// Move `token` from `from` to `to`. Fails if `from` is not the owner or
    /// `to` already holds a token.
    fn transfer(&self, from: &Identity, to: &Identity, token: TokenId)
        -> Result<(), OwnershipError>;

    /// Number of tokens issued so far.
    fn total_supply(&self) -> Result<u64, OwnershipError>;
}
