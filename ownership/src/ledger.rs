//! In-memory token ledger — the default [`OwnershipRegistry`] backend.
//!
//! Both directions of the ownership mapping live under a single `RwLock`, so
//! mint and transfer update them together and the one-token-per-identity rule
//! holds under concurrent callers.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use credscore_types::{Identity, TokenId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{OwnershipError, OwnershipRegistry};

#[derive(Debug)]
struct LedgerState {
    owners: HashMap<TokenId, Identity>,
    tokens_by_owner: HashMap<Identity, TokenId>,
    next_id: Option<TokenId>,
}

impl Default for LedgerState {
    fn default() -> Self {
        Self {
            owners: HashMap::new(),
            tokens_by_owner: HashMap::new(),
            next_id: Some(TokenId::FIRST),
        }
    }
}

/// Serializable image of a [`TokenLedger`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLedgerSnapshot {
    /// Every issued token with its current owner, sorted by token id.
    pub entries: Vec<(TokenId, Identity)>,
    /// Next id to hand out; `None` once the id space is exhausted.
    pub next_id: Option<TokenId>,
}

/// Thread-safe in-memory ownership registry.
#[derive(Debug, Default)]
pub struct TokenLedger {
    state: RwLock<LedgerState>,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from a snapshot, rejecting inconsistent images.
    pub fn from_snapshot(snapshot: TokenLedgerSnapshot) -> Result<Self, OwnershipError> {
        let mut state = LedgerState {
            next_id: snapshot.next_id,
            ..LedgerState::default()
        };
        for (token, owner) in snapshot.entries {
            if let Some(next) = state.next_id {
                if token >= next {
                    return Err(OwnershipError::Backend(format!(
                        "snapshot token {token} is not below next id {next}"
                    )));
                }
            }
            if state.tokens_by_owner.insert(owner.clone(), token).is_some() {
                return Err(OwnershipError::AlreadyHoldsToken(owner));
            }
            if state.owners.insert(token, owner).is_some() {
                return Err(OwnershipError::Backend(format!(
                    "snapshot lists token {token} twice"
                )));
            }
        }
        Ok(Self {
            state: RwLock::new(state),
        })
    }

    pub fn snapshot(&self) -> TokenLedgerSnapshot {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let mut entries: Vec<_> = state
            .owners
            .iter()
            .map(|(token, owner)| (*token, owner.clone()))
            .collect();
        entries.sort_by_key(|(token, _)| *token);
        TokenLedgerSnapshot {
            entries,
            next_id: state.next_id,
        }
    }
}

impl OwnershipRegistry for TokenLedger {
    fn mint(&self, owner: &Identity) -> Result<TokenId, OwnershipError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.tokens_by_owner.contains_key(owner) {
            return Err(OwnershipError::AlreadyHoldsToken(owner.clone()));
        }
        let token = state.next_id.ok_or(OwnershipError::SupplyExhausted)?;
        state.next_id = token.next();
        state.owners.insert(token, owner.clone());
        state.tokens_by_owner.insert(owner.clone(), token);
        debug!(%token, %owner, "token minted");
        Ok(token)
    }

    fn owner_of(&self, token: TokenId) -> Result<Identity, OwnershipError> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .owners
            .get(&token)
            .cloned()
            .ok_or(OwnershipError::TokenNotFound(token))
    }

    fn token_of(&self, owner: &Identity) -> Result<Option<TokenId>, OwnershipError> {
        Ok(self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .tokens_by_owner
            .get(owner)
            .copied())
    }

    fn exists(&self, token: TokenId) -> Result<bool, OwnershipError> {
        Ok(self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .owners
            .contains_key(&token))
    }

    fn transfer(
        &self,
        from: &Identity,
        to: &Identity,
        token: TokenId,
    ) -> Result<(), OwnershipError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        match state.owners.get(&token) {
            None => return Err(OwnershipError::TokenNotFound(token)),
            Some(current) if current != from => {
                return Err(OwnershipError::NotOwner {
                    token,
                    claimed: from.clone(),
                })
            }
            Some(_) => {}
        }
        if state.tokens_by_owner.contains_key(to) {
            return Err(OwnershipError::AlreadyHoldsToken(to.clone()));
        }
        state.tokens_by_owner.remove(from);
        state.tokens_by_owner.insert(to.clone(), token);
        state.owners.insert(token, to.clone());
        debug!(%token, %from, %to, "token transferred");
        Ok(())
    }

    fn total_supply(&self) -> Result<u64, OwnershipError> {
        Ok(self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .owners
            .len() as u64)
    }
}
