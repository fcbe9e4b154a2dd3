//! Nullable ownership registry — an in-memory ledger with failure injection.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use credscore_ownership::{OwnershipError, OwnershipRegistry, TokenLedger};
use credscore_types::{Identity, TokenId};

/// A [`TokenLedger`] that can be told to fail its next transfer or mint,
/// simulating a registry backend outage.
#[derive(Debug, Default)]
pub struct NullOwnership {
    ledger: TokenLedger,
    fail_next_transfer: AtomicBool,
    fail_next_mint: AtomicBool,
    transfers: AtomicUsize,
}

impl NullOwnership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `transfer` call fail with a backend error.
    pub fn fail_next_transfer(&self) {
        self.fail_next_transfer.store(true, Ordering::SeqCst);
    }

    /// Make the next `mint` call fail with a backend error.
    pub fn fail_next_mint(&self) {
        self.fail_next_mint.store(true, Ordering::SeqCst);
    }

    /// Number of transfers that reached the ledger successfully.
    pub fn transfer_count(&self) -> usize {
        self.transfers.load(Ordering::SeqCst)
    }
}

impl OwnershipRegistry for NullOwnership {
    fn mint(&self, owner: &Identity) -> Result<TokenId, OwnershipError> {
        if self.fail_next_mint.swap(false, Ordering::SeqCst) {
            return Err(OwnershipError::Backend("injected mint failure".into()));
        }
        self.ledger.mint(owner)
    }

    fn owner_of(&self, token: TokenId) -> Result<Identity, OwnershipError> {
        self.ledger.owner_of(token)
    }

    fn token_of(&self, owner: &Identity) -> Result<Option<TokenId>, OwnershipError> {
        self.ledger.token_of(owner)
    }

    fn exists(&self, token: TokenId) -> Result<bool, OwnershipError> {
        self.ledger.exists(token)
    }

    fn transfer(&self, from: &Identity, to: &Identity, token: TokenId) -> Result<(), OwnershipError> {
        if self.fail_next_transfer.swap(false, Ordering::SeqCst) {
            return Err(OwnershipError::Backend("injected transfer failure".into()));
        }
        self.ledger.transfer(from, to, token)?;
        self.transfers.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn total_supply(&self) -> Result<u64, OwnershipError> {
        self.ledger.total_supply()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injected_failure_fires_once() {
        let registry = NullOwnership::new();
        let alice = Identity::new("alice");
        let bob = Identity::new("bob");
        let token = registry.mint(&alice).unwrap();

        registry.fail_next_transfer();
        assert!(matches!(
            registry.transfer(&alice, &bob, token),
            Err(OwnershipError::Backend(_))
        ));
        assert_eq!(registry.owner_of(token).unwrap(), alice);

        registry.transfer(&alice, &bob, token).unwrap();
        assert_eq!(registry.owner_of(token).unwrap(), bob);
        assert_eq!(registry.transfer_count(), 1);
    }

    #[test]
    fn injected_mint_failure() {
        let registry = NullOwnership::new();
        registry.fail_next_mint();
        assert!(registry.mint(&Identity::new("alice")).is_err());
        assert!(registry.mint(&Identity::new("alice")).is_ok());
    }
}
