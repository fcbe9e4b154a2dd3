//! Credit records and the store that holds them.
//!
//! Every record sits in its own `RwLock` cell. Mutations of one record take
//! that cell's write lock for the whole read-validate-write sequence, so
//! operations on different records never wait on each other, and readers
//! always see a record either before or after an update, never halfway.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use credscore_ownership::{OwnershipError, OwnershipRegistry};
use credscore_types::{CreditParams, Identity, Score, ScoreDelta, Timestamp, TokenId};
use serde::{Deserialize, Serialize};

use crate::error::{CreditError, RecordRef};
use crate::lock::LockState;

/// The credit state attached to one issued token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditRecord {
    pub token: TokenId,
    /// Mirror of the ownership registry's current owner, refreshed on transfer.
    pub owner: Identity,
    pub score: Score,
    /// Time of the last successful adjustment, or of creation.
    pub last_updated: Timestamp,
    /// Delta applied by the last successful adjustment; zero for a fresh record.
    pub last_score_change: ScoreDelta,
    /// Integration that applied the last adjustment.
    pub last_updated_by: Option<Identity>,
}

impl CreditRecord {
    pub fn new(token: TokenId, owner: Identity, score: Score, now: Timestamp) -> Self {
        Self {
            token,
            owner,
            score,
            last_updated: now,
            last_score_change: ScoreDelta::ZERO,
            last_updated_by: None,
        }
    }

    pub(crate) fn apply(
        &mut self,
        score: Score,
        delta: ScoreDelta,
        integration: &Identity,
        now: Timestamp,
    ) {
        self.score = score;
        self.last_updated = now;
        self.last_score_change = delta;
        self.last_updated_by = Some(integration.clone());
    }
}

/// A record together with its lock flag, guarded as one unit.
#[derive(Debug)]
pub(crate) struct RecordCell {
    pub(crate) record: CreditRecord,
    pub(crate) lock: LockState,
}

pub(crate) type SharedCell = Arc<RwLock<RecordCell>>;

pub(crate) fn read_cell(cell: &RwLock<RecordCell>) -> RwLockReadGuard<'_, RecordCell> {
    cell.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_cell(cell: &RwLock<RecordCell>) -> RwLockWriteGuard<'_, RecordCell> {
    cell.write().unwrap_or_else(PoisonError::into_inner)
}

/// All issued records, keyed by token.
#[derive(Debug, Default)]
pub struct RecordStore {
    cells: RwLock<HashMap<TokenId, SharedCell>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a token for `owner` and create its record at the initial score.
    ///
    /// The index stays write-locked across the mint so no reader can see a
    /// minted token without its record.
    pub fn create(
        &self,
        registry: &dyn OwnershipRegistry,
        owner: &Identity,
        params: &CreditParams,
        now: Timestamp,
    ) -> Result<CreditRecord, CreditError> {
        let mut cells = self.cells.write().unwrap_or_else(PoisonError::into_inner);
        let token = registry.mint(owner).map_err(|e| match e {
            OwnershipError::AlreadyHoldsToken(holder) => CreditError::AlreadyOwnsRecord(holder),
            other => other.into(),
        })?;
        let record = CreditRecord::new(token, owner.clone(), params.initial(), now);
        cells.insert(
            token,
            Arc::new(RwLock::new(RecordCell {
                record: record.clone(),
                lock: LockState::default(),
            })),
        );
        Ok(record)
    }

    /// Snapshot of one record.
    pub fn get(&self, token: TokenId) -> Result<CreditRecord, CreditError> {
        let cell = self.cell(token)?;
        let guard = read_cell(&cell);
        Ok(guard.record.clone())
    }

    pub fn len(&self) -> usize {
        self.cells
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn cell(&self, token: TokenId) -> Result<SharedCell, CreditError> {
        self.cells
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&token)
            .cloned()
            .ok_or(CreditError::RecordNotFound(RecordRef::Token(token)))
    }

    /// Cells sorted by token, for snapshotting.
    pub(crate) fn cells(&self) -> Vec<SharedCell> {
        let cells = self.cells.read().unwrap_or_else(PoisonError::into_inner);
        let mut tokens: Vec<_> = cells.keys().copied().collect();
        tokens.sort();
        tokens.iter().filter_map(|t| cells.get(t).cloned()).collect()
    }

    pub(crate) fn insert_restored(&self, record: CreditRecord, lock: LockState) {
        let token = record.token;
        self.cells
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token, Arc::new(RwLock::new(RecordCell { record, lock })));
    }

    /// Reassign the record held in `cell` to `to`.
    ///
    /// Rejects a destination that already owns a record, then moves the
    /// token in the registry, then updates the owner mirror. A registry
    /// failure leaves the record untouched. Returns the previous owner.
    pub(crate) fn update_owner(
        registry: &dyn OwnershipRegistry,
        cell: &mut RecordCell,
        to: &Identity,
    ) -> Result<Identity, CreditError> {
        let from = cell.record.owner.clone();
        let token = cell.record.token;
        if registry.token_of(to)?.is_some() {
            return Err(CreditError::DestinationAlreadyOwnsRecord(to.clone()));
        }
        registry.transfer(&from, to, token).map_err(|e| match e {
            OwnershipError::AlreadyHoldsToken(holder) => {
                CreditError::DestinationAlreadyOwnsRecord(holder)
            }
            OwnershipError::NotOwner { claimed, .. } => CreditError::Unauthorized(claimed),
            other => other.into(),
        })?;
        cell.record.owner = to.clone();
        Ok(from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credscore_ownership::TokenLedger;

    fn id(s: &str) -> Identity {
        Identity::new(s)
    }

    #[test]
    fn create_starts_at_initial_score() {
        let ledger = TokenLedger::new();
        let store = RecordStore::new();
        let rec = store
            .create(&ledger, &id("alice"), &CreditParams::default(), Timestamp::new(7))
            .unwrap();
        assert_eq!(rec.score, Score::new(500));
        assert_eq!(rec.last_score_change, ScoreDelta::ZERO);
        assert_eq!(rec.last_updated_by, None);
        assert_eq!(rec.last_updated, Timestamp::new(7));
        assert_eq!(store.get(rec.token).unwrap(), rec);
    }

    #[test]
    fn second_create_for_owner_fails() {
        let ledger = TokenLedger::new();
        let store = RecordStore::new();
        let params = CreditParams::default();
        store.create(&ledger, &id("alice"), &params, Timestamp::EPOCH).unwrap();
        assert!(matches!(
            store.create(&ledger, &id("alice"), &params, Timestamp::EPOCH),
            Err(CreditError::AlreadyOwnsRecord(_))
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn get_unknown_token() {
        let store = RecordStore::new();
        assert!(matches!(
            store.get(TokenId::new(3)),
            Err(CreditError::RecordNotFound(RecordRef::Token(_)))
        ));
    }

    #[test]
    fn update_owner_moves_mirror_and_registry() {
        let ledger = TokenLedger::new();
        let store = RecordStore::new();
        let rec = store
            .create(&ledger, &id("alice"), &CreditParams::default(), Timestamp::EPOCH)
            .unwrap();
        let cell = store.cell(rec.token).unwrap();
        let mut guard = write_cell(&cell);
        let from = RecordStore::update_owner(&ledger, &mut guard, &id("bob")).unwrap();
        assert_eq!(from, id("alice"));
        assert_eq!(guard.record.owner, id("bob"));
        assert_eq!(ledger.owner_of(rec.token).unwrap(), id("bob"));
    }

    #[test]
    fn update_owner_rejects_occupied_destination() {
        let ledger = TokenLedger::new();
        let store = RecordStore::new();
        let params = CreditParams::default();
        let rec = store.create(&ledger, &id("alice"), &params, Timestamp::EPOCH).unwrap();
        store.create(&ledger, &id("bob"), &params, Timestamp::EPOCH).unwrap();
        let cell = store.cell(rec.token).unwrap();
        let mut guard = write_cell(&cell);
        assert!(matches!(
            RecordStore::update_owner(&ledger, &mut guard, &id("bob")),
            Err(CreditError::DestinationAlreadyOwnsRecord(_))
        ));
        assert_eq!(guard.record.owner, id("alice"));
    }
}
