//! `CreditService` — the facade every caller goes through.
//!
//! Lock order: a record cell first, then the approval map, the rate-limit
//! map or the ownership registry, each held only for a single lookup or
//! write. Record creation takes the treasury, then the record index, then
//! the registry. No operation ever waits on a second record's cell.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use credscore_ownership::{OwnershipError, OwnershipRegistry};
use credscore_types::{Amount, CreditParams, Identity, Score, ScoreDelta, Timestamp, TokenId};

use crate::approvals::ApprovalRegistry;
use crate::clock::Clock;
use crate::error::{CreditError, RecordRef};
use crate::event::{CreditEvent, EventBus};
use crate::payment::Treasury;
use crate::protocol::{check_delta, validate_adjustment, AdjustmentCheck};
use crate::rate_limit::RateLimitTracker;
use crate::record::{read_cell, write_cell, CreditRecord, RecordCell, RecordStore};
use crate::snapshot::{CreditSnapshot, RateLimitEntry, RecordSnapshot, SnapshotBody};

/// Bound on re-resolving an owner's record when it changes hands mid-lookup.
const OWNER_LOOKUP_ATTEMPTS: usize = 8;

pub struct CreditService {
    params: CreditParams,
    registry: Arc<dyn OwnershipRegistry>,
    clock: Arc<dyn Clock>,
    records: RecordStore,
    approvals: RwLock<ApprovalRegistry>,
    rate_limits: RwLock<RateLimitTracker>,
    treasury: Mutex<Treasury>,
    events: EventBus,
}

impl CreditService {
    pub fn new(
        params: CreditParams,
        registry: Arc<dyn OwnershipRegistry>,
        clock: Arc<dyn Clock>,
        treasury_admin: Identity,
    ) -> Result<Self, CreditError> {
        params.validate()?;
        let treasury = Treasury::new(treasury_admin, params.record_price);
        Ok(Self {
            params,
            registry,
            clock,
            records: RecordStore::new(),
            approvals: RwLock::new(ApprovalRegistry::new()),
            rate_limits: RwLock::new(RateLimitTracker::new()),
            treasury: Mutex::new(treasury),
            events: EventBus::new(),
        })
    }

    pub fn params(&self) -> &CreditParams {
        &self.params
    }

    /// Register an event listener. Listeners run synchronously, in commit
    /// order, while the affected record is still held.
    pub fn subscribe(&mut self, listener: Box<dyn Fn(&CreditEvent) + Send + Sync>) {
        self.events.subscribe(listener);
        tracing::debug!(listeners = self.events.listener_count(), "event listener registered");
    }

    // ── Records ────────────────────────────────────────────────────────

    /// Take exactly `record_price` from `owner` and issue their record.
    /// Nothing is credited if the mint fails.
    pub fn create_record(&self, owner: &Identity, payment: Amount) -> Result<TokenId, CreditError> {
        let mut treasury = self.lock_treasury();
        if let Err(err) = treasury.require_payment(payment) {
            tracing::debug!(%owner, %payment, "record creation rejected: {err}");
            return Err(err);
        }
        let record = self
            .records
            .create(self.registry.as_ref(), owner, &self.params, self.clock.now())
            .map_err(|err| {
                tracing::debug!(%owner, "record creation rejected: {err}");
                err
            })?;
        treasury.deposit(payment)?;

        self.events.emit(&CreditEvent::PaymentReceived {
            from: owner.clone(),
            amount: payment,
        });
        self.events.emit(&CreditEvent::RecordCreated {
            token: record.token,
            owner: owner.clone(),
        });
        tracing::info!(token = %record.token, %owner, score = %record.score, "credit record created");
        Ok(record.token)
    }

    /// Current score of `owner`'s record and when it last changed.
    pub fn get_score(&self, owner: &Identity) -> Result<(Score, Timestamp), CreditError> {
        let record = self.record_of(owner)?;
        Ok((record.score, record.last_updated))
    }

    /// Delta and integration of the last successful adjustment.
    pub fn get_last_change(
        &self,
        owner: &Identity,
    ) -> Result<(ScoreDelta, Option<Identity>), CreditError> {
        let record = self.record_of(owner)?;
        Ok((record.last_score_change, record.last_updated_by))
    }

    pub fn record(&self, token: TokenId) -> Result<CreditRecord, CreditError> {
        self.records.get(token)
    }

    pub fn token_of(&self, owner: &Identity) -> Result<Option<TokenId>, CreditError> {
        Ok(self.registry.token_of(owner)?)
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    fn record_of(&self, owner: &Identity) -> Result<CreditRecord, CreditError> {
        let not_found = || CreditError::RecordNotFound(RecordRef::Owner(owner.clone()));
        let token = self.registry.token_of(owner)?.ok_or_else(not_found)?;
        self.records.get(token).map_err(|_| not_found())
    }

    /// Move `token` from `from` to `to`. Score and history travel with the
    /// record; approvals and throttle entries stay keyed to each identity.
    pub fn transfer(&self, from: &Identity, to: &Identity, token: TokenId) -> Result<(), CreditError> {
        let cell = self.records.cell(token)?;
        let mut guard = write_cell(&cell);
        let owner = self.current_owner(&mut guard)?;
        if &owner != from {
            tracing::debug!(%token, %from, %owner, "transfer rejected: caller is not the owner");
            return Err(CreditError::Unauthorized(from.clone()));
        }
        RecordStore::update_owner(self.registry.as_ref(), &mut guard, to).map_err(|err| {
            match &err {
                CreditError::Ownership(_) => tracing::warn!(%token, %from, %to, "registry transfer failed: {err}"),
                _ => tracing::debug!(%token, %from, %to, "transfer rejected: {err}"),
            }
            err
        })?;

        self.events.emit(&CreditEvent::Transfer {
            from: from.clone(),
            to: to.clone(),
            token,
        });
        tracing::info!(%token, %from, %to, "credit record transferred");
        Ok(())
    }

    // ── Approvals ──────────────────────────────────────────────────────

    /// Approve `integration` for `owner`. Idempotent; the event fires every time.
    pub fn grant_approval(&self, owner: &Identity, integration: &Identity) -> Result<(), CreditError> {
        self.with_owner_cell(owner, |_| {
            let added = self.write_approvals().grant(owner, integration);
            self.events.emit(&CreditEvent::ApprovalGranted {
                owner: owner.clone(),
                integration: integration.clone(),
            });
            tracing::info!(%owner, %integration, new = added, "approval granted");
            Ok(())
        })
    }

    /// Withdraw an approval. Fails with `RecordLocked` while the owner's
    /// record is locked, then with `NotApproved` if nothing was granted.
    pub fn revoke_approval(&self, owner: &Identity, integration: &Identity) -> Result<(), CreditError> {
        let now = self.clock.now();
        self.with_owner_cell(owner, |cell| {
            if let Some(cell) = cell {
                if cell.lock.is_locked(now, self.params.max_lock_secs) {
                    tracing::debug!(
                        %owner,
                        %integration,
                        token = %cell.record.token,
                        held_by = ?cell.lock.hold().map(|hold| &hold.by),
                        "revocation blocked by lock"
                    );
                    return Err(CreditError::RecordLocked(cell.record.token));
                }
            }
            self.write_approvals().revoke(owner, integration)?;
            self.events.emit(&CreditEvent::ApprovalRevoked {
                owner: owner.clone(),
                integration: integration.clone(),
            });
            tracing::info!(%owner, %integration, "approval revoked");
            Ok(())
        })
    }

    /// Approved integrations in enumeration order. Revocation swaps the last
    /// entry into the removed slot, so the order is not stable.
    pub fn list_approvals(&self, owner: &Identity) -> Vec<Identity> {
        self.read_approvals().list(owner)
    }

    pub fn is_approved(&self, owner: &Identity, integration: &Identity) -> bool {
        self.read_approvals().is_approved(owner, integration)
    }

    // ── Score updates ──────────────────────────────────────────────────

    /// Apply `delta` to the record `token` on behalf of `integration` at `now`.
    ///
    /// Checks run as: delta range, record existence, approval, throttle,
    /// bounds. On success the score, its metadata and the throttle entry
    /// change together under the record's lock.
    pub fn adjust_score(
        &self,
        token: TokenId,
        integration: &Identity,
        delta: ScoreDelta,
        now: Timestamp,
    ) -> Result<Score, CreditError> {
        if let Err(err) = check_delta(&self.params, delta) {
            tracing::debug!(%token, %integration, %delta, "adjustment rejected: {err}");
            return Err(err);
        }
        let cell = self.records.cell(token)?;
        let mut guard = write_cell(&cell);
        let owner = self.current_owner(&mut guard)?;

        let approved = self.read_approvals().is_approved(&owner, integration);
        let retry_after_secs = self.read_rate_limits().remaining(
            integration,
            &owner,
            now,
            self.params.cooldown_secs,
        );
        let check = AdjustmentCheck {
            owner: &owner,
            integration,
            approved,
            retry_after_secs,
            current: guard.record.score,
            delta,
        };
        let new_score = match validate_adjustment(&self.params, &check) {
            Ok(score) => score,
            Err(err) => {
                tracing::debug!(%token, %integration, %delta, "adjustment rejected: {err}");
                return Err(err);
            }
        };

        self.write_rate_limits().record_update(integration, &owner, now);
        guard.record.apply(new_score, delta, integration, now);

        self.events.emit(&CreditEvent::ScoreUpdated {
            token,
            new_score,
            delta,
            integration: integration.clone(),
        });
        tracing::info!(%token, %integration, %delta, score = %new_score, "score adjusted");
        Ok(new_score)
    }

    /// [`adjust_score`](Self::adjust_score) at the service clock's time.
    pub fn adjust_score_now(
        &self,
        token: TokenId,
        integration: &Identity,
        delta: ScoreDelta,
    ) -> Result<Score, CreditError> {
        self.adjust_score(token, integration, delta, self.clock.now())
    }

    /// Seconds since `integration` last adjusted `owner`; `None` if never.
    pub fn time_since_last(&self, integration: &Identity, owner: &Identity, now: Timestamp) -> Option<u64> {
        self.read_rate_limits().time_since_last(integration, owner, now)
    }

    // ── Locks ──────────────────────────────────────────────────────────

    /// Lock `token`. `caller` must be an integration approved by the
    /// record's current owner; the holder is always the caller itself.
    pub fn lock(&self, token: TokenId, caller: &Identity) -> Result<(), CreditError> {
        let cell = self.records.cell(token)?;
        let mut guard = write_cell(&cell);
        let owner = self.current_owner(&mut guard)?;
        self.require_approved(&owner, caller)?;

        guard.lock.set(caller.clone(), self.clock.now());
        self.events.emit(&CreditEvent::RecordLocked {
            token,
            by: caller.clone(),
        });
        tracing::info!(%token, %owner, by = %caller, "credit record locked");
        Ok(())
    }

    /// Unlock `token`. Any integration approved by the current owner may
    /// unlock, not only the one that locked.
    pub fn unlock(&self, token: TokenId, caller: &Identity) -> Result<(), CreditError> {
        let cell = self.records.cell(token)?;
        let mut guard = write_cell(&cell);
        let owner = self.current_owner(&mut guard)?;
        self.require_approved(&owner, caller)?;

        let previous = guard.lock.clear();
        self.events.emit(&CreditEvent::RecordUnlocked {
            token,
            by: caller.clone(),
        });
        tracing::info!(
            %token,
            %owner,
            by = %caller,
            was_locked = previous.is_some(),
            "credit record unlocked"
        );
        Ok(())
    }

    pub fn is_locked(&self, token: TokenId) -> Result<bool, CreditError> {
        let cell = self.records.cell(token)?;
        let guard = read_cell(&cell);
        Ok(guard.lock.is_locked(self.clock.now(), self.params.max_lock_secs))
    }

    fn require_approved(&self, owner: &Identity, caller: &Identity) -> Result<(), CreditError> {
        if self.read_approvals().is_approved(owner, caller) {
            return Ok(());
        }
        tracing::debug!(%owner, %caller, "lock change rejected: caller not approved");
        Err(CreditError::NotApproved {
            owner: owner.clone(),
            integration: caller.clone(),
        })
    }

    // ── Treasury ───────────────────────────────────────────────────────

    /// Drain collected payments to the administrator.
    pub fn withdraw(&self, caller: &Identity) -> Result<Amount, CreditError> {
        let amount = self.lock_treasury().withdraw(caller).map_err(|err| {
            tracing::debug!(%caller, "withdrawal rejected: {err}");
            err
        })?;
        self.events.emit(&CreditEvent::FundsWithdrawn {
            to: caller.clone(),
            amount,
        });
        tracing::info!(to = %caller, %amount, "treasury withdrawn");
        Ok(amount)
    }

    pub fn treasury_balance(&self) -> Amount {
        self.lock_treasury().balance()
    }

    // ── Persistence ────────────────────────────────────────────────────

    /// Capture the full engine state as one consistent cut.
    ///
    /// The treasury is held throughout so no record is created mid-capture.
    /// Every record cell is read-locked in token order and stays held while
    /// the approval and rate-limit maps are read, so an adjustment is either
    /// fully in the snapshot or not at all.
    pub fn snapshot(&self) -> Result<CreditSnapshot, CreditError> {
        let treasury = self.lock_treasury();
        let cells = self.records.cells();
        let guards: Vec<_> = cells.iter().map(|cell| read_cell(cell)).collect();
        let records = guards
            .iter()
            .map(|guard| RecordSnapshot {
                record: guard.record.clone(),
                lock: guard.lock.clone(),
            })
            .collect();
        let approvals = self.read_approvals().entries();
        let rate_limits = self
            .read_rate_limits()
            .entries()
            .into_iter()
            .map(|(integration, owner, last_update)| RateLimitEntry {
                integration,
                owner,
                last_update,
            })
            .collect();
        let body = SnapshotBody {
            records,
            approvals,
            rate_limits,
            treasury_balance: treasury.balance(),
        };
        drop(guards);
        drop(treasury);
        CreditSnapshot::create(body, self.clock.now())
    }

    /// Load a snapshot into an empty service. The registry must hold exactly
    /// the snapshot's tokens with the same owners; nothing is loaded if any
    /// check fails.
    pub fn restore(&self, snapshot: &CreditSnapshot) -> Result<(), CreditError> {
        snapshot.verify()?;
        if !self.records.is_empty() {
            return Err(CreditError::Snapshot(
                "restore requires a service without records".to_string(),
            ));
        }
        let supply = self.registry.total_supply()?;
        if supply != snapshot.body.records.len() as u64 {
            return Err(CreditError::Snapshot(format!(
                "registry has {supply} tokens but the snapshot has {} records",
                snapshot.body.records.len()
            )));
        }
        for entry in &snapshot.body.records {
            let token = entry.record.token;
            let owner = self.registry.owner_of(token)?;
            if owner != entry.record.owner {
                return Err(CreditError::Snapshot(format!(
                    "record {token} belongs to {} in the snapshot but to {owner} in the registry",
                    entry.record.owner
                )));
            }
        }

        for entry in &snapshot.body.records {
            self.records
                .insert_restored(entry.record.clone(), entry.lock.clone());
        }
        *self.write_approvals() = ApprovalRegistry::from_entries(snapshot.body.approvals.clone());
        *self.write_rate_limits() = snapshot
            .body
            .rate_limits
            .iter()
            .map(|e| (e.integration.clone(), e.owner.clone(), e.last_update))
            .collect();
        self.lock_treasury()
            .restore_balance(snapshot.body.treasury_balance);

        tracing::info!(
            records = snapshot.body.records.len(),
            owners_with_approvals = snapshot.body.approvals.len(),
            rate_limits = snapshot.body.rate_limits.len(),
            created_at = %snapshot.created_at,
            "credit state restored"
        );
        Ok(())
    }

    // ── Internals ──────────────────────────────────────────────────────

    /// Owner of the record in `cell` according to the registry, refreshing
    /// the record's mirror if it drifted.
    fn current_owner(&self, cell: &mut RecordCell) -> Result<Identity, CreditError> {
        let token = cell.record.token;
        let owner = self.registry.owner_of(token).map_err(|err| {
            tracing::warn!(%token, "ownership lookup failed: {err}");
            CreditError::from(err)
        })?;
        if owner != cell.record.owner {
            tracing::warn!(
                %token,
                mirror = %cell.record.owner,
                registry = %owner,
                "owner mirror out of date, refreshing"
            );
            cell.record.owner = owner.clone();
        }
        Ok(owner)
    }

    /// Run `f` holding `owner`'s record cell, or with `None` if the owner
    /// has no record. Retries if the record changes hands between lookup
    /// and lock.
    fn with_owner_cell<T>(
        &self,
        owner: &Identity,
        f: impl FnOnce(Option<&mut RecordCell>) -> Result<T, CreditError>,
    ) -> Result<T, CreditError> {
        for _ in 0..OWNER_LOOKUP_ATTEMPTS {
            let cell = match self.registry.token_of(owner)? {
                Some(token) => self.records.cell(token).ok(),
                None => None,
            };
            let Some(cell) = cell else {
                return f(None);
            };
            let mut guard = write_cell(&cell);
            if &self.current_owner(&mut guard)? == owner {
                return f(Some(&mut *guard));
            }
        }
        tracing::warn!(%owner, "registry keeps disagreeing about the owner's token");
        Err(CreditError::Ownership(OwnershipError::Backend(format!(
            "token_of and owner_of disagree for {owner}"
        ))))
    }

    fn read_approvals(&self) -> RwLockReadGuard<'_, ApprovalRegistry> {
        self.approvals.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_approvals(&self) -> RwLockWriteGuard<'_, ApprovalRegistry> {
        self.approvals.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_rate_limits(&self) -> RwLockReadGuard<'_, RateLimitTracker> {
        self.rate_limits.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_rate_limits(&self) -> RwLockWriteGuard<'_, RateLimitTracker> {
        self.rate_limits.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_treasury(&self) -> MutexGuard<'_, Treasury> {
        self.treasury.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for CreditService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreditService")
            .field("params", &self.params)
            .field("records", &self.records.len())
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}
