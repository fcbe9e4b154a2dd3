//! Service snapshots — the full engine state at a point in time.
//!
//! A snapshot is bincode-encoded and carries a Blake2b-256 hash of its body,
//! so a truncated or hand-edited file is rejected on load instead of
//! silently restoring a corrupted score history.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use credscore_types::{Amount, Identity, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::CreditError;
use crate::lock::LockState;
use crate::record::CreditRecord;

/// Current on-disk format version.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    pub record: CreditRecord,
    pub lock: LockState,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitEntry {
    pub integration: Identity,
    pub owner: Identity,
    pub last_update: Timestamp,
}

/// Hashed portion of a snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotBody {
    /// Records sorted by token.
    pub records: Vec<RecordSnapshot>,
    /// Approval lists per owner, sorted by owner, in enumeration order.
    pub approvals: Vec<(Identity, Vec<Identity>)>,
    pub rate_limits: Vec<RateLimitEntry>,
    pub treasury_balance: Amount,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditSnapshot {
    pub version: u32,
    pub created_at: Timestamp,
    pub body: SnapshotBody,
    /// Blake2b-256 of the bincode-encoded body.
    pub hash: [u8; 32],
}

impl CreditSnapshot {
    pub fn create(body: SnapshotBody, created_at: Timestamp) -> Result<Self, CreditError> {
        let hash = Self::compute_hash(&body)?;
        Ok(Self {
            version: SNAPSHOT_VERSION,
            created_at,
            body,
            hash,
        })
    }

    fn compute_hash(body: &SnapshotBody) -> Result<[u8; 32], CreditError> {
        let bytes = bincode::serialize(body).map_err(|e| CreditError::Snapshot(e.to_string()))?;
        let mut hasher = Blake2b::<U32>::new();
        hasher.update(&bytes);
        Ok(hasher.finalize().into())
    }

    /// Check version and integrity hash.
    pub fn verify(&self) -> Result<(), CreditError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(CreditError::Snapshot(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                self.version
            )));
        }
        if Self::compute_hash(&self.body)? != self.hash {
            return Err(CreditError::Snapshot("integrity hash mismatch".to_string()));
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CreditError> {
        bincode::serialize(self).map_err(|e| CreditError::Snapshot(e.to_string()))
    }

    /// Decode and verify.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CreditError> {
        let snapshot: Self =
            bincode::deserialize(bytes).map_err(|e| CreditError::Snapshot(e.to_string()))?;
        snapshot.verify()?;
        Ok(snapshot)
    }
}
