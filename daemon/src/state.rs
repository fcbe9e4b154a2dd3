//! On-disk state: the token ledger image and the credit snapshot.
//!
//! Both files live in the data directory and are replaced atomically
//! (write to a temporary file, then rename).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use credscore_engine::{CreditService, CreditSnapshot};
use credscore_ownership::{TokenLedger, TokenLedgerSnapshot};

use crate::error::DaemonError;

const LEDGER_FILE: &str = "ledger.bin";
const CREDIT_FILE: &str = "credit.snapshot";

/// Attempts at capturing a ledger image and credit snapshot that agree on
/// every record's owner while transfers are still being served.
const CAPTURE_ATTEMPTS: usize = 3;

pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    /// Open (creating if needed) the data directory.
    pub fn open(dir: &Path) -> Result<Self, DaemonError> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn ledger_path(&self) -> PathBuf {
        self.dir.join(LEDGER_FILE)
    }

    fn credit_path(&self) -> PathBuf {
        self.dir.join(CREDIT_FILE)
    }

    /// Load the token ledger, or start an empty one on first run.
    pub fn load_ledger(&self) -> Result<TokenLedger, DaemonError> {
        let path = self.ledger_path();
        let Some(bytes) = read_optional(&path)? else {
            tracing::info!(path = %path.display(), "no ledger file, starting empty");
            return Ok(TokenLedger::new());
        };
        let snapshot: TokenLedgerSnapshot =
            bincode::deserialize(&bytes).map_err(|e| state_error(&path, e))?;
        let tokens = snapshot.entries.len();
        let ledger = TokenLedger::from_snapshot(snapshot)?;
        tracing::info!(path = %path.display(), tokens, "token ledger loaded");
        Ok(ledger)
    }

    /// Load the credit snapshot if one was saved.
    pub fn load_credit(&self) -> Result<Option<CreditSnapshot>, DaemonError> {
        let path = self.credit_path();
        match read_optional(&path)? {
            Some(bytes) => Ok(Some(CreditSnapshot::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Persist both files from a consistent capture.
    pub fn save(&self, ledger: &TokenLedger, service: &CreditService) -> Result<(), DaemonError> {
        let (ledger_image, credit) = capture(ledger, service)?;
        let ledger_bytes =
            bincode::serialize(&ledger_image).map_err(|e| state_error(&self.ledger_path(), e))?;
        write_atomic(&self.ledger_path(), &ledger_bytes)?;
        write_atomic(&self.credit_path(), &credit.to_bytes()?)?;
        tracing::info!(
            dir = %self.dir.display(),
            records = credit.body.records.len(),
            "state saved"
        );
        Ok(())
    }
}

fn capture(
    ledger: &TokenLedger,
    service: &CreditService,
) -> Result<(TokenLedgerSnapshot, CreditSnapshot), DaemonError> {
    for _ in 0..CAPTURE_ATTEMPTS {
        let image = ledger.snapshot();
        let credit = service.snapshot()?;
        let owners: HashMap<_, _> = image.entries.iter().cloned().collect();
        let consistent = credit
            .body
            .records
            .iter()
            .all(|r| owners.get(&r.record.token) == Some(&r.record.owner));
        if consistent {
            return Ok((image, credit));
        }
        tracing::debug!("ledger changed during capture, retrying");
    }
    Err(DaemonError::Capture(
        "ledger kept changing under concurrent transfers".to_string(),
    ))
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, DaemonError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), DaemonError> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn state_error(path: &Path, err: impl std::fmt::Display) -> DaemonError {
    DaemonError::StateFile {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credscore_engine::SystemClock;
    use credscore_types::{CreditParams, Identity, ScoreDelta, Timestamp};
    use std::sync::Arc;

    fn service(ledger: Arc<TokenLedger>) -> CreditService {
        CreditService::new(
            CreditParams::default(),
            ledger,
            Arc::new(SystemClock),
            Identity::new("treasury"),
        )
        .unwrap()
    }

    #[test]
    fn first_run_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::open(&dir.path().join("nested")).unwrap();
        assert!(store.load_credit().unwrap().is_none());
        assert_eq!(store.load_ledger().unwrap().snapshot().entries.len(), 0);
    }

    #[test]
    fn save_then_load_restores_everything() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::open(dir.path()).unwrap();

        let ledger = Arc::new(TokenLedger::new());
        let svc = service(ledger.clone());
        let alice = Identity::new("alice");
        let lender = Identity::new("lender");
        let token = svc.create_record(&alice, svc.params().record_price).unwrap();
        svc.grant_approval(&alice, &lender).unwrap();
        svc.adjust_score(token, &lender, ScoreDelta::new(6), Timestamp::new(5))
            .unwrap();
        store.save(&ledger, &svc).unwrap();

        let restored_ledger = Arc::new(store.load_ledger().unwrap());
        let restored = service(restored_ledger);
        restored
            .restore(&store.load_credit().unwrap().unwrap())
            .unwrap();
        assert_eq!(restored.record(token).unwrap(), svc.record(token).unwrap());
        assert_eq!(restored.treasury_balance(), svc.treasury_balance());
    }

    #[test]
    fn corrupt_ledger_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(LEDGER_FILE), b"\x01").unwrap();
        let store = StateStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.load_ledger(),
            Err(DaemonError::StateFile { .. })
        ));
    }
}
