use credscore_engine::CreditError;
use credscore_ownership::OwnershipError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("config error: {0}")]
    Config(String),

    #[error("state file {path}: {reason}")]
    StateFile { path: String, reason: String },

    #[error("snapshot capture failed: {0}")]
    Capture(String),

    #[error("credit engine: {0}")]
    Credit(#[from] CreditError),

    #[error("token ledger: {0}")]
    Ledger(#[from] OwnershipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
