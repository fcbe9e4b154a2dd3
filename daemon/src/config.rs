//! Daemon configuration with TOML file support.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use credscore_types::{CreditParams, Identity};
use credscore_utils::LogFormat;
use serde::{Deserialize, Serialize};

use crate::error::DaemonError;

/// Configuration for a credscore daemon.
///
/// Loaded from a TOML file via [`DaemonConfig::from_toml_file`]; every field
/// has a default so a partial (or empty) file is valid.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Address the HTTP API binds to.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Directory holding the ledger and credit snapshots.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Identity allowed to withdraw collected payments.
    #[serde(default = "default_treasury_admin")]
    pub treasury_admin: Identity,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Seconds between background snapshots; 0 disables them.
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval_secs: u64,

    /// Scoring protocol parameters.
    #[serde(default)]
    pub params: CreditParams,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 7480))
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./credscore_data")
}

fn default_treasury_admin() -> Identity {
    Identity::new("treasury")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_snapshot_interval() -> u64 {
    300
}

// ── Impl ───────────────────────────────────────────────────────────────

impl DaemonConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, DaemonError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DaemonError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string and validate the parameters.
    pub fn from_toml_str(s: &str) -> Result<Self, DaemonError> {
        let config: Self = toml::from_str(s).map_err(|e| DaemonError::Config(e.to_string()))?;
        config
            .params
            .validate()
            .map_err(|e| DaemonError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, DaemonError> {
        toml::to_string_pretty(self).map_err(|e| DaemonError::Config(e.to_string()))
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            data_dir: default_data_dir(),
            treasury_admin: default_treasury_admin(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            snapshot_interval_secs: default_snapshot_interval(),
            params: CreditParams::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = DaemonConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = DaemonConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.listen, config.listen);
        assert_eq!(parsed.params, config.params);
        assert_eq!(parsed.treasury_admin, config.treasury_admin);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = DaemonConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.listen.port(), 7480);
        assert_eq!(config.log_format, LogFormat::Human);
        assert_eq!(config.params.cooldown_secs, 86_400);
        assert_eq!(config.params.max_lock_secs, None);
    }

    #[test]
    fn partial_params_table_overrides() {
        let toml = r#"
            log_format = "json"
            treasury_admin = "ops"

            [params]
            cooldown_secs = 3600
            max_lock_secs = 604800
            record_price = "250"
        "#;
        let config = DaemonConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.treasury_admin, Identity::new("ops"));
        assert_eq!(config.params.cooldown_secs, 3600);
        assert_eq!(config.params.max_lock_secs, Some(604_800));
        assert_eq!(config.params.record_price.raw(), 250);
        assert_eq!(config.params.max_delta, 10); // default
    }

    #[test]
    fn inconsistent_params_rejected() {
        let toml = r#"
            [params]
            min_score = 900
            max_score = 350
        "#;
        assert!(matches!(
            DaemonConfig::from_toml_str(toml),
            Err(DaemonError::Config(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "listen = \"0.0.0.0:9000\"").unwrap();
        let config = DaemonConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.listen.port(), 9000);
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = DaemonConfig::from_toml_file(Path::new("/nonexistent/credscore.toml"));
        assert!(matches!(result, Err(DaemonError::Config(_))));
    }
}
