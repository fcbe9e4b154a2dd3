//! credscore daemon — entry point for serving the credit-score API.

mod config;
mod error;
mod shutdown;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use credscore_engine::{CreditService, SystemClock};
use credscore_ownership::TokenLedger;
use credscore_rpc::RpcServer;
use credscore_types::Identity;
use credscore_utils::{init_logging, LogFormat};

use crate::config::DaemonConfig;
use crate::state::StateStore;

#[derive(Parser)]
#[command(name = "credscore-daemon", about = "Credit-score record service")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "CREDSCORE_CONFIG")]
    config: Option<PathBuf>,

    /// Address for the HTTP API.
    #[arg(long, env = "CREDSCORE_LISTEN")]
    listen: Option<SocketAddr>,

    /// Data directory for the ledger and credit snapshots.
    #[arg(long, env = "CREDSCORE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Identity allowed to withdraw collected payments.
    #[arg(long, env = "CREDSCORE_ADMIN")]
    admin: Option<Identity>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "CREDSCORE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "CREDSCORE_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Serve the HTTP API until SIGINT/SIGTERM.
    Run,
    /// Print the effective configuration as TOML and exit.
    DefaultConfig,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<(DaemonConfig, Command)> {
        let mut config = match &self.config {
            Some(path) => DaemonConfig::from_toml_file(path)?,
            None => DaemonConfig::default(),
        };
        if let Some(listen) = self.listen {
            config.listen = listen;
        }
        if let Some(data_dir) = self.data_dir {
            config.data_dir = data_dir;
        }
        if let Some(admin) = self.admin {
            config.treasury_admin = admin;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        Ok((config, self.command))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config, command) = Cli::parse().into_config()?;

    match command {
        Command::DefaultConfig => {
            print!("{}", config.to_toml_string()?);
        }
        Command::Run => {
            init_logging(config.log_format, &config.log_level);
            run(config).await?;
        }
    }
    Ok(())
}

async fn run(config: DaemonConfig) -> anyhow::Result<()> {
    tracing::info!(
        listen = %config.listen,
        data_dir = %config.data_dir.display(),
        admin = %config.treasury_admin,
        "starting credscore daemon"
    );

    let store = Arc::new(StateStore::open(&config.data_dir)?);
    let ledger = Arc::new(store.load_ledger()?);
    let mut service = CreditService::new(
        config.params.clone(),
        ledger.clone(),
        Arc::new(SystemClock),
        config.treasury_admin.clone(),
    )?;
    service.subscribe(Box::new(|event| match serde_json::to_string(event) {
        Ok(json) => tracing::debug!(target: "credscore::events", "{json}"),
        Err(e) => tracing::warn!("failed to encode event: {e}"),
    }));
    if let Some(snapshot) = store.load_credit()? {
        service.restore(&snapshot)?;
    }
    let service = Arc::new(service);

    let autosave = (config.snapshot_interval_secs > 0).then(|| {
        spawn_autosave(
            Arc::clone(&store),
            Arc::clone(&ledger),
            Arc::clone(&service),
            Duration::from_secs(config.snapshot_interval_secs),
        )
    });

    RpcServer::new(config.listen, Arc::clone(&service))
        .serve(shutdown::shutdown_signal())
        .await?;

    if let Some(handle) = autosave {
        handle.abort();
    }
    store.save(&ledger, &service)?;
    tracing::info!("credscore daemon exited cleanly");
    Ok(())
}

fn spawn_autosave(
    store: Arc<StateStore>,
    ledger: Arc<TokenLedger>,
    service: Arc<CreditService>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick fires immediately; nothing has changed yet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let (store, ledger, service) =
                (Arc::clone(&store), Arc::clone(&ledger), Arc::clone(&service));
            let saved =
                tokio::task::spawn_blocking(move || store.save(&ledger, &service)).await;
            match saved {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!("background snapshot failed: {e}"),
                Err(e) => tracing::warn!("background snapshot task panicked: {e}"),
            }
        }
    })
}
