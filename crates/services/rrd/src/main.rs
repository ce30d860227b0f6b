//! RR Daemon (rrd)
//!
//! Serves run reports over HTTP:
//!
//! - **API Server**: report generation, report URLs, per-project listings and cleanup
//! - **Artifact Server**: the generated static reports under `/reports`
//! - **Retention**: periodic removal of old artifacts, when configured
//!
//! Runs and scripts live in external services reached over HTTP.

use std::sync::Arc;

use clap::Parser;
use rr_config::RrConfig;
use rr_engine::{engine::ReportEngine, index::FsLedgerStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    api::setup_api,
    cli::Cli,
    collaborators::{HttpRunManager, HttpScriptDirectory},
    prelude::*,
    retention::setup_retention,
};

mod api;
mod cli;
mod collaborators;
mod error;
mod prelude;
mod retention;

/// Main entry point for the RR daemon.
///
/// Initializes logging, loads the configuration, prepares the storage
/// directories and starts the API server and the retention task.
///
/// # Examples
///
/// ```bash
/// export RR_RUN_URL=http://127.0.0.1:4000/v1
/// rrd --config rr.toml
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=debug,tower_http=debug", env!("CARGO_CRATE_NAME")).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = RrConfig::load(cli.config.as_deref())?;
    config.storage.ensure_dirs()?;

    let runs = HttpRunManager::new(&config.collaborators.run_url)?;
    let scripts = HttpScriptDirectory::new(&config.collaborators.script_url)?;
    let store = FsLedgerStore::open(&config.storage.index_dir)?;
    let engine = Arc::new(ReportEngine::from_config(&config, runs, scripts, store));

    let api_handle = setup_api(engine.clone(), config.server.bind).await?;
    let retention_handle = setup_retention(engine, &config.retention);
    let retention = async move {
        match retention_handle {
            Some(handle) => handle.await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        result = api_handle => {
            tracing::error!("API server stopped: {:?}", result);
        }
        result = retention => {
            tracing::error!("Retention task stopped: {:?}", result);
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }

    Ok(())
}
