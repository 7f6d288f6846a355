//! Run command implementation.
//!
//! Polls registries on the configured cadence until Ctrl-C.

use anyhow::{Context, Result};
use tagwatch_watcher::Watcher;

use super::GlobalArgs;

/// Executes the run command.
pub async fn execute(global: &GlobalArgs) -> Result<()> {
    let config = global.load_config()?;
    let watcher = Watcher::open(config)
        .await
        .context("Failed to start watcher")?;

    let stats = watcher.run_until(shutdown_signal()).await;

    tracing::info!(
        completed = stats.completed,
        errored = stats.errored,
        "watcher stopped"
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
