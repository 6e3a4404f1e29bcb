//! # feedbus runtime
//!
//! The distributor executable.
//!
//! Configuration comes from the JSON file named by `FEEDBUS_CONFIG` (or
//! defaults when unset), then from the `FEEDBUS_*` environment overrides.
//! Logging is controlled by `RUST_LOG` and defaults to `info`.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use feedbus_distributor::{DistributorConfig, NullStreamSecurity, Server};

/// Load configuration from the environment and an optional file.
fn load_config() -> Result<DistributorConfig> {
    let mut config = match std::env::var("FEEDBUS_CONFIG") {
        Ok(path) => DistributorConfig::from_file(&path)
            .with_context(|| format!("failed to load configuration from {path}"))?,
        Err(_) => DistributorConfig::default(),
    };
    config.apply_env_overrides();
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config()?;
    let server = Server::start(config, Arc::new(NullStreamSecurity))
        .await
        .context("failed to start the distributor")?;

    info!(addr = %server.local_addr(), "distributor is running, press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;

    info!("shutting down");
    server.shutdown();

    Ok(())
}
