//! Cloudpipe data transfer service
//!
//! A stateless worker that claims transfer tasks from the API and copies
//! files or directory trees between local and mounted locations.

mod config;
mod copy;
mod poller;

use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::poller::TransferPoller;
use cloudpipe_client::ApiClient;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cloudpipe_dts=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Cloudpipe transfer service");

    let config = load_config()?;
    info!(
        "Loaded configuration: runner_id={}, api_url={}, max_parallel_transfers={}",
        config.runner_id, config.api_url, config.max_parallel_transfers
    );

    let client = Arc::new(ApiClient::new(config.api_url.clone()));
    let poller = TransferPoller::new(config, client);

    if let Err(e) = poller.run().await {
        error!("Poller error: {}", e);
        return Err(e);
    }

    Ok(())
}

/// Loads configuration from environment variables with fallback to defaults
fn load_config() -> Result<Config> {
    match Config::from_env() {
        Ok(config) => {
            config.validate()?;
            Ok(config)
        }
        Err(e) => {
            info!("{}, using default configuration", e);
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}
