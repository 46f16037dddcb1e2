//! Cloudpipe billing agent
//!
//! Turns pipeline runs and data storages into per-day billing documents and
//! indexes them into Elasticsearch.
//!
//! - Pricing: cloud price lists (AWS, Azure, GCP) behind a refreshing cache
//! - Converter: runs and storages to billing documents
//! - Elastic: index template and bulk indexing
//! - Sync: the fixed-delay loop tying them together

mod config;
mod converter;
mod elastic;
mod error;
mod pricing;
mod sync;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, PriceProvider};
use crate::elastic::ElasticWriter;
use crate::pricing::{
    AwsPriceListLoader, AzureRateCardLoader, GcpBillingLoader, PriceCache, PriceLoader,
};
use crate::sync::BillingSync;
use cloudpipe_client::ApiClient;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cloudpipe_billing=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Cloudpipe billing agent");

    let config = Config::from_env()?;
    config.validate()?;
    info!(
        "Loaded configuration: api_url={}, elastic_url={}, provider={:?}",
        config.api_url, config.elastic_url, config.price_provider
    );

    let loader = price_loader(&config)?;
    let prices = PriceCache::new(loader, config.price_refresh_interval);
    info!(
        "Using {} prices (refresh every {:?})",
        prices.provider(),
        config.price_refresh_interval
    );

    let writer = ElasticWriter::new(config.elastic_url.clone(), config.index_prefix.clone());
    ensure_template_with_retry(&writer).await?;

    let client = Arc::new(ApiClient::new(config.api_url.clone()));
    let sync = BillingSync::new(
        client,
        writer,
        prices,
        config.price_provider == PriceProvider::Aws,
        config.sync_interval,
        config.billing_start_date,
    );

    sync.run().await;
    Ok(())
}

fn price_loader(config: &Config) -> Result<Arc<dyn PriceLoader>> {
    let first_url = || {
        config
            .price_urls
            .first()
            .cloned()
            .context("PRICE_URL is not set")
    };

    let loader: Arc<dyn PriceLoader> = match config.price_provider {
        PriceProvider::Aws => Arc::new(AwsPriceListLoader::new(config.price_urls.clone())),
        PriceProvider::Azure => Arc::new(AzureRateCardLoader::new(
            first_url()?,
            config.azure_access_token.clone(),
        )),
        PriceProvider::Gcp => Arc::new(GcpBillingLoader::new(
            first_url()?,
            config.gcp_api_key.clone(),
        )),
    };

    Ok(loader)
}

/// Install the index template, waiting for Elasticsearch to come up
async fn ensure_template_with_retry(writer: &ElasticWriter) -> Result<()> {
    const MAX_RETRIES: u32 = 10;
    const INITIAL_DELAY_MS: u64 = 500;
    const MAX_DELAY_MS: u64 = 30_000;

    let mut attempt = 0;
    let mut delay_ms = INITIAL_DELAY_MS;

    loop {
        attempt += 1;

        match writer.ensure_template().await {
            Ok(()) => return Ok(()),
            Err(e) if attempt >= MAX_RETRIES => {
                error!("Elasticsearch unavailable after {} attempts", MAX_RETRIES);
                return Err(anyhow::anyhow!("Failed to install index template: {}", e));
            }
            Err(e) => {
                warn!(
                    "Failed to install index template (attempt {}/{}): {}",
                    attempt, MAX_RETRIES, e
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                delay_ms = (delay_ms * 2).min(MAX_DELAY_MS);
            }
        }
    }
}
