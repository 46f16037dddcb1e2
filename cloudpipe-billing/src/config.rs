//! Billing agent configuration
//!
//! Read from environment variables with defaults suited to a local setup.

use chrono::NaiveDate;
use std::time::Duration;

/// Where cloud prices come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceProvider {
    Aws,
    Azure,
    Gcp,
}

impl PriceProvider {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aws" => Some(PriceProvider::Aws),
            "azure" => Some(PriceProvider::Azure),
            "gcp" => Some(PriceProvider::Gcp),
            _ => None,
        }
    }

    /// Price list locations used when PRICE_URL is not set
    pub fn default_price_urls(&self) -> Vec<String> {
        match self {
            PriceProvider::Aws => vec![
                "https://pricing.us-east-1.amazonaws.com/offers/v1.0/aws/AmazonEC2/current/us-east-1/index.json".to_string(),
                "https://pricing.us-east-1.amazonaws.com/offers/v1.0/aws/AmazonS3/current/us-east-1/index.json".to_string(),
            ],
            // The rate card URL embeds the subscription, there is no usable default
            PriceProvider::Azure => vec![],
            PriceProvider::Gcp => vec![
                "https://cloudbilling.googleapis.com/v1/services/95FF-2EF5-5EA1/skus".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Cloudpipe API base URL
    pub api_url: String,

    /// Elasticsearch base URL
    pub elastic_url: String,

    /// Prefix of billing index names and of the index template
    pub index_prefix: String,

    /// Delay between billing cycles
    pub sync_interval: Duration,

    /// Age after which cached prices are reloaded
    pub price_refresh_interval: Duration,

    pub price_provider: PriceProvider,

    /// Price list URLs (AWS accepts several offer files)
    pub price_urls: Vec<String>,

    /// API key for the GCP Cloud Billing catalog
    pub gcp_api_key: Option<String>,

    /// Bearer token for the Azure rate card
    pub azure_access_token: Option<String>,

    /// First day to bill when nothing has been synced yet (default: yesterday)
    pub billing_start_date: Option<NaiveDate>,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// - API_URL (default: http://localhost:8080)
    /// - ELASTIC_URL (default: http://localhost:9200)
    /// - BILLING_INDEX_PREFIX (default: cp-billing)
    /// - SYNC_INTERVAL (seconds, default: 3600)
    /// - PRICE_REFRESH_INTERVAL (seconds, default: 86400)
    /// - PRICE_PROVIDER (aws | azure | gcp, default: aws)
    /// - PRICE_URL (comma separated, default depends on provider)
    /// - GCP_API_KEY, AZURE_ACCESS_TOKEN (optional)
    /// - BILLING_START_DATE (YYYY-MM-DD, optional)
    pub fn from_env() -> anyhow::Result<Self> {
        let api_url =
            std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());

        let elastic_url =
            std::env::var("ELASTIC_URL").unwrap_or_else(|_| "http://localhost:9200".to_string());

        let index_prefix =
            std::env::var("BILLING_INDEX_PREFIX").unwrap_or_else(|_| "cp-billing".to_string());

        let sync_interval = duration_var("SYNC_INTERVAL", 3600);
        let price_refresh_interval = duration_var("PRICE_REFRESH_INTERVAL", 86_400);

        let price_provider = match std::env::var("PRICE_PROVIDER") {
            Ok(value) => PriceProvider::parse(&value)
                .ok_or_else(|| anyhow::anyhow!("Unknown PRICE_PROVIDER: {}", value))?,
            Err(_) => PriceProvider::Aws,
        };

        let price_urls = match std::env::var("PRICE_URL") {
            Ok(value) => split_urls(&value),
            Err(_) => price_provider.default_price_urls(),
        };

        let billing_start_date = match std::env::var("BILLING_START_DATE") {
            Ok(value) => Some(
                NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| {
                    anyhow::anyhow!("BILLING_START_DATE must be YYYY-MM-DD ({}): {}", value, e)
                })?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            api_url,
            elastic_url,
            index_prefix,
            sync_interval,
            price_refresh_interval,
            price_provider,
            price_urls,
            gcp_api_key: std::env::var("GCP_API_KEY").ok(),
            azure_access_token: std::env::var("AZURE_ACCESS_TOKEN").ok(),
            billing_start_date,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, url) in [("api_url", &self.api_url), ("elastic_url", &self.elastic_url)] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("{} must start with http:// or https://", name);
            }
        }

        if self.index_prefix.is_empty() || self.index_prefix != self.index_prefix.to_lowercase() {
            anyhow::bail!("index_prefix must be a non-empty lowercase name");
        }

        if self.sync_interval.as_secs() == 0 {
            anyhow::bail!("sync_interval must be greater than 0");
        }

        if self.price_refresh_interval.as_secs() == 0 {
            anyhow::bail!("price_refresh_interval must be greater than 0");
        }

        if self.price_urls.is_empty() {
            anyhow::bail!("PRICE_URL is required for provider {:?}", self.price_provider);
        }

        if self.price_provider == PriceProvider::Gcp && self.gcp_api_key.is_none() {
            anyhow::bail!("GCP_API_KEY is required for the gcp price provider");
        }

        Ok(())
    }
}

fn duration_var(name: &str, default_secs: u64) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(default_secs))
}

fn split_urls(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> Config {
        Config {
            api_url: "http://localhost:8080".to_string(),
            elastic_url: "http://localhost:9200".to_string(),
            index_prefix: "cp-billing".to_string(),
            sync_interval: Duration::from_secs(3600),
            price_refresh_interval: Duration::from_secs(86_400),
            price_provider: PriceProvider::Aws,
            price_urls: PriceProvider::Aws.default_price_urls(),
            gcp_api_key: None,
            azure_access_token: None,
            billing_start_date: None,
        }
    }

    #[test]
    fn test_sample_config_is_valid() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = sample_config();
        config.elastic_url = "localhost:9200".to_string();
        assert!(config.validate().is_err());

        let mut config = sample_config();
        config.index_prefix = "CP-Billing".to_string();
        assert!(config.validate().is_err());

        let mut config = sample_config();
        config.price_provider = PriceProvider::Gcp;
        config.price_urls = PriceProvider::Gcp.default_price_urls();
        assert!(config.validate().is_err());
        config.gcp_api_key = Some("key".to_string());
        assert!(config.validate().is_ok());

        let mut config = sample_config();
        config.price_provider = PriceProvider::Azure;
        config.price_urls = PriceProvider::Azure.default_price_urls();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_provider_and_urls() {
        assert_eq!(PriceProvider::parse("AWS"), Some(PriceProvider::Aws));
        assert_eq!(PriceProvider::parse("gcp"), Some(PriceProvider::Gcp));
        assert_eq!(PriceProvider::parse("oracle"), None);

        assert_eq!(
            split_urls("http://a/ec2.json, http://a/s3.json,"),
            vec!["http://a/ec2.json", "http://a/s3.json"]
        );
    }
}
