//! Transfer runner configuration

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Identifier recorded on claimed transfers
    pub runner_id: String,

    /// Cloudpipe API base URL (e.g., "http://localhost:8080")
    pub api_url: String,

    /// How often to look for created transfers
    pub poll_interval: Duration,

    /// Transfers copied at the same time
    pub max_parallel_transfers: usize,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(runner_id: String, api_url: String) -> Self {
        Self {
            runner_id,
            api_url,
            poll_interval: Duration::from_secs(5),
            max_parallel_transfers: 4,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// - RUNNER_ID (required)
    /// - API_URL (required)
    /// - POLL_INTERVAL (optional, seconds, default: 5)
    /// - MAX_PARALLEL_TRANSFERS (optional, default: 4)
    pub fn from_env() -> anyhow::Result<Self> {
        let runner_id = std::env::var("RUNNER_ID")
            .map_err(|_| anyhow::anyhow!("RUNNER_ID environment variable not set"))?;

        let api_url = std::env::var("API_URL")
            .map_err(|_| anyhow::anyhow!("API_URL environment variable not set"))?;

        let poll_interval = std::env::var("POLL_INTERVAL")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(5));

        let max_parallel_transfers = std::env::var("MAX_PARALLEL_TRANSFERS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(4);

        Ok(Self {
            runner_id,
            api_url,
            poll_interval,
            max_parallel_transfers,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.runner_id.is_empty() {
            anyhow::bail!("runner_id cannot be empty");
        }

        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            anyhow::bail!("api_url must start with http:// or https://");
        }

        if self.poll_interval.as_secs() == 0 {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.max_parallel_transfers == 0 {
            anyhow::bail!("max_parallel_transfers must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(
            format!("dts-{}", uuid::Uuid::new_v4()),
            "http://localhost:8080".to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.runner_id.starts_with("dts-"));
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.max_parallel_transfers = 0;
        assert!(config.validate().is_err());
        config.max_parallel_transfers = 1;

        config.api_url = "localhost:8080".to_string();
        assert!(config.validate().is_err());

        config.api_url = "https://cloudpipe.example.com".to_string();
        assert!(config.validate().is_ok());
    }
}
