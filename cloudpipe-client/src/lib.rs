//! Cloudpipe HTTP Client
//!
//! A type-safe HTTP client for the Cloudpipe API server, shared by the CLI,
//! the billing agent and the transfer runner.
//!
//! # Example
//!
//! ```no_run
//! use cloudpipe_client::ApiClient;
//!
//! #[tokio::main]
//! async fn main() -> cloudpipe_client::Result<()> {
//!     let client = ApiClient::new("http://localhost:8080");
//!
//!     for pipeline in client.list_pipelines().await? {
//!         println!("{} {}", pipeline.id, pipeline.name);
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
mod folders;
mod offers;
mod pipelines;
mod runs;
mod schedules;
mod storages;
mod transfers;

// Re-export commonly used types
pub use error::{ClientError, Result};

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for the Cloudpipe API
///
/// Methods are grouped by resource:
/// - Folders and pipelines (including pipeline sources)
/// - Runs and run schedules
/// - Instance offers and data storages
/// - Transfer tasks
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// Base URL of the API server (e.g., "http://localhost:8080")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl ApiClient {
    /// Create a new client
    ///
    /// # Example
    /// ```
    /// use cloudpipe_client::ApiClient;
    ///
    /// let client = ApiClient::new("http://localhost:8080");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the API server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check that the server answers its health endpoint
    pub async fn health(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_empty_response(response).await
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let response = self.check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response that returns no content (e.g., DELETE operations)
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        self.check_status(response).await?;
        Ok(())
    }

    /// Handle an API response carrying raw bytes
    async fn handle_bytes_response(&self, response: reqwest::Response) -> Result<Vec<u8>> {
        let response = self.check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_client_creation() {
        let client = ApiClient::new("http://localhost:8080");
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = ApiClient::new("http://localhost:8080/");
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[tokio::test]
    async fn test_health() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        assert!(client.health().await.is_ok());
    }

    #[tokio::test]
    async fn test_unhealthy_server_is_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503).set_body_string("Database unavailable"))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let err = client.health().await.unwrap_err();
        assert!(err.is_server_error());
    }
}
