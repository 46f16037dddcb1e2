//! Error types for the billing agent

use cloudpipe_client::ClientError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BillingError>;

#[derive(Debug, Error)]
pub enum BillingError {
    /// HTTP request to a price source or Elasticsearch failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// A price source or Elasticsearch answered with an error status
    #[error("Upstream error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Call to the Cloudpipe API failed
    #[error("API client error: {0}")]
    Client(#[from] ClientError),

    /// Price list could not be understood
    #[error("Failed to parse price list: {0}")]
    ParseError(String),

    /// No storage price is known for a region
    #[error("No storage price for region {0}")]
    PriceNotFound(String),

    /// A record cannot be billed as it is
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Elasticsearch rejected some documents
    #[error("Indexing failed: {0}")]
    IndexingFailed(String),
}

impl BillingError {
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }
}

/// Turn a non-success response into [`BillingError::ApiError`]
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(BillingError::api_error(status.as_u16(), error_text));
    }

    Ok(response)
}
