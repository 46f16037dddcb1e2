//! Error types for the Git hosting clients

use thiserror::Error;

/// Result type alias for Git client operations
pub type Result<T> = std::result::Result<T, GitError>;

/// Errors that can occur when talking to a Git host
#[derive(Debug, Error)]
pub enum GitError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Git host returned an error status code
    #[error("Git API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Repository, ref or file does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Failed to parse or decode a response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Repository reference cannot be used
    #[error("Invalid repository: {0}")]
    InvalidRepository(String),

    /// File path is not a plain repository-relative path
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

impl GitError {
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_)) || matches!(self, Self::ApiError { status: 404, .. })
    }
}
