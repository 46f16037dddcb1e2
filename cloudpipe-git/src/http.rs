//! Response helpers shared by the host clients

use serde::de::DeserializeOwned;

use crate::error::{GitError, Result};

/// Fails on non-success status codes, mapping 404 to [`GitError::NotFound`]
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(GitError::NotFound(url));
    }

    Err(GitError::api_error(status.as_u16(), error_text))
}

/// Checks the status and deserializes a JSON body
pub(crate) async fn parse_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    check_status(response)
        .await?
        .json()
        .await
        .map_err(|e| GitError::ParseError(format!("Failed to parse JSON response: {}", e)))
}
