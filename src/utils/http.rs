// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::{AppError, Result};
use crate::models::SourceConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &SourceConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| AppError::config(format!("failed to build HTTP client: {e}")))
}

/// GET a URL and return the full body.
///
/// Connection failures, non-success statuses and truncated bodies all
/// surface as transport errors.
pub async fn fetch_bytes(client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::transport(url, e))?
        .error_for_status()
        .map_err(|e| AppError::transport(url, e))?;

    response
        .bytes()
        .await
        .map(|body| body.to_vec())
        .map_err(|e| AppError::transport(url, e))
}
