// src/services/manifest.rs

//! Manifest fetcher service.
//!
//! Retrieves the JSON manifest and turns it into image references.

use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{ImageReference, Manifest};
use crate::utils::http::fetch_bytes;

/// Service for retrieving the list of source images.
#[derive(Clone)]
pub struct ManifestFetcher {
    client: Client,
}

impl ManifestFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetch and parse the manifest at `endpoint`.
    ///
    /// A single attempt; retrying is left to the caller.
    pub async fn fetch(&self, endpoint: &str) -> Result<Vec<ImageReference>> {
        let body = fetch_bytes(&self.client, endpoint).await?;
        let manifest: Manifest =
            serde_json::from_slice(&body).map_err(|e| AppError::malformed(endpoint, e))?;

        log::debug!(
            "Manifest {} lists {} images",
            endpoint,
            manifest.images.len()
        );
        Ok(manifest.images)
    }
}
