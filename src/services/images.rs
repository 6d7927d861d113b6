// src/services/images.rs

//! Image fetcher service.
//!
//! Downloads one source image and decodes it into a shareable raster.

use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{DecodedImage, ImageReference};
use crate::services::resize::decode_jpeg;
use crate::utils::http::fetch_bytes;

/// Service for downloading and decoding source images.
#[derive(Clone)]
pub struct ImageFetcher {
    client: Client,
}

impl ImageFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Download, decode and name one image reference.
    ///
    /// The name is derived before downloading so a badly shaped URL costs
    /// no network round trip.
    pub async fn fetch_and_decode(&self, reference: &ImageReference) -> Result<DecodedImage> {
        let url = reference.source_url.as_str();
        let logical_name = reference.logical_name()?;

        let bytes = fetch_bytes(&self.client, url).await?;
        log::debug!("Downloaded {} ({} bytes)", url, bytes.len());

        let raster = tokio::task::spawn_blocking(move || decode_jpeg(&bytes))
            .await
            .map_err(AppError::task)?
            .map_err(|e| AppError::decode(url, e))?;

        Ok(DecodedImage::new(url, logical_name, raster))
    }
}
