//! Service layer for the ingestion pipeline.
//!
//! This module contains the business logic for:
//! - Fetching the manifest of source image URLs
//! - Downloading and decoding individual images
//! - Resizing and encoding the stored variants

pub mod images;
pub mod manifest;
pub mod resize;

pub use images::ImageFetcher;
pub use manifest::ManifestFetcher;
