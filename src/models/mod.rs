// src/models/mod.rs

//! Domain models for the ingestion service.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod image;
mod manifest;

// Re-export all public types
pub use self::config::{
    Config, IndexConfig, PipelineConfig, ServerConfig, SourceConfig, StorageConfig,
};
pub use self::image::{
    DecodedImage, ImageReference, SizeSpec, StoredImageRecord, derive_logical_name,
    size_from_name, stored_name,
};
pub use self::manifest::Manifest;
