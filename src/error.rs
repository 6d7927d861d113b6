// src/error.rs

//! Unified error handling for the ingestion service.

use std::fmt;

use thiserror::Error;

/// Result type alias for skyhub operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Network-level failure talking to a remote host
    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// Manifest body was not the expected JSON shape
    #[error("Malformed response from {url}: {message}")]
    MalformedResponse { url: String, message: String },

    /// Downloaded bytes are not a decodable image
    #[error("Decode error for {url}: {message}")]
    Decode { url: String, message: String },

    /// Source URL has no usable final path segment
    #[error("Cannot derive image name from '{url}': {reason}")]
    NameDerivation { url: String, reason: String },

    /// A resized raster could not be encoded
    #[error("Encode error for {name}: {message}")]
    Encode { name: String, message: String },

    /// Storage backend refused or failed a write
    #[error("Storage write failed for {name}: {message}")]
    StorageWrite { name: String, message: String },

    /// Index backend refused or failed an upsert
    #[error("Index write failed for {name}: {message}")]
    IndexWrite { name: String, message: String },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// A worker task panicked or was aborted
    #[error("Task error: {0}")]
    Task(String),

    /// Work abandoned because the run was cancelled
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// HTTP server failed to bind or serve
    #[error("Server error: {0}")]
    Server(String),
}

impl AppError {
    /// Create a transport error for a URL.
    pub fn transport(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a malformed response error for a URL.
    pub fn malformed(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::MalformedResponse {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a decode error for a URL.
    pub fn decode(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Decode {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a name derivation error.
    pub fn name_derivation(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NameDerivation {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create an encode error for an object name.
    pub fn encode(name: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Encode {
            name: name.into(),
            message: message.to_string(),
        }
    }

    /// Create a storage write error for an object name.
    pub fn storage_write(name: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::StorageWrite {
            name: name.into(),
            message: message.to_string(),
        }
    }

    /// Create an index write error for a record name.
    pub fn index_write(name: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::IndexWrite {
            name: name.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a task error.
    pub fn task(message: impl fmt::Display) -> Self {
        Self::Task(message.to_string())
    }

    /// Create a cancellation error.
    pub fn cancelled(what: impl fmt::Display) -> Self {
        Self::Cancelled(what.to_string())
    }

    /// Create a server error.
    pub fn server(message: impl fmt::Display) -> Self {
        Self::Server(message.to_string())
    }

    /// Whether retrying the same operation could succeed without new input.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::StorageWrite { .. } | Self::IndexWrite { .. }
        )
    }
}
