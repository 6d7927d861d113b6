//! Storage abstractions for resized images.
//!
//! Every stored variant is a flat object addressed by its name under a
//! single root; the name is also the last path segment of its public
//! address.
//!
//! ## Directory Structure
//!
//! ```text
//! skyhub/
//! ├── b737_3_320x240.jpg
//! ├── b737_3_384x288.jpg
//! └── b737_3_640x480.jpg
//! ```

pub mod local;

use async_trait::async_trait;

use crate::error::{AppError, Result};

// Re-export for convenience
pub use local::LocalStorage;

/// Trait for image storage backends.
#[async_trait]
pub trait ImageStorage: Send + Sync {
    /// Persist `bytes` under `name`, replacing any existing object, and
    /// return the object's public address.
    ///
    /// Concurrent stores of distinct names never interfere; concurrent
    /// stores of one name leave exactly one writer's bytes behind.
    ///
    /// A name that is not a single safe path segment (see [`validate_name`])
    /// is rejected with [`AppError::Validation`] rather than
    /// [`AppError::StorageWrite`], so it is never retried.
    async fn store(&self, name: &str, bytes: &[u8]) -> Result<String>;

    /// Read a stored object, `None` if it does not exist.
    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// Public address an object with this name is (or would be) served at.
    fn address(&self, name: &str) -> String;
}

/// Public address of `name` under `base`.
///
/// `name` is percent-encoded as one path segment, so an HTTP server that
/// decodes the request path gets `name` back unchanged.
pub fn object_address(base: &str, name: &str) -> String {
    let base = base.trim_end_matches('/');
    let Ok(mut url) = url::Url::parse(base) else {
        return format!("{base}/{name}");
    };
    match url.path_segments_mut() {
        Ok(mut segments) => {
            segments.pop_if_empty().push(name);
        }
        Err(()) => return format!("{base}/{name}"),
    }
    url.into()
}

/// Reject names that could escape the storage root or collide with
/// temporary files.
pub fn validate_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0'])
        || name.contains("..");
    if invalid {
        return Err(AppError::validation(format!("invalid object name {name:?}")));
    }
    Ok(())
}
