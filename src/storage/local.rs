//! Local filesystem storage implementation.
//!
//! Objects are written atomically: bytes go to a uniquely named temporary
//! file in the same directory, which is then renamed over the target.
//! Readers therefore see either the previous object or the new one, never
//! a partial write.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::Config;
use crate::storage::{ImageStorage, object_address, validate_name};

/// Local filesystem storage backend.
#[derive(Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    address_base: String,
    tmp_seq: Arc<AtomicU64>,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    ///
    /// `address_base` is the public URL objects are served under, e.g.
    /// `http://localhost:7366/skyhub`.
    pub fn new(root_dir: impl Into<PathBuf>, address_base: impl Into<String>) -> Self {
        Self {
            root_dir: root_dir.into(),
            address_base: address_base.into().trim_end_matches('/').to_string(),
            tmp_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Create a LocalStorage from the application configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.storage.root_dir, config.address_base())
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for an object name.
    fn path(&self, name: &str) -> PathBuf {
        self.root_dir.join(name)
    }

    /// Temporary path unique to this process and write.
    fn tmp_path(&self, name: &str) -> PathBuf {
        let seq = self.tmp_seq.fetch_add(1, Ordering::Relaxed);
        self.root_dir
            .join(format!(".{}.{}.{}.tmp", name, std::process::id(), seq))
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, name: &str, bytes: &[u8]) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root_dir).await?;

        let tmp = self.tmp_path(name);
        let result = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(bytes).await?;
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp, self.path(name)).await
        }
        .await;

        if result.is_err() {
            let _ = tokio::fs::remove_file(&tmp).await;
        }
        result
    }
}

#[async_trait]
impl ImageStorage for LocalStorage {
    async fn store(&self, name: &str, bytes: &[u8]) -> Result<String> {
        validate_name(name)?;
        self.write_bytes(name, bytes)
            .await
            .map_err(|e| AppError::storage_write(name, e))?;

        log::debug!("Stored {} ({} bytes)", name, bytes.len());
        Ok(self.address(name))
    }

    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        if validate_name(name).is_err() {
            return Ok(None);
        }
        match tokio::fs::read(self.path(name)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    fn address(&self, name: &str) -> String {
        object_address(&self.address_base, name)
    }
}
