//! JSON file index implementation.
//!
//! Records are kept in memory behind an async mutex and the whole set is
//! rewritten atomically (temp file + rename) after every upsert, so the
//! file on disk always holds a complete, duplicate-free snapshot.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::index::ImageIndex;
use crate::models::StoredImageRecord;

/// Index persisted as a pretty-printed JSON array of `{Name, Url}`.
pub struct JsonIndex {
    path: PathBuf,
    records: Mutex<BTreeMap<String, String>>,
}

impl JsonIndex {
    /// Open the index at `path`, starting empty if the file does not exist.
    ///
    /// An unreadable or corrupt file is an error.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let stored: Vec<StoredImageRecord> = serde_json::from_slice(&bytes)?;
                stored
                    .into_iter()
                    .map(|record| (record.name, record.address))
                    .collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(AppError::Io(e)),
        };

        log::debug!("Opened index {} with {} records", path.display(), records.len());
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn to_records(records: &BTreeMap<String, String>) -> Vec<StoredImageRecord> {
        records
            .iter()
            .map(|(name, address)| StoredImageRecord::new(name, address))
            .collect()
    }

    /// Write the snapshot atomically (write to temp, then rename).
    async fn persist(&self, records: &BTreeMap<String, String>) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&Self::to_records(records))?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl ImageIndex for JsonIndex {
    async fn upsert(&self, record: &StoredImageRecord) -> Result<()> {
        let mut records = self.records.lock().await;
        let previous = records.insert(record.name.clone(), record.address.clone());

        if let Err(e) = self.persist(&records).await {
            // Keep memory in line with what is on disk.
            match previous {
                Some(address) => records.insert(record.name.clone(), address),
                None => records.remove(&record.name),
            };
            return Err(AppError::index_write(&record.name, e));
        }

        log::debug!("Indexed {} -> {}", record.name, record.address);
        Ok(())
    }

    async fn find_all(&self) -> Result<Vec<StoredImageRecord>> {
        let records = self.records.lock().await;
        Ok(Self::to_records(&records))
    }

    async fn get(&self, name: &str) -> Result<Option<StoredImageRecord>> {
        let records = self.records.lock().await;
        Ok(records
            .get(name)
            .map(|address| StoredImageRecord::new(name, address)))
    }
}
