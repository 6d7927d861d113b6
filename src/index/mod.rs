//! Index of stored images.
//!
//! The index is the single source of truth for which resized images are
//! available: one record per stored name, pointing at its public address.

pub mod json;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::StoredImageRecord;

pub use json::JsonIndex;

/// Trait for name → address index backends.
#[async_trait]
pub trait ImageIndex: Send + Sync {
    /// Insert the record, or replace the address of the record with the
    /// same name.
    ///
    /// Atomic per name: concurrent upserts of one name leave exactly one
    /// of the written records in place.
    async fn upsert(&self, record: &StoredImageRecord) -> Result<()>;

    /// All records, ordered by name.
    async fn find_all(&self) -> Result<Vec<StoredImageRecord>>;

    /// The record stored under `name`, if any.
    async fn get(&self, name: &str) -> Result<Option<StoredImageRecord>>;
}
