// src/pipeline/verify.rs

//! Consistency check between the index and storage.
//!
//! Every indexed record must resolve to a stored object whose decoded
//! dimensions match the `WxH` in its name.

use crate::error::{AppError, Result};
use crate::index::ImageIndex;
use crate::models::size_from_name;
use crate::services::resize::decode_jpeg;
use crate::storage::ImageStorage;

/// A record that failed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyProblem {
    pub name: String,
    pub reason: String,
}

/// Summary of a verification pass.
#[derive(Debug, Default)]
pub struct VerifyReport {
    pub checked: usize,
    pub problems: Vec<VerifyProblem>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }

    fn problem(&mut self, name: &str, reason: impl Into<String>) {
        self.problems.push(VerifyProblem {
            name: name.to_string(),
            reason: reason.into(),
        });
    }
}

/// Check every indexed record against storage.
pub async fn verify(index: &dyn ImageIndex, storage: &dyn ImageStorage) -> Result<VerifyReport> {
    let mut report = VerifyReport::default();

    for record in index.find_all().await? {
        report.checked += 1;
        let name = record.name.as_str();

        let Some(expected) = size_from_name(name) else {
            report.problem(name, "name does not end in _<W>x<H>.jpg");
            continue;
        };

        if record.address != storage.address(name) {
            report.problem(
                name,
                format!(
                    "address {} does not match {}",
                    record.address,
                    storage.address(name)
                ),
            );
        }

        let Some(bytes) = storage.read(name).await? else {
            report.problem(name, "indexed but not in storage");
            continue;
        };

        let decoded = tokio::task::spawn_blocking(move || decode_jpeg(&bytes))
            .await
            .map_err(AppError::task)?;
        match decoded {
            Ok(raster) if (raster.width(), raster.height()) == expected => {}
            Ok(raster) => report.problem(
                name,
                format!(
                    "expected {}x{}, stored image is {}x{}",
                    expected.0,
                    expected.1,
                    raster.width(),
                    raster.height()
                ),
            ),
            Err(e) => report.problem(name, format!("stored object does not decode: {e}")),
        }
    }

    for problem in &report.problems {
        log::warn!("{}: {}", problem.name, problem.reason);
    }
    log::info!(
        "Verified {} records, {} problems",
        report.checked,
        report.problems.len()
    );
    Ok(report)
}
