//! Outcome bookkeeping for one pipeline run.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::error::AppError;
use crate::models::{SizeSpec, StoredImageRecord};

/// Stage of the per-reference state machine at which a unit failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Fetch,
    Decode,
    Name,
    Resize,
    Store,
    Index,
}

impl Stage {
    /// Stage a reference-level (fetch + decode) error belongs to.
    pub fn of_reference_error(error: &AppError) -> Self {
        match error {
            AppError::NameDerivation { .. } => Stage::Name,
            AppError::Decode { .. } => Stage::Decode,
            _ => Stage::Fetch,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Decode => "decode",
            Stage::Name => "name",
            Stage::Resize => "resize",
            Stage::Store => "store",
            Stage::Index => "index",
        };
        f.write_str(name)
    }
}

/// A failed unit of work.
///
/// `size` is `None` when the whole reference failed before any size was
/// attempted.
#[derive(Debug, Serialize)]
pub struct UnitFailure {
    pub source_url: String,
    pub size: Option<SizeSpec>,
    pub stage: Stage,
    #[serde(serialize_with = "display")]
    pub error: AppError,
}

impl UnitFailure {
    pub fn new(
        source_url: impl Into<String>,
        size: Option<SizeSpec>,
        stage: Stage,
        error: AppError,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            size,
            stage,
            error,
        }
    }

    /// Failure of the fetch/decode/name step, covering every size.
    pub fn reference(source_url: impl Into<String>, error: AppError) -> Self {
        let stage = Stage::of_reference_error(&error);
        Self::new(source_url, None, stage, error)
    }
}

impl fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.size {
            Some(size) => write!(f, "{} [{}]", self.source_url, size)?,
            None => write!(f, "{}", self.source_url)?,
        }
        write!(f, " failed at {}: {}", self.stage, self.error)
    }
}

fn display<S: Serializer>(error: &AppError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Result of one (reference, size) unit.
pub type UnitOutcome = Result<StoredImageRecord, UnitFailure>;

/// Why a run stopped before processing every reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Interruption {
    Deadline,
    Shutdown,
}

/// Aggregate result of a pipeline run.
#[derive(Debug, Serialize)]
pub struct PipelineReport {
    pub endpoint: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Number of manifest entries
    pub references: usize,
    pub sizes: Vec<SizeSpec>,
    /// Records written to storage and index, in completion order
    pub stored: Vec<StoredImageRecord>,
    pub failures: Vec<UnitFailure>,
    /// (reference, size) pairs never attempted because the run was stopped
    pub cancelled: usize,
    pub interrupted: Option<Interruption>,
}

impl PipelineReport {
    pub fn new(
        endpoint: impl Into<String>,
        sizes: &[SizeSpec],
        references: usize,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            started_at,
            finished_at: started_at,
            references,
            sizes: sizes.to_vec(),
            stored: Vec::new(),
            failures: Vec::new(),
            cancelled: 0,
            interrupted: None,
        }
    }

    /// Record the outcomes of one reference.
    pub fn record(&mut self, outcomes: impl IntoIterator<Item = UnitOutcome>) {
        for outcome in outcomes {
            match outcome {
                Ok(record) => self.stored.push(record),
                Err(failure) => self.failures.push(failure),
            }
        }
    }

    /// Close the report: stamp the end time and count unattempted pairs.
    pub fn finish(&mut self, interrupted: Option<Interruption>) {
        self.finished_at = Utc::now();
        self.interrupted = interrupted;
        self.cancelled = self
            .total_pairs()
            .saturating_sub(self.succeeded() + self.failed());
    }

    pub fn total_pairs(&self) -> usize {
        self.references * self.sizes.len()
    }

    /// Successful (reference, size) pairs.
    pub fn succeeded(&self) -> usize {
        self.stored.len()
    }

    /// Failed (reference, size) pairs; a reference-level failure counts
    /// once per size.
    pub fn failed(&self) -> usize {
        self.failures
            .iter()
            .map(|f| if f.size.is_some() { 1 } else { self.sizes.len() })
            .sum()
    }

    /// Every pair succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.cancelled == 0
    }

    pub fn log_summary(&self) {
        let elapsed = self.finished_at - self.started_at;
        log::info!(
            "Run finished in {}ms: {} references, {} stored, {} failed, {} cancelled",
            elapsed.num_milliseconds(),
            self.references,
            self.succeeded(),
            self.failed(),
            self.cancelled
        );
        for failure in &self.failures {
            log::warn!("  {}", failure);
        }
        if let Some(reason) = self.interrupted {
            log::warn!("Run interrupted ({:?}) before all images were processed", reason);
        }
    }
}
