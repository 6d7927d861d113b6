//! Pipeline entry points for ingestion operations.
//!
//! - `Pipeline::run`: Fetch the manifest, then fetch, resize, store and
//!   index every image
//! - `verify`: Check indexed records against stored objects

pub mod ingest;
pub mod report;
pub mod retry;
pub mod verify;

pub use ingest::Pipeline;
pub use report::{Interruption, PipelineReport, Stage, UnitFailure, UnitOutcome};
pub use retry::RetryPolicy;
pub use verify::{VerifyProblem, VerifyReport, verify};
