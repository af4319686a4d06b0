//! Materialized record streams
//!
//! Stage outputs live under a work directory as one directory per stage, each
//! holding one `part-NNNNN` file per reducer. A stage directory only appears
//! under its final name once every part file has been written, so an aborted
//! run never leaves output that looks complete.

pub mod source;
pub mod store;

pub use source::{read_records, EdgeSource};
pub use store::{partition_lines, write_parts, StageStore, REPORT_FILE, REPORT_JSON_FILE};

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Persistence errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stage was read before it was written
    #[error("stage {stage} has no materialized output at {path:?}")]
    MissingStage { stage: String, path: PathBuf },
}

pub type StoreResult<T> = Result<T, StoreError>;
