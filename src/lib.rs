//! Tricount
//!
//! Skew-resistant triangle counting for undirected simple graphs, expressed as
//! four map/shuffle/reduce stages over line-oriented record streams.
//!
//! # Architecture
//!
//! - Stage 1 (`degree`): total degree of every vertex
//! - Stage 2 (`orient`): each edge keyed by its lower `(degree, vertex)`
//!   endpoint, so high-degree hubs rarely own a long forward list
//! - Stage 3 (`wedge`): neighbor pairs of every forward list, closed against
//!   the real edges
//! - Stage 4 (`aggregate`): global and per-vertex sums, merged into a report
//!
//! Each stage runs to completion on a `LocalExecutor` before the next one
//! starts. `TriangleCounter` chains them and optionally materializes every
//! stage under a work directory.
//!
//! ## Example Usage
//!
//! ```rust
//! use tricount::{EdgeSource, PipelineConfig, TriangleCounter};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), tricount::PipelineError> {
//! let counter = TriangleCounter::new(PipelineConfig::default())?;
//! let report = counter
//!     .run(EdgeSource::from_lines(["1 2", "2 3", "1 3"]))
//!     .await?;
//!
//! assert_eq!(report.total_triangles, 1);
//! assert_eq!(report.to_string(), "total_triangles 1\n1 1\n2 1\n3 1\n");
//! # Ok(())
//! # }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod engine;
pub mod graph;
pub mod persistence;
pub mod pipeline;
pub mod record;
pub mod stages;

// Re-export main types for convenience
pub use config::{ConfigError, ConfigResult, InputPolicy, PipelineConfig};

pub use engine::{
    EngineError, EngineResult, LocalExecutor, Partitioner, StageJob, StageOutput, TaskError,
    TaskResult,
};

pub use graph::{Edge, GraphError, GraphResult, Vertex};

pub use persistence::{EdgeSource, StageStore, StoreError, StoreResult};

pub use pipeline::{
    build_report, run_aggregate_stage, run_close_stage, run_degree_stage, run_orient_stage,
    PipelineError, PipelineResult, TriangleCounter,
};

pub use record::{RecordError, RecordResult};

pub use stages::{DegreeTable, TriangleReport, TriangleTally};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(!ver.is_empty());
        assert_eq!(ver, "0.1.0");
    }
}
