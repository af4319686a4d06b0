//! In-process map/shuffle/reduce engine
//!
//! The triangle stages only rely on the contract of a grouping engine:
//! map tasks run independently over input splits, a partitioner routes every
//! key to exactly one reducer, and a reducer sees all values of a key before
//! it emits anything. `LocalExecutor` provides that contract on a rayon pool.

pub mod executor;
pub mod job;
pub mod partitioner;

pub use executor::{LocalExecutor, ShuffleOutput, StageCounters, StageOutput};
pub use job::{
    Combiner, MapContext, MapInput, Mapper, RecordKey, RecordValue, ReduceContext, Reducer,
    StageJob, SumCombiner,
};
pub use partitioner::Partitioner;

use crate::graph::Vertex;
use crate::record::PairKey;
use thiserror::Error;

/// Fatal failure of a single map or reduce task
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// An edge references a vertex the degree table does not know
    #[error("vertex {vertex} of edge record {record:?} is missing from the degree table")]
    MissingDegree { vertex: Vertex, record: String },

    /// Self-loop under the strict input policy
    #[error("self-loop in edge record {record:?}")]
    SelfLoop { record: String },

    /// The same edge appears more than once under the strict input policy
    #[error("edge {pair} appears {occurrences} times in the input")]
    DuplicateEdge { pair: PairKey, occurrences: usize },
}

pub type TaskResult<T> = Result<T, TaskError>;

/// Executor errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("reducer count must be at least 1, got {0}")]
    InvalidReducerCount(usize),

    #[error("map split count must be at least 1, got {0}")]
    InvalidSplitCount(usize),

    /// A task failed; the stage produced no output
    #[error("stage {stage} aborted: {source}")]
    Task {
        stage: String,
        #[source]
        source: TaskError,
    },
}

pub type EngineResult<T> = Result<T, EngineError>;
