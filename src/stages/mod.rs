//! The four triangle-counting stages
//!
//! 1. `degree`: total degree per vertex
//! 2. `orient`: forward adjacency lists under the `(degree, vertex)` order
//! 3. `wedge`: wedges from adjacency lists, closed against the real edges
//! 4. `aggregate`: global and per-vertex sums
//!
//! Each module exposes its mappers and reducers plus a `*_job` constructor
//! that wires them into a `StageJob`.

pub mod aggregate;
pub mod degree;
pub mod orient;
pub mod wedge;

pub use aggregate::{aggregate_job, ContributionMapper, TallyReducer, TriangleReport, TriangleTally};
pub use degree::{degree_job, DegreeMapper, DegreeReducer};
pub use orient::{orient_job, AdjacencyReducer, DegreeTable, OrientMapper};
pub use wedge::{wedge_job, ClosingReducer, EdgeMarkerMapper, WitnessMapper};

use crate::config::InputPolicy;
use crate::engine::{MapContext, TaskError, TaskResult};
use crate::graph::{Edge, GraphError};
use crate::record::{parse_edge, RecordError};

pub const DEGREE_STAGE: &str = "degree";
pub const ORIENT_STAGE: &str = "orient";
pub const WEDGE_STAGE: &str = "wedge";
pub const AGGREGATE_STAGE: &str = "aggregate";

/// Stage names in run order
pub const STAGES: [&str; 4] = [DEGREE_STAGE, ORIENT_STAGE, WEDGE_STAGE, AGGREGATE_STAGE];

/// Decode an edge line the way every edge-reading mapper does.
///
/// Malformed lines are skipped on the context. Self-loops are fatal under the
/// strict policy and skipped otherwise.
pub(crate) fn read_edge<K, V>(
    line: &str,
    policy: InputPolicy,
    ctx: &mut MapContext<K, V>,
) -> TaskResult<Option<Edge>> {
    match parse_edge(line) {
        Ok(edge) => Ok(Some(edge)),
        Err(RecordError::Graph(GraphError::SelfLoop(_))) if policy == InputPolicy::Strict => {
            Err(TaskError::SelfLoop {
                record: line.to_string(),
            })
        }
        Err(err) => {
            ctx.skip(line, &err);
            Ok(None)
        }
    }
}
