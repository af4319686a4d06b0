//! Stage 2: degree-ordered forward adjacency lists
//!
//! Every edge is keyed by its lower-ranked endpoint under `(degree, vertex)`.
//! A hub sits at the high end of nearly all its edges, so its own forward
//! list stays short and no reducer has to pair up a hub's full neighborhood.

use super::{read_edge, ORIENT_STAGE};
use crate::config::{InputPolicy, PipelineConfig};
use crate::engine::{
    MapContext, Mapper, ReduceContext, Reducer, StageJob, TaskError, TaskResult,
};
use crate::graph::{Edge, Rank, Vertex};
use crate::record::{AdjacencyRecord, DegreeRecord};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Read-only vertex → degree map, broadcast to every stage-2 map task
#[derive(Debug, Clone, Default)]
pub struct DegreeTable {
    degrees: FxHashMap<Vertex, u64>,
    skipped: usize,
}

impl DegreeTable {
    /// Build the table from stage-1 output lines; malformed lines are skipped
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut table = DegreeTable::default();
        for line in lines {
            match DegreeRecord::parse(line) {
                Ok(record) => table.insert(record.vertex, record.degree),
                Err(err) => {
                    debug!("Skipping degree record {:?}: {}", line, err);
                    table.skipped += 1;
                }
            }
        }
        if table.skipped > 0 {
            warn!("Degree table: skipped {} malformed records", table.skipped);
        }
        table
    }

    pub fn insert(&mut self, vertex: Vertex, degree: u64) {
        if let Some(previous) = self.degrees.insert(vertex, degree) {
            if previous != degree {
                warn!("Degree table: conflicting degrees {} and {}", previous, degree);
            }
        }
    }

    pub fn degree(&self, vertex: &Vertex) -> Option<u64> {
        self.degrees.get(vertex).copied()
    }

    pub fn rank<'a>(&self, vertex: &'a Vertex) -> Option<Rank<'a>> {
        self.degree(vertex).map(|degree| Rank { degree, vertex })
    }

    /// Split an edge into `(key, neighbor)` with the key ranked strictly lower.
    ///
    /// Returns the endpoint missing from the table on failure.
    pub fn orient(&self, edge: Edge) -> Result<(Vertex, Vertex), Vertex> {
        let (low, high) = edge.into_endpoints();
        let low_rank = match self.rank(&low) {
            Some(rank) => rank,
            None => return Err(low),
        };
        let high_rank = match self.rank(&high) {
            Some(rank) => rank,
            None => return Err(high),
        };
        if low_rank < high_rank {
            Ok((low, high))
        } else {
            Ok((high, low))
        }
    }

    pub fn len(&self) -> usize {
        self.degrees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.degrees.is_empty()
    }

    /// Malformed lines ignored while loading
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Emits `(a, b)` for each edge, `a` being the lower-ranked endpoint
#[derive(Debug, Clone)]
pub struct OrientMapper {
    degrees: Arc<DegreeTable>,
    policy: InputPolicy,
}

impl OrientMapper {
    pub fn new(degrees: Arc<DegreeTable>, policy: InputPolicy) -> Self {
        Self { degrees, policy }
    }
}

impl Mapper<Vertex, Vertex> for OrientMapper {
    fn map(&self, line: &str, ctx: &mut MapContext<Vertex, Vertex>) -> TaskResult<()> {
        let Some(edge) = read_edge(line, self.policy, ctx)? else {
            return Ok(());
        };
        match self.degrees.orient(edge) {
            Ok((key, neighbor)) => {
                ctx.emit(key, neighbor);
                Ok(())
            }
            Err(vertex) => Err(TaskError::MissingDegree {
                vertex,
                record: line.to_string(),
            }),
        }
    }
}

/// Collects and sorts the forward neighbors of one vertex
#[derive(Debug, Clone, Copy, Default)]
pub struct AdjacencyReducer;

impl Reducer<Vertex, Vertex> for AdjacencyReducer {
    fn reduce(
        &self,
        vertex: Vertex,
        mut neighbors: Vec<Vertex>,
        ctx: &mut ReduceContext,
    ) -> TaskResult<()> {
        // arrival order is engine-dependent
        neighbors.sort_unstable();
        ctx.emit(AdjacencyRecord { vertex, neighbors });
        Ok(())
    }
}

/// Stage 2 over the raw edge lines with the complete degree table
pub fn orient_job(
    edges: Arc<Vec<String>>,
    degrees: Arc<DegreeTable>,
    config: &PipelineConfig,
) -> StageJob<Vertex, Vertex> {
    StageJob::new(ORIENT_STAGE, AdjacencyReducer)
        .with_input(edges, OrientMapper::new(degrees, config.input_policy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineError, LocalExecutor};

    fn table(entries: &[(u64, u64)]) -> DegreeTable {
        let mut table = DegreeTable::default();
        for &(v, d) in entries {
            table.insert(Vertex::from(v), d);
        }
        table
    }

    fn edge(a: u64, b: u64) -> Edge {
        Edge::new(a.into(), b.into()).unwrap()
    }

    #[test]
    fn test_from_lines() {
        let table = DegreeTable::from_lines(["1\t3", "2\t1", "junk"]);
        assert_eq!(table.degree(&Vertex::from(1)), Some(3));
        assert_eq!(table.degree(&Vertex::from(2)), Some(1));
        assert_eq!(table.len(), 2);
        assert_eq!(table.skipped(), 1);
    }

    #[test]
    fn test_orient_by_degree() {
        // vertex 1 is the hub, so 2 keys the edge despite the larger id
        let table = table(&[(1, 10), (2, 1)]);
        assert_eq!(table.orient(edge(1, 2)), Ok((Vertex::from(2), Vertex::from(1))));
    }

    #[test]
    fn test_orient_ties_by_vertex() {
        let table = table(&[(7, 2), (3, 2)]);
        assert_eq!(table.orient(edge(7, 3)), Ok((Vertex::from(3), Vertex::from(7))));
    }

    #[test]
    fn test_orient_missing_vertex() {
        let table = table(&[(1, 1)]);
        assert_eq!(table.orient(edge(1, 9)), Err(Vertex::from(9)));
    }

    #[test]
    fn test_orientation_is_exclusive() {
        // exactly one endpoint keys each edge, independent of line order
        let table = Arc::new(table(&[(1, 2), (2, 2), (3, 2)]));
        let config = PipelineConfig::default().with_reducers(2);
        let executor = LocalExecutor::from_config(&config).unwrap();
        for edges in [vec!["1 2", "2 3", "3 1"], vec!["3 1", "2 1", "3 2"]] {
            let lines = Arc::new(edges.iter().map(|s| s.to_string()).collect());
            let output = executor
                .run(&orient_job(lines, table.clone(), &config))
                .unwrap();
            let mut records = output.into_lines();
            records.sort();
            assert_eq!(records, vec!["1\t2,3", "2\t3"]);
        }
    }

    #[test]
    fn test_missing_degree_aborts() {
        let table = Arc::new(table(&[(1, 1)]));
        let config = PipelineConfig::default();
        let executor = LocalExecutor::from_config(&config).unwrap();
        let lines = Arc::new(vec!["1 5".to_string()]);
        let err = executor.run(&orient_job(lines, table, &config)).unwrap_err();
        assert_eq!(
            err,
            EngineError::Task {
                stage: ORIENT_STAGE.to_string(),
                source: TaskError::MissingDegree {
                    vertex: Vertex::from(5),
                    record: "1 5".to_string(),
                },
            }
        );
    }

    #[test]
    fn test_adjacency_sorted() {
        let mut ctx = ReduceContext::default();
        AdjacencyReducer
            .reduce(
                Vertex::from(1),
                vec![Vertex::from(10), Vertex::from(2), Vertex::from(3)],
                &mut ctx,
            )
            .unwrap();
        assert_eq!(ctx.into_lines(), vec!["1\t2,3,10"]);
    }
}
