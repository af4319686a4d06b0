//! Stage 4: global and per-vertex triangle totals
//!
//! Contributions are summed per key by the reducers, then folded into a
//! `TriangleTally`. Tallies merge as a commutative monoid, so partial tallies
//! from any number of partitions combine in any order.

use super::AGGREGATE_STAGE;
use crate::config::PipelineConfig;
use crate::engine::{
    MapContext, Mapper, ReduceContext, Reducer, StageJob, SumCombiner, TaskResult,
};
use crate::graph::Vertex;
use crate::record::{AggregateKey, Contribution, RecordResult};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Reads `G\tn` and `V\tv\tn` records
#[derive(Debug, Clone, Copy, Default)]
pub struct ContributionMapper;

impl Mapper<AggregateKey, u64> for ContributionMapper {
    fn map(&self, line: &str, ctx: &mut MapContext<AggregateKey, u64>) -> TaskResult<()> {
        match Contribution::parse(line) {
            Ok(Contribution { key, count }) => ctx.emit(key, count),
            Err(err) => ctx.skip(line, &err),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TallyReducer;

impl Reducer<AggregateKey, u64> for TallyReducer {
    fn reduce(
        &self,
        key: AggregateKey,
        values: Vec<u64>,
        ctx: &mut ReduceContext,
    ) -> TaskResult<()> {
        let count = values.into_iter().sum();
        ctx.emit(Contribution { key, count });
        Ok(())
    }
}

/// Stage 4 over the stage-3 contributions
pub fn aggregate_job(
    contributions: Arc<Vec<String>>,
    config: &PipelineConfig,
) -> StageJob<AggregateKey, u64> {
    let job =
        StageJob::new(AGGREGATE_STAGE, TallyReducer).with_input(contributions, ContributionMapper);
    if config.combine {
        job.with_combiner(SumCombiner)
    } else {
        job
    }
}

/// Partial triangle totals
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriangleTally {
    total: u64,
    vertices: FxHashMap<Vertex, u64>,
}

impl TriangleTally {
    pub fn add(&mut self, contribution: Contribution) {
        match contribution.key {
            AggregateKey::Global => self.total += contribution.count,
            AggregateKey::Vertex(v) => *self.vertices.entry(v).or_insert(0) += contribution.count,
        }
    }

    /// Monoid merge; the empty tally is the identity
    pub fn merge(mut self, other: TriangleTally) -> TriangleTally {
        let (mut large, small) = if self.vertices.len() >= other.vertices.len() {
            (std::mem::take(&mut self), other)
        } else {
            (other, self)
        };
        large.total += small.total;
        for (v, count) in small.vertices {
            *large.vertices.entry(v).or_insert(0) += count;
        }
        large
    }

    /// Fold one reducer's output lines into a tally
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> RecordResult<Self> {
        let mut tally = TriangleTally::default();
        for line in lines {
            tally.add(Contribution::parse(line)?);
        }
        Ok(tally)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Final report; vertices with a zero count are dropped
    pub fn into_report(self) -> TriangleReport {
        let mut vertex_counts: Vec<(Vertex, u64)> = self
            .vertices
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .collect();
        vertex_counts.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        TriangleReport {
            total_triangles: self.total,
            vertex_counts,
        }
    }
}

/// Total triangle count plus per-vertex participation, ascending by vertex
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TriangleReport {
    pub total_triangles: u64,
    pub vertex_counts: Vec<(Vertex, u64)>,
}

impl TriangleReport {
    /// Zero for vertices in no triangle
    pub fn count_for(&self, vertex: &Vertex) -> u64 {
        self.vertex_counts
            .binary_search_by(|(v, _)| v.cmp(vertex))
            .map(|i| self.vertex_counts[i].1)
            .unwrap_or(0)
    }

    pub fn participation_sum(&self) -> u64 {
        self.vertex_counts.iter().map(|(_, c)| c).sum()
    }

    /// Every triangle has three vertices
    pub fn is_consistent(&self) -> bool {
        self.participation_sum() == 3 * self.total_triangles
    }
}

impl fmt::Display for TriangleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "total_triangles {}", self.total_triangles)?;
        for (vertex, count) in &self.vertex_counts {
            writeln!(f, "{} {}", vertex, count)?;
        }
        Ok(())
    }
}
