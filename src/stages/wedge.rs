//! Stage 3: wedge generation and closing
//!
//! Two map sources share the pair-key space `v,w`. Forward adjacency lists
//! contribute one `Witness(u)` per neighbor pair of `u`; the raw edges
//! contribute one `EdgeMarker` per edge. A pair group that holds a marker
//! turns each of its witnesses into a triangle. Groups with only witnesses
//! or only a marker produce nothing.
//!
//! The minimum-rank vertex of a triangle is the only one holding the other
//! two in its forward list, so every triangle closes exactly once.

use super::{read_edge, WEDGE_STAGE};
use crate::config::{InputPolicy, PipelineConfig};
use crate::engine::{
    MapContext, Mapper, ReduceContext, Reducer, StageJob, TaskError, TaskResult,
};
use crate::graph::Edge;
use crate::record::{AdjacencyRecord, ClosingValue, Contribution, PairKey};
use std::sync::Arc;

/// Map A: wedges from a forward adjacency list
#[derive(Debug, Clone, Copy, Default)]
pub struct WitnessMapper;

impl Mapper<PairKey, ClosingValue> for WitnessMapper {
    fn map(&self, line: &str, ctx: &mut MapContext<PairKey, ClosingValue>) -> TaskResult<()> {
        let AdjacencyRecord {
            vertex,
            mut neighbors,
        } = match AdjacencyRecord::parse(line) {
            Ok(record) => record,
            Err(err) => {
                ctx.skip(line, &err);
                return Ok(());
            }
        };
        neighbors.sort_unstable();

        for (i, v) in neighbors.iter().enumerate() {
            for w in &neighbors[i + 1..] {
                // repeated neighbors only exist under the lenient policy
                if let Ok(pair) = Edge::new(v.clone(), w.clone()) {
                    ctx.emit(PairKey::new(pair), ClosingValue::Witness(vertex.clone()));
                }
            }
        }
        Ok(())
    }
}

/// Map B: one marker per real edge
#[derive(Debug, Clone, Copy)]
pub struct EdgeMarkerMapper {
    policy: InputPolicy,
}

impl EdgeMarkerMapper {
    pub fn new(policy: InputPolicy) -> Self {
        Self { policy }
    }
}

impl Mapper<PairKey, ClosingValue> for EdgeMarkerMapper {
    fn map(&self, line: &str, ctx: &mut MapContext<PairKey, ClosingValue>) -> TaskResult<()> {
        if let Some(edge) = read_edge(line, self.policy, ctx)? {
            ctx.emit(PairKey::new(edge), ClosingValue::EdgeMarker);
        }
        Ok(())
    }
}

/// Confirms wedges against real edges and emits triangle contributions
#[derive(Debug, Clone, Copy)]
pub struct ClosingReducer {
    policy: InputPolicy,
}

impl ClosingReducer {
    pub fn new(policy: InputPolicy) -> Self {
        Self { policy }
    }
}

impl Reducer<PairKey, ClosingValue> for ClosingReducer {
    fn reduce(
        &self,
        pair: PairKey,
        values: Vec<ClosingValue>,
        ctx: &mut ReduceContext,
    ) -> TaskResult<()> {
        let mut markers = 0;
        let mut witnesses = Vec::new();
        for value in values {
            match value {
                ClosingValue::EdgeMarker => markers += 1,
                ClosingValue::Witness(u) => witnesses.push(u),
            }
        }

        if markers > 1 && self.policy == InputPolicy::Strict {
            return Err(TaskError::DuplicateEdge {
                pair,
                occurrences: markers,
            });
        }
        if markers == 0 {
            return Ok(());
        }

        let edge = pair.edge();
        for u in witnesses {
            ctx.emit(Contribution::global(1));
            ctx.emit(Contribution::vertex(u, 1));
            ctx.emit(Contribution::vertex(edge.low().clone(), 1));
            ctx.emit(Contribution::vertex(edge.high().clone(), 1));
        }
        Ok(())
    }
}

/// Stage 3 over the stage-2 adjacency lists and the raw edge lines
pub fn wedge_job(
    adjacency: Arc<Vec<String>>,
    edges: Arc<Vec<String>>,
    config: &PipelineConfig,
) -> StageJob<PairKey, ClosingValue> {
    StageJob::new(WEDGE_STAGE, ClosingReducer::new(config.input_policy))
        .with_input(adjacency, WitnessMapper)
        .with_input(edges, EdgeMarkerMapper::new(config.input_policy))
}
