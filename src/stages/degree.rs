//! Stage 1: vertex degrees

use super::{read_edge, DEGREE_STAGE};
use crate::config::{InputPolicy, PipelineConfig};
use crate::engine::{
    MapContext, Mapper, ReduceContext, Reducer, StageJob, SumCombiner, TaskResult,
};
use crate::graph::Vertex;
use crate::record::DegreeRecord;
use std::sync::Arc;

/// Emits `(u, 1)` and `(v, 1)` for every edge `{u, v}`
#[derive(Debug, Clone, Copy)]
pub struct DegreeMapper {
    policy: InputPolicy,
}

impl DegreeMapper {
    pub fn new(policy: InputPolicy) -> Self {
        Self { policy }
    }
}

impl Mapper<Vertex, u64> for DegreeMapper {
    fn map(&self, line: &str, ctx: &mut MapContext<Vertex, u64>) -> TaskResult<()> {
        if let Some(edge) = read_edge(line, self.policy, ctx)? {
            let (u, v) = edge.into_endpoints();
            ctx.emit(u, 1);
            ctx.emit(v, 1);
        }
        Ok(())
    }
}

/// Sums the partial counts of one vertex into a `v\td` record
#[derive(Debug, Clone, Copy, Default)]
pub struct DegreeReducer;

impl Reducer<Vertex, u64> for DegreeReducer {
    fn reduce(&self, vertex: Vertex, values: Vec<u64>, ctx: &mut ReduceContext) -> TaskResult<()> {
        let degree = values.into_iter().sum();
        ctx.emit(DegreeRecord { vertex, degree });
        Ok(())
    }
}

/// Stage 1 over the raw edge lines
pub fn degree_job(edges: Arc<Vec<String>>, config: &PipelineConfig) -> StageJob<Vertex, u64> {
    let job = StageJob::new(DEGREE_STAGE, DegreeReducer)
        .with_input(edges, DegreeMapper::new(config.input_policy));
    if config.combine {
        job.with_combiner(SumCombiner)
    } else {
        job
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LocalExecutor;
    use std::collections::BTreeMap;

    fn degrees(edges: &[&str], config: &PipelineConfig) -> BTreeMap<Vertex, u64> {
        let executor = LocalExecutor::from_config(config).unwrap();
        let edges = Arc::new(edges.iter().map(|s| s.to_string()).collect());
        let output = executor.run(&degree_job(edges, config)).unwrap();
        output
            .lines()
            .map(|line| {
                let record = DegreeRecord::parse(line).unwrap();
                (record.vertex, record.degree)
            })
            .collect()
    }

    #[test]
    fn test_star_degrees() {
        let config = PipelineConfig::default();
        let result = degrees(&["0 1", "0 2", "3 0"], &config);
        assert_eq!(result[&Vertex::from(0)], 3);
        assert_eq!(result[&Vertex::from(1)], 1);
        assert_eq!(result[&Vertex::from(3)], 1);
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn test_combiner_does_not_change_degrees() {
        let edges = ["1 2", "2 3", "1 3", "3 4", "4 1", "bad", "2 4"];
        let with = degrees(&edges, &PipelineConfig::default().with_map_splits(3));
        let mut config = PipelineConfig::default().with_map_splits(3);
        config.combine = false;
        let without = degrees(&edges, &config);
        assert_eq!(with, without);
        assert_eq!(with[&Vertex::from(2)], 3);
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let config = PipelineConfig::default().with_reducers(1);
        let executor = LocalExecutor::from_config(&config).unwrap();
        let edges = Arc::new(vec!["1 2".to_string(), "1".to_string(), "a b c".to_string()]);
        let output = executor.run(&degree_job(edges, &config)).unwrap();
        assert_eq!(output.counters().skipped_records, 2);
        assert_eq!(output.lines().count(), 2);
    }

    #[test]
    fn test_output_format() {
        let config = PipelineConfig::default().with_reducers(1);
        let executor = LocalExecutor::from_config(&config).unwrap();
        let edges = Arc::new(vec!["5 6".to_string()]);
        let output = executor.run(&degree_job(edges, &config)).unwrap();
        assert_eq!(output.into_lines(), vec!["5\t1", "6\t1"]);
    }
}
