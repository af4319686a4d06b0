//! Local stage executor
//!
//! Runs one `StageJob` to completion: map tasks over input splits in
//! parallel, optional combine inside each map task, routing through the
//! partitioner, then one reduce task per partition, also in parallel.
//! A stage either returns its complete output or an error; there is no
//! partial result.

use super::job::{MapContext, RecordKey, RecordValue, ReduceContext, StageJob};
use super::partitioner::Partitioner;
use super::{EngineError, EngineResult, TaskError, TaskResult};
use crate::config::PipelineConfig;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::Range;
use tracing::{debug, info, warn};

/// Record counts of one stage run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageCounters {
    pub map_tasks: usize,
    pub input_records: usize,
    pub skipped_records: usize,
    pub shuffled_records: usize,
    pub output_records: usize,
}

/// Complete output of a stage: one list of lines per reducer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutput {
    stage: String,
    parts: Vec<Vec<String>>,
    counters: StageCounters,
}

impl StageOutput {
    pub fn new(
        stage: impl Into<String>,
        parts: Vec<Vec<String>>,
        counters: StageCounters,
    ) -> Self {
        Self {
            stage: stage.into(),
            parts,
            counters,
        }
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn parts(&self) -> &[Vec<String>] {
        &self.parts
    }

    pub fn counters(&self) -> &StageCounters {
        &self.counters
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().flatten().map(String::as_str)
    }

    /// All lines in partition order
    pub fn into_lines(self) -> Vec<String> {
        self.parts.into_iter().flatten().collect()
    }
}

/// Map output routed to reducers, before grouping
pub struct ShuffleOutput<K, V> {
    stage: String,
    partitions: Vec<Vec<(K, V)>>,
    counters: StageCounters,
}

impl<K: RecordKey, V: RecordValue> ShuffleOutput<K, V> {
    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn partitions(&self) -> &[Vec<(K, V)>] {
        &self.partitions
    }

    pub fn counters(&self) -> &StageCounters {
        &self.counters
    }

    /// Intermediate records as `key\tvalue` lines, one list per reducer
    pub fn render(&self) -> Vec<Vec<String>> {
        self.partitions
            .iter()
            .map(|records| {
                records
                    .iter()
                    .map(|(key, value)| format!("{}\t{}", key, value))
                    .collect()
            })
            .collect()
    }
}

struct MapTask {
    input: usize,
    range: Range<usize>,
}

struct MapTaskOutput<K, V> {
    buckets: Vec<Vec<(K, V)>>,
    input_records: usize,
    skipped_records: usize,
}

/// Runs stages on the current process
#[derive(Debug, Clone)]
pub struct LocalExecutor {
    partitioner: Partitioner,
    map_splits: usize,
}

impl LocalExecutor {
    pub fn new(reducers: usize, map_splits: usize) -> EngineResult<Self> {
        if map_splits == 0 {
            return Err(EngineError::InvalidSplitCount(map_splits));
        }
        Ok(Self {
            partitioner: Partitioner::new(reducers)?,
            map_splits,
        })
    }

    pub fn from_config(config: &PipelineConfig) -> EngineResult<Self> {
        Self::new(config.reducers, config.map_splits)
    }

    pub fn partitioner(&self) -> &Partitioner {
        &self.partitioner
    }

    /// Run map, shuffle and reduce
    pub fn run<K: RecordKey, V: RecordValue>(
        &self,
        job: &StageJob<K, V>,
    ) -> EngineResult<StageOutput> {
        let shuffle = self.shuffle(job)?;
        self.reduce(job, shuffle)
    }

    /// Run the map phase and route its output to reducers
    pub fn shuffle<K: RecordKey, V: RecordValue>(
        &self,
        job: &StageJob<K, V>,
    ) -> EngineResult<ShuffleOutput<K, V>> {
        let tasks = self.plan(job);
        info!("Stage {}: starting {} map tasks", job.name(), tasks.len());

        let outputs = tasks
            .par_iter()
            .map(|task| self.run_map_task(job, task))
            .collect::<TaskResult<Vec<_>>>()
            .map_err(|source| task_failed(job.name(), source))?;

        let reducers = self.partitioner.reducers();
        let mut partitions: Vec<Vec<(K, V)>> = (0..reducers).map(|_| Vec::new()).collect();
        let mut counters = StageCounters {
            map_tasks: tasks.len(),
            ..StageCounters::default()
        };

        for output in outputs {
            counters.input_records += output.input_records;
            counters.skipped_records += output.skipped_records;
            for (partition, bucket) in partitions.iter_mut().zip(output.buckets) {
                counters.shuffled_records += bucket.len();
                partition.extend(bucket);
            }
        }

        if counters.skipped_records > 0 {
            warn!(
                "Stage {}: skipped {} malformed records",
                job.name(),
                counters.skipped_records
            );
        }

        Ok(ShuffleOutput {
            stage: job.name().to_string(),
            partitions,
            counters,
        })
    }

    /// Group each partition by key and run the reducer over every group
    pub fn reduce<K: RecordKey, V: RecordValue>(
        &self,
        job: &StageJob<K, V>,
        shuffle: ShuffleOutput<K, V>,
    ) -> EngineResult<StageOutput> {
        let ShuffleOutput {
            stage,
            partitions,
            mut counters,
        } = shuffle;

        let parts = partitions
            .into_par_iter()
            .enumerate()
            .map(|(index, records)| -> TaskResult<Vec<String>> {
                let groups = group_by_key(records);
                let keys = groups.len();
                let mut ctx = ReduceContext::default();
                for (key, values) in groups {
                    job.reducer().reduce(key, values, &mut ctx)?;
                }
                let lines = ctx.into_lines();
                debug!(
                    "Stage {}: reducer {} folded {} keys into {} records",
                    job.name(),
                    index,
                    keys,
                    lines.len()
                );
                Ok(lines)
            })
            .collect::<TaskResult<Vec<_>>>()
            .map_err(|source| task_failed(&stage, source))?;

        counters.output_records = parts.iter().map(Vec::len).sum();
        info!(
            "Stage {}: {} input records, {} shuffled, {} output records",
            stage, counters.input_records, counters.shuffled_records, counters.output_records
        );

        Ok(StageOutput::new(stage, parts, counters))
    }

    fn plan<K: RecordKey, V: RecordValue>(&self, job: &StageJob<K, V>) -> Vec<MapTask> {
        let mut tasks = Vec::new();
        for (input, source) in job.inputs().iter().enumerate() {
            let len = source.lines.len();
            if len == 0 {
                continue;
            }
            let chunk = len.div_ceil(self.map_splits);
            let mut start = 0;
            while start < len {
                let end = (start + chunk).min(len);
                tasks.push(MapTask {
                    input,
                    range: start..end,
                });
                start = end;
            }
        }
        tasks
    }

    fn run_map_task<K: RecordKey, V: RecordValue>(
        &self,
        job: &StageJob<K, V>,
        task: &MapTask,
    ) -> TaskResult<MapTaskOutput<K, V>> {
        let source = &job.inputs()[task.input];
        let mut ctx = MapContext::new();
        for line in &source.lines[task.range.clone()] {
            source.mapper.map(line, &mut ctx)?;
        }
        let (mut records, skipped_records) = ctx.into_parts();

        if let Some(combiner) = job.combiner() {
            let before = records.len();
            let mut combined = Vec::with_capacity(before);
            for (key, values) in group_by_key(records) {
                for value in combiner.combine(&key, values) {
                    combined.push((key.clone(), value));
                }
            }
            records = combined;
            debug!(
                "Stage {}: combiner reduced {} records to {}",
                job.name(),
                before,
                records.len()
            );
        }

        let mut buckets: Vec<Vec<(K, V)>> =
            (0..self.partitioner.reducers()).map(|_| Vec::new()).collect();
        for (key, value) in records {
            let partition = self.partitioner.partition(&key);
            buckets[partition].push((key, value));
        }

        Ok(MapTaskOutput {
            buckets,
            input_records: task.range.len(),
            skipped_records,
        })
    }
}

fn group_by_key<K: Ord, V>(records: Vec<(K, V)>) -> BTreeMap<K, Vec<V>> {
    let mut groups: BTreeMap<K, Vec<V>> = BTreeMap::new();
    for (key, value) in records {
        groups.entry(key).or_default().push(value);
    }
    groups
}

fn task_failed(stage: &str, source: TaskError) -> EngineError {
    EngineError::Task {
        stage: stage.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::job::{MapContext, Mapper, Reducer, SumCombiner};
    use crate::engine::TaskError;
    use std::sync::Arc;

    struct WordMapper;

    impl Mapper<String, u64> for WordMapper {
        fn map(&self, line: &str, ctx: &mut MapContext<String, u64>) -> TaskResult<()> {
            for word in line.split_whitespace() {
                ctx.emit(word.to_string(), 1);
            }
            Ok(())
        }
    }

    struct CountReducer;

    impl Reducer<String, u64> for CountReducer {
        fn reduce(&self, key: String, values: Vec<u64>, ctx: &mut ReduceContext) -> TaskResult<()> {
            ctx.emit(format_args!("{}\t{}", key, values.into_iter().sum::<u64>()));
            Ok(())
        }
    }

    struct FailingReducer;

    impl Reducer<String, u64> for FailingReducer {
        fn reduce(
            &self,
            key: String,
            _values: Vec<u64>,
            _ctx: &mut ReduceContext,
        ) -> TaskResult<()> {
            Err(TaskError::SelfLoop { record: key })
        }
    }

    fn lines(text: &[&str]) -> Arc<Vec<String>> {
        Arc::new(text.iter().map(|s| s.to_string()).collect())
    }

    fn sorted(output: StageOutput) -> Vec<String> {
        let mut lines = output.into_lines();
        lines.sort();
        lines
    }

    #[test]
    fn test_zero_splits_rejected() {
        assert!(matches!(
            LocalExecutor::new(2, 0),
            Err(EngineError::InvalidSplitCount(0))
        ));
    }

    #[test]
    fn test_word_count() {
        let executor = LocalExecutor::new(3, 2).unwrap();
        let job = StageJob::new("words", CountReducer)
            .with_input(lines(&["a b a", "c a", "b"]), WordMapper);
        let output = executor.run(&job).unwrap();

        assert_eq!(output.parts().len(), 3);
        assert_eq!(output.counters().input_records, 3);
        assert_eq!(output.counters().shuffled_records, 6);
        assert_eq!(sorted(output), vec!["a\t3", "b\t2", "c\t1"]);
    }

    #[test]
    fn test_combiner_keeps_result() {
        let executor = LocalExecutor::new(2, 1).unwrap();
        let input = lines(&["x x x y", "x y"]);
        let plain = StageJob::new("plain", CountReducer).with_input(input.clone(), WordMapper);
        let combined = StageJob::new("combined", CountReducer)
            .with_input(input, WordMapper)
            .with_combiner(SumCombiner);

        let plain_out = executor.run(&plain).unwrap();
        let combined_out = executor.run(&combined).unwrap();

        // one map task, so the combiner leaves one record per key
        assert_eq!(combined_out.counters().shuffled_records, 2);
        assert_eq!(plain_out.counters().shuffled_records, 6);
        assert_eq!(sorted(plain_out), sorted(combined_out));
    }

    #[test]
    fn test_multiple_inputs_share_reduce() {
        let executor = LocalExecutor::new(4, 3).unwrap();
        let job = StageJob::new("two-sources", CountReducer)
            .with_input(lines(&["k"]), WordMapper)
            .with_input(lines(&["k k"]), WordMapper);
        assert_eq!(sorted(executor.run(&job).unwrap()), vec!["k\t3"]);
    }

    #[test]
    fn test_same_key_lands_in_one_partition() {
        let executor = LocalExecutor::new(5, 4).unwrap();
        let job = StageJob::new("route", CountReducer)
            .with_input(lines(&["p q", "p", "q p", "r"]), WordMapper);
        let shuffle = executor.shuffle(&job).unwrap();

        for (index, partition) in shuffle.partitions().iter().enumerate() {
            for (key, _) in partition {
                assert_eq!(executor.partitioner().partition(key), index);
            }
        }
        let rendered: Vec<String> = shuffle.render().into_iter().flatten().collect();
        assert_eq!(rendered.iter().filter(|l| *l == "p\t1").count(), 3);
    }

    #[test]
    fn test_empty_input() {
        let executor = LocalExecutor::new(2, 2).unwrap();
        let job = StageJob::new("empty", CountReducer).with_input(lines(&[]), WordMapper);
        let output = executor.run(&job).unwrap();
        assert_eq!(output.counters().map_tasks, 0);
        assert_eq!(output.lines().count(), 0);
    }

    #[test]
    fn test_task_failure_aborts_stage() {
        let executor = LocalExecutor::new(2, 2).unwrap();
        let job = StageJob::new("doomed", FailingReducer).with_input(lines(&["a"]), WordMapper);
        match executor.run(&job) {
            Err(EngineError::Task { stage, source }) => {
                assert_eq!(stage, "doomed");
                assert_eq!(source, TaskError::SelfLoop { record: "a".to_string() });
            }
            other => panic!("expected task failure, got {:?}", other),
        }
    }
}
