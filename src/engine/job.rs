//! Map, combine and reduce contracts plus the description of one stage
//!
//! A reducer receives a key with the complete, unordered collection of its
//! values. Nothing here promises an order among those values; a reducer that
//! needs one sorts them itself.

use super::TaskResult;
use crate::record::RecordError;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Keys that can cross a shuffle boundary
pub trait RecordKey: Ord + Clone + Send + fmt::Display + 'static {}

impl<T> RecordKey for T where T: Ord + Clone + Send + fmt::Display + 'static {}

/// Values that can cross a shuffle boundary
pub trait RecordValue: Send + fmt::Display + 'static {}

impl<T> RecordValue for T where T: Send + fmt::Display + 'static {}

/// Per-task sink for emitted key/value pairs
pub struct MapContext<K, V> {
    records: Vec<(K, V)>,
    skipped: usize,
}

impl<K, V> MapContext<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            records: Vec::new(),
            skipped: 0,
        }
    }

    pub fn emit(&mut self, key: K, value: V) {
        self.records.push((key, value));
    }

    /// Record a malformed input line; the line produces no output
    pub fn skip(&mut self, line: &str, reason: &RecordError) {
        debug!("Skipping record {:?}: {}", line, reason);
        self.skipped += 1;
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub(crate) fn into_parts(self) -> (Vec<(K, V)>, usize) {
        (self.records, self.skipped)
    }
}

/// Per-reducer sink for output records
#[derive(Debug, Default)]
pub struct ReduceContext {
    lines: Vec<String>,
}

impl ReduceContext {
    pub fn emit(&mut self, record: impl fmt::Display) {
        self.lines.push(record.to_string());
    }

    pub(crate) fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

/// Turns one input line into zero or more key/value pairs
pub trait Mapper<K, V>: Send + Sync {
    fn map(&self, line: &str, ctx: &mut MapContext<K, V>) -> TaskResult<()>;
}

/// Optional map-side pre-aggregation.
///
/// Must be associative and commutative so that applying it to any subset of
/// a key's values leaves the final reduce result unchanged.
pub trait Combiner<K, V>: Send + Sync {
    fn combine(&self, key: &K, values: Vec<V>) -> Vec<V>;
}

/// Folds every value of one key into output records
pub trait Reducer<K, V>: Send + Sync {
    fn reduce(&self, key: K, values: Vec<V>, ctx: &mut ReduceContext) -> TaskResult<()>;
}

/// Sums counts; used by the degree and aggregation stages
#[derive(Debug, Clone, Copy, Default)]
pub struct SumCombiner;

impl<K> Combiner<K, u64> for SumCombiner {
    fn combine(&self, _key: &K, values: Vec<u64>) -> Vec<u64> {
        vec![values.into_iter().sum()]
    }
}

/// One input stream with the mapper that reads it
pub struct MapInput<K, V> {
    pub lines: Arc<Vec<String>>,
    pub mapper: Arc<dyn Mapper<K, V>>,
}

/// Everything the executor needs to run one stage
pub struct StageJob<K, V> {
    name: String,
    inputs: Vec<MapInput<K, V>>,
    combiner: Option<Arc<dyn Combiner<K, V>>>,
    reducer: Arc<dyn Reducer<K, V>>,
}

impl<K: RecordKey, V: RecordValue> StageJob<K, V> {
    pub fn new(name: impl Into<String>, reducer: impl Reducer<K, V> + 'static) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            combiner: None,
            reducer: Arc::new(reducer),
        }
    }

    /// Add a map source; a stage may have several feeding the same reduce
    pub fn with_input(
        mut self,
        lines: Arc<Vec<String>>,
        mapper: impl Mapper<K, V> + 'static,
    ) -> Self {
        self.inputs.push(MapInput {
            lines,
            mapper: Arc::new(mapper),
        });
        self
    }

    pub fn with_combiner(mut self, combiner: impl Combiner<K, V> + 'static) -> Self {
        self.combiner = Some(Arc::new(combiner));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &[MapInput<K, V>] {
        &self.inputs
    }

    pub fn combiner(&self) -> Option<&dyn Combiner<K, V>> {
        self.combiner.as_deref()
    }

    pub fn reducer(&self) -> &dyn Reducer<K, V> {
        self.reducer.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_combiner() {
        let combined = SumCombiner.combine(&"k", vec![1, 2, 3]);
        assert_eq!(combined, vec![6]);
    }

    #[test]
    fn test_map_context_counts_skips() {
        let mut ctx: MapContext<String, u64> = MapContext::new();
        ctx.emit("a".to_string(), 1);
        ctx.skip("bad line", &RecordError::UnknownTag("bad".to_string()));
        assert_eq!(ctx.skipped(), 1);
        let (records, skipped) = ctx.into_parts();
        assert_eq!(records, vec![("a".to_string(), 1)]);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_reduce_context_renders() {
        let mut ctx = ReduceContext::default();
        ctx.emit(format_args!("{}\t{}", "v", 3));
        assert_eq!(ctx.into_lines(), vec!["v\t3".to_string()]);
    }
}
