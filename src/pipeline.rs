//! Four-stage triangle counting pipeline
//!
//! Every stage runs on the blocking pool and the next stage starts only after
//! the previous handle resolved with its complete output. With a work
//! directory configured, each stage output is written to disk and the next
//! stage reads it back from there, so the on-disk streams are exactly what
//! the stages consumed. A run first clears whatever an earlier run left in
//! the work directory.

use crate::config::{ConfigError, PipelineConfig};
use crate::engine::{EngineError, EngineResult, LocalExecutor, StageOutput};
use crate::persistence::{EdgeSource, StageStore, StoreError};
use crate::record::{RecordError, RecordResult};
use crate::stages::{
    aggregate_job, degree_job, orient_job, wedge_job, DegreeTable, TriangleReport, TriangleTally,
    STAGES, WEDGE_STAGE,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::info;

/// Pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    /// A stage task panicked or was cancelled
    #[error("Stage task failed: {0}")]
    Join(#[from] JoinError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Stage 1
pub fn run_degree_stage(
    executor: &LocalExecutor,
    edges: Arc<Vec<String>>,
    config: &PipelineConfig,
) -> EngineResult<StageOutput> {
    executor.run(&degree_job(edges, config))
}

/// Stage 2; `degrees` must be the complete stage-1 output
pub fn run_orient_stage(
    executor: &LocalExecutor,
    edges: Arc<Vec<String>>,
    degrees: &[String],
    config: &PipelineConfig,
) -> EngineResult<StageOutput> {
    let table = DegreeTable::from_lines(degrees.iter().map(String::as_str));
    info!("Degree table holds {} vertices", table.len());
    executor.run(&orient_job(edges, Arc::new(table), config))
}

/// Stage 3, optionally dumping the tagged pair records to `shuffle_store`
pub fn run_close_stage(
    executor: &LocalExecutor,
    adjacency: Arc<Vec<String>>,
    edges: Arc<Vec<String>>,
    config: &PipelineConfig,
    shuffle_store: Option<&StageStore>,
) -> PipelineResult<StageOutput> {
    let job = wedge_job(adjacency, edges, config);
    let shuffle = executor.shuffle(&job)?;
    if let Some(store) = shuffle_store {
        let dir = store.write_shuffle(&shuffle)?;
        info!("Stage {}: tagged pair records written to {:?}", WEDGE_STAGE, dir);
    }
    Ok(executor.reduce(&job, shuffle)?)
}

/// Stage 4
pub fn run_aggregate_stage(
    executor: &LocalExecutor,
    contributions: Arc<Vec<String>>,
    config: &PipelineConfig,
) -> EngineResult<StageOutput> {
    executor.run(&aggregate_job(contributions, config))
}

/// Fold every stage-4 reducer output into one report
pub fn build_report(output: &StageOutput) -> RecordResult<TriangleReport> {
    let tally = output
        .parts()
        .iter()
        .map(|part| TriangleTally::from_lines(part.iter().map(String::as_str)))
        .try_fold(TriangleTally::default(), |acc, part| part.map(|t| acc.merge(t)))?;
    Ok(tally.into_report())
}

/// Runs the four stages in sequence
#[derive(Debug, Clone)]
pub struct TriangleCounter {
    config: Arc<PipelineConfig>,
    executor: Arc<LocalExecutor>,
    store: Option<Arc<StageStore>>,
    shuffle_store: Option<Arc<StageStore>>,
}

impl TriangleCounter {
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        config.validate()?;
        let executor = LocalExecutor::from_config(&config)?;
        let store = match &config.work_dir {
            Some(dir) => Some(Arc::new(StageStore::new(dir)?)),
            None => None,
        };
        Ok(Self {
            config: Arc::new(config),
            executor: Arc::new(executor),
            store,
            shuffle_store: None,
        })
    }

    /// Also dump the stage-3 tagged pair records
    pub fn with_shuffle_store(mut self, store: StageStore) -> Self {
        self.shuffle_store = Some(Arc::new(store));
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> Option<&StageStore> {
        self.store.as_deref()
    }

    pub async fn run(&self, source: EdgeSource) -> PipelineResult<TriangleReport> {
        info!(
            "Pipeline: starting with {} reducers, {} map splits",
            self.config.reducers, self.config.map_splits
        );
        let edges = Arc::new(self.blocking(move || Ok(source.load()?)).await?);

        if self.store.is_some() || self.shuffle_store.is_some() {
            let (store, shuffle_store) = (self.store.clone(), self.shuffle_store.clone());
            self.blocking(move || {
                if let Some(store) = &store {
                    store.clear_run(&STAGES)?;
                }
                if let Some(store) = &shuffle_store {
                    store.clear_shuffle(WEDGE_STAGE)?;
                }
                Ok(())
            })
            .await?;
        }

        let degrees = {
            let (executor, config, edges) =
                (self.executor.clone(), self.config.clone(), edges.clone());
            let store = self.store.clone();
            self.blocking(move || {
                let output = run_degree_stage(&executor, edges, &config)?;
                materialize(store.as_deref(), output)
            })
            .await?
        };

        let adjacency = {
            let (executor, config, edges) =
                (self.executor.clone(), self.config.clone(), edges.clone());
            let store = self.store.clone();
            self.blocking(move || {
                let output = run_orient_stage(&executor, edges, &degrees, &config)?;
                materialize(store.as_deref(), output)
            })
            .await?
        };

        let contributions = {
            let (executor, config) = (self.executor.clone(), self.config.clone());
            let (store, shuffle_store) = (self.store.clone(), self.shuffle_store.clone());
            self.blocking(move || {
                let output = run_close_stage(
                    &executor,
                    Arc::new(adjacency),
                    edges,
                    &config,
                    shuffle_store.as_deref(),
                )?;
                materialize(store.as_deref(), output)
            })
            .await?
        };

        let report = {
            let (executor, config) = (self.executor.clone(), self.config.clone());
            let store = self.store.clone();
            self.blocking(move || {
                let output = run_aggregate_stage(&executor, Arc::new(contributions), &config)?;
                if let Some(store) = &store {
                    store.write(&output)?;
                }
                let report = build_report(&output)?;
                if let Some(store) = &store {
                    store.write_report(&report)?;
                }
                Ok(report)
            })
            .await?
        };

        info!(
            "Pipeline: {} triangles across {} vertices",
            report.total_triangles,
            report.vertex_counts.len()
        );
        Ok(report)
    }

    /// Run `f` on the blocking pool; resolving the handle is the stage barrier
    async fn blocking<T, F>(&self, f: F) -> PipelineResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> PipelineResult<T> + Send + 'static,
    {
        tokio::task::spawn_blocking(f).await?
    }
}

/// Hand a finished stage to the next one, through the store when there is one
fn materialize(store: Option<&StageStore>, output: StageOutput) -> PipelineResult<Vec<String>> {
    match store {
        Some(store) => {
            store.write(&output)?;
            Ok(store.read(output.stage())?)
        }
        None => Ok(output.into_lines()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputPolicy;
    use crate::engine::TaskError;
    use crate::graph::Vertex;
    use crate::stages::{AGGREGATE_STAGE, DEGREE_STAGE};
    use tempfile::TempDir;

    async fn count(edges: &[&str], config: PipelineConfig) -> PipelineResult<TriangleReport> {
        TriangleCounter::new(config)?
            .run(EdgeSource::from_lines(edges.iter().copied()))
            .await
    }

    #[tokio::test]
    async fn test_single_triangle() {
        let report = count(&["1 2", "2 3", "1 3"], PipelineConfig::default())
            .await
            .unwrap();
        assert_eq!(report.total_triangles, 1);
        assert_eq!(report.to_string(), "total_triangles 1\n1 1\n2 1\n3 1\n");
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let result = TriangleCounter::new(PipelineConfig::default().with_reducers(0));
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[tokio::test]
    async fn test_self_loop_policies() {
        let edges = ["1 2", "2 3", "1 3", "3 3"];
        let strict = count(&edges, PipelineConfig::default()).await;
        assert!(matches!(
            strict,
            Err(PipelineError::Engine(EngineError::Task {
                source: TaskError::SelfLoop { .. },
                ..
            }))
        ));

        let lenient = count(
            &edges,
            PipelineConfig::default().with_input_policy(InputPolicy::Lenient),
        )
        .await
        .unwrap();
        assert_eq!(lenient.total_triangles, 1);
    }

    #[tokio::test]
    async fn test_work_dir_holds_every_stage() {
        let temp_dir = TempDir::new().unwrap();
        let config = PipelineConfig::default()
            .with_reducers(2)
            .with_work_dir(temp_dir.path());
        let counter = TriangleCounter::new(config).unwrap();
        let report = counter
            .run(EdgeSource::from_lines(["1 2", "2 3", "1 3", "3 4"]))
            .await
            .unwrap();

        let store = counter.store().unwrap();
        for stage in STAGES {
            assert!(store.has_stage(stage), "missing {}", stage);
        }
        let mut degrees = store.read(DEGREE_STAGE).unwrap();
        degrees.sort();
        assert_eq!(degrees, vec!["1\t2", "2\t2", "3\t3", "4\t1"]);
        assert_eq!(report.count_for(&Vertex::from(4)), 0);
        assert!(temp_dir.path().join(crate::persistence::REPORT_FILE).is_file());
    }

    #[tokio::test]
    async fn test_aborted_run_leaves_no_earlier_output() {
        let temp_dir = TempDir::new().unwrap();
        let counter =
            TriangleCounter::new(PipelineConfig::default().with_work_dir(temp_dir.path()))
                .unwrap();
        counter
            .run(EdgeSource::from_lines(["1 2", "2 3", "1 3"]))
            .await
            .unwrap();
        let report_path = temp_dir.path().join(crate::persistence::REPORT_FILE);
        assert!(report_path.is_file());

        let result = counter
            .run(EdgeSource::from_lines(["1 2", "2 1", "5 6"]))
            .await;
        assert!(matches!(
            result,
            Err(PipelineError::Engine(EngineError::Task {
                source: TaskError::DuplicateEdge { .. },
                ..
            }))
        ));

        let store = counter.store().unwrap();
        assert!(!report_path.exists());
        assert!(!temp_dir
            .path()
            .join(crate::persistence::REPORT_JSON_FILE)
            .exists());
        assert!(!store.has_stage(WEDGE_STAGE));
        assert!(!store.has_stage(AGGREGATE_STAGE));
        // stages that finished belong to the aborted run
        let mut degrees = store.read(DEGREE_STAGE).unwrap();
        degrees.sort();
        assert_eq!(degrees, vec!["1\t2", "2\t2", "5\t1", "6\t1"]);
    }

    #[test]
    fn test_stages_run_separately() {
        let config = PipelineConfig::default().with_reducers(3);
        let executor = LocalExecutor::from_config(&config).unwrap();
        let edges: Arc<Vec<String>> = Arc::new(
            ["1 2", "1 3", "1 4", "2 3", "2 4", "3 4"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );

        let degrees = run_degree_stage(&executor, edges.clone(), &config).unwrap();
        let adjacency =
            run_orient_stage(&executor, edges.clone(), &degrees.into_lines(), &config).unwrap();
        let closing = run_close_stage(
            &executor,
            Arc::new(adjacency.into_lines()),
            edges,
            &config,
            None,
        )
        .unwrap();
        let totals =
            run_aggregate_stage(&executor, Arc::new(closing.into_lines()), &config).unwrap();
        let report = build_report(&totals).unwrap();

        assert_eq!(report.total_triangles, 4);
        for v in 1..=4 {
            assert_eq!(report.count_for(&Vertex::from(v)), 3);
        }
    }
}
