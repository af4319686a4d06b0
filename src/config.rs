//! Pipeline configuration
//!
//! The only knobs are the reducer count, how the input is split across map
//! tasks, the combiner switch, the input policy and where stage outputs are
//! materialized. Everything can be loaded from a YAML file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Semantically invalid value
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// How the pipeline treats input that breaks the simple-graph precondition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InputPolicy {
    /// Self-loops and duplicate edges abort the run
    #[default]
    Strict,
    /// Self-loops are skipped like malformed lines; duplicate edges are
    /// counted as found, which over-counts the triangles they belong to
    Lenient,
}

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of reducers (R) at every shuffle boundary
    pub reducers: usize,
    /// Number of map tasks each input stream is split into
    pub map_splits: usize,
    /// Pre-reduce local aggregation for the summing stages
    pub combine: bool,
    /// Simple-graph precondition handling
    pub input_policy: InputPolicy,
    /// Directory for materialized stage outputs and the report
    /// (None = in-memory only)
    pub work_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            reducers: 8,
            map_splits: 4,
            combine: true,
            input_policy: InputPolicy::Strict,
            work_dir: None,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a YAML file; missing keys take defaults
    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        debug!("Loading pipeline configuration from {:?}", path);
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> ConfigResult<Self> {
        let config: PipelineConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_reducers(mut self, reducers: usize) -> Self {
        self.reducers = reducers;
        self
    }

    pub fn with_map_splits(mut self, map_splits: usize) -> Self {
        self.map_splits = map_splits;
        self
    }

    pub fn with_input_policy(mut self, policy: InputPolicy) -> Self {
        self.input_policy = policy;
        self
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.reducers == 0 {
            return Err(ConfigError::Invalid(
                "reducers must be at least 1".to_string(),
            ));
        }
        if self.map_splits == 0 {
            return Err(ConfigError::Invalid(
                "map_splits must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
