//! Configuration module
//!
//! Handles loading and managing configuration. Values are layered:
//! built-in defaults, then a config file, then `PYTEST_BATCHER_*`
//! environment variables, then command-line flags.

pub mod env;
pub mod file;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Strategy;

/// Fatal configuration problems
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Batch size must be at least 1, got {0}")]
    InvalidBatchSize(usize),

    #[error("Large-module chunk size must be at least 1, got {0}")]
    InvalidChunkSize(usize),

    #[error("Large-module threshold must be at least 1, got {0}")]
    InvalidThreshold(usize),

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(String),

    #[error("Cannot read input file {path}: {source}")]
    InputUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Application configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Target number of tests per batch
    pub batch_size: usize,

    /// Partitioning strategy
    pub strategy: Strategy,

    /// Modules with more tests than this are split into fixed-size chunks
    pub large_module_threshold: Option<usize>,

    /// Chunk size used when splitting a large module
    pub large_module_chunk_size: usize,

    /// Suffix identifying a bare module path
    pub module_suffix: String,

    /// Root directory for generated artifacts
    pub output_dir: String,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Test runner invocation
    pub runner: RunnerConfig,

    /// Shell script rendering
    pub script: ScriptConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            strategy: Strategy::default(),
            large_module_threshold: Some(200),
            large_module_chunk_size: 100,
            module_suffix: ".py".to_string(),
            output_dir: "artifacts".to_string(),
            log_level: "info".to_string(),
            runner: RunnerConfig::default(),
            script: ScriptConfig::default(),
        }
    }
}

impl AppConfig {
    /// Reject settings the planner cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }
        if self.large_module_chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize(self.large_module_chunk_size));
        }
        if let Some(0) = self.large_module_threshold {
            return Err(ConfigError::InvalidThreshold(0));
        }
        Ok(())
    }
}

/// Test runner invocation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Runner executable
    pub executable: String,

    /// Fixed reporting options passed to every batch
    pub options: Vec<String>,

    /// Option that receives the per-batch report path
    pub report_file_option: String,

    /// Append `-v`
    pub verbose: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            executable: "pytest".to_string(),
            options: vec!["--tb=short".to_string(), "--json-report".to_string()],
            report_file_option: "--json-report-file".to_string(),
            verbose: true,
        }
    }
}

/// Shell script rendering
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Wrapper that runs the runner inside a named environment
    pub launcher: String,

    /// Named environment passed to the launcher; none runs the runner directly
    pub environment: Option<String>,

    /// Blocks longer than this read their tests from a side file
    pub max_command_length: usize,

    /// Finish the script with a merge of the batch reports
    pub append_merge: bool,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            launcher: "tox".to_string(),
            environment: None,
            max_command_length: 100_000,
            append_merge: true,
        }
    }
}
