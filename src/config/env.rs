//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;

use super::AppConfig;
use crate::models::Strategy;

/// Environment variable prefix
const ENV_PREFIX: &str = "PYTEST_BATCHER";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvConfig {
    /// Batch size from PYTEST_BATCHER_BATCH_SIZE
    pub batch_size: Option<usize>,
    /// Strategy from PYTEST_BATCHER_STRATEGY
    pub strategy: Option<Strategy>,
    /// Output directory from PYTEST_BATCHER_OUTPUT_DIR
    pub output_dir: Option<String>,
    /// Execution environment from PYTEST_BATCHER_TOX_ENV
    pub tox_env: Option<String>,
    /// Command length threshold from PYTEST_BATCHER_MAX_COMMAND_LENGTH
    pub max_command_length: Option<usize>,
    /// Log level from PYTEST_BATCHER_LOG_LEVEL
    pub log_level: Option<String>,
    /// Config file from PYTEST_BATCHER_CONFIG
    pub config_file: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self::load_with(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| {
            lookup(&format!("{ENV_PREFIX}_{name}")).filter(|value| !value.trim().is_empty())
        };

        Self {
            batch_size: get("BATCH_SIZE").and_then(|v| v.trim().parse().ok()),
            strategy: get("STRATEGY").and_then(|v| Strategy::from_str(v.trim())),
            output_dir: get("OUTPUT_DIR"),
            tox_env: get("TOX_ENV"),
            max_command_length: get("MAX_COMMAND_LENGTH").and_then(|v| v.trim().parse().ok()),
            log_level: get("LOG_LEVEL"),
            config_file: get("CONFIG"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self != &Self::default()
    }

    /// Overlay the variables that are set onto a config
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }
        if let Some(tox_env) = &self.tox_env {
            config.script.environment = Some(tox_env.clone());
        }
        if let Some(max_command_length) = self.max_command_length {
            config.script.max_command_length = max_command_length;
        }
        if let Some(log_level) = &self.log_level {
            config.log_level = log_level.clone();
        }
    }
}

/// Print all PYTEST_BATCHER environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_BATCH_SIZE          Tests per batch");
    println!("  {ENV_PREFIX}_STRATEGY            Partitioning strategy (flat, grouped)");
    println!("  {ENV_PREFIX}_OUTPUT_DIR          Root directory for artifacts");
    println!("  {ENV_PREFIX}_TOX_ENV             Environment the generated script runs under");
    println!("  {ENV_PREFIX}_MAX_COMMAND_LENGTH  Longest inline command before using a tests file");
    println!("  {ENV_PREFIX}_LOG_LEVEL           Log level (trace, debug, info, warn, error)");
    println!("  {ENV_PREFIX}_CONFIG              Path to configuration file");
    println!();
    println!("Example:");
    println!("  export {ENV_PREFIX}_BATCH_SIZE=20");
    println!("  export {ENV_PREFIX}_TOX_ENV=py311");
    println!("  pytest-batcher --input tests.txt --pr-id 1234 --generate-script");
}
