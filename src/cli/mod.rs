//! CLI argument parsing
//!
//! Defines command-line interface using clap. Planning is the default mode;
//! `--merge-results` switches to merging and drops the `--input` requirement.

use clap::{Parser, Subcommand};

/// Batch a pytest suite into manifests and merge per-batch results
#[derive(Parser, Debug)]
#[command(name = "pytest-batcher")]
#[command(version)]
#[command(about = "Split test identifiers into batches and merge per-batch JSON reports")]
#[command(long_about = None)]
#[command(subcommand_negates_reqs = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Input file with test identifiers (one per line)
    #[arg(short, long, required_unless_present = "merge_results", conflicts_with = "merge_results")]
    pub input: Option<String>,

    /// Output directory for JSON files
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// PR ID for naming artifacts
    #[arg(short, long, required = true)]
    pub pr_id: Option<String>,

    /// Number of tests per batch
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Partitioning strategy (flat, grouped)
    #[arg(long)]
    pub strategy: Option<String>,

    /// Modules with more tests than this are split into fixed-size chunks
    #[arg(long)]
    pub large_module_threshold: Option<usize>,

    /// Chunk size for modules above the threshold
    #[arg(long)]
    pub large_module_chunk_size: Option<usize>,

    /// Generate bash script
    #[arg(short, long)]
    pub generate_script: bool,

    /// Prefix for output files (e.g., "failed" for failed tests)
    #[arg(long, default_value = "")]
    pub prefix: String,

    /// Tox environment the script runs under
    #[arg(long)]
    pub tox_env: Option<String>,

    /// Workflow ID partitioning artifacts within a PR
    #[arg(long)]
    pub workflow_id: Option<String>,

    /// Merge per-batch result files instead of planning
    #[arg(long)]
    pub merge_results: bool,

    /// Longest inline batch command before tests move to a side file
    #[arg(long)]
    pub max_command_length: Option<usize>,

    /// Do not append the merge step to the generated script
    #[arg(long)]
    pub no_merge_step: bool,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table")]
    pub format: String,

    /// Export merged test records to a CSV file
    #[arg(long, requires = "merge_results")]
    pub export: Option<String>,

    /// Configuration file (YAML or JSON)
    #[arg(long)]
    pub config: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for configuration management
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write an example configuration file
    Init {
        /// Output file path
        #[arg(short, long, default_value = "./pytest-batcher.yaml")]
        file: String,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration
    Show {
        /// Configuration file to load
        #[arg(short, long)]
        file: Option<String>,
    },

    /// List supported environment variables
    Env,
}
