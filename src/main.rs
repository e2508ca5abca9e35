//! pytest-batcher - shard a pytest suite for parallel CI workers
//!
//! A CLI tool that turns a flat list of test identifiers into batch
//! descriptors, a manifest, and a runner script, then merges the per-batch
//! JSON reports back into one combined report.
//!
//! ## Features
//!
//! - Flat or module-grouped batching with a large-module split threshold
//! - Shell script generation with per-batch `|| true` isolation
//! - Result merging that tolerates corrupt batch reports
//! - Layered configuration (file, environment, flags)
//!
//! ## Usage
//!
//! ```bash
//! # Plan batches and generate a runner script
//! pytest-batcher --input tests.txt --pr-id 1234 --batch-size 20 --generate-script --tox-env py311
//!
//! # Plan only previously failed tests under a separate label
//! pytest-batcher --input failed.txt --pr-id 1234 --prefix failed
//!
//! # Merge per-batch reports for one matrix job
//! pytest-batcher --merge-results --pr-id 1234 --workflow-id linux-py311
//!
//! # Write an example configuration file
//! pytest-batcher config init
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use tracing::{debug, info, warn};

mod cli;
mod config;
mod models;
mod output;
mod planner;
mod results;
mod script;
mod utils;

use cli::Args;
use config::env::EnvConfig;
use config::file::ConfigFile;
use config::AppConfig;
use models::Strategy;
use output::{OutputFormat, ResultFormatter};
use planner::BatchPlanner;
use results::{ArtifactStore, MergeOutcome, ResultMerger};
use script::{MergeStep, ScriptOptions};
use utils::{init_logger, LogLevel, StageTimer};

fn main() -> Result<()> {
    let mut args = Args::parse();
    let env = EnvConfig::load();

    if let Some(cli::Command::Config(config_args)) = args.command.take() {
        init_logger(LogLevel::resolve(
            args.verbose,
            env.log_level.as_deref().unwrap_or("info"),
        ));
        return manage_config(config_args, &env);
    }

    let config = resolve_config(&args, &env)?;
    init_logger(LogLevel::resolve(args.verbose, &config.log_level));

    let formatter =
        ResultFormatter::new(OutputFormat::from_str(&args.format).unwrap_or(OutputFormat::Table));

    if args.merge_results {
        merge_results(&args, &config, &formatter)
    } else {
        plan_batches(&args, &config, &formatter)
    }
}

/// Defaults, then config file, then environment, then flags
fn resolve_config(args: &Args, env: &EnvConfig) -> Result<AppConfig> {
    let file = match args.config.as_ref().or(env.config_file.as_ref()) {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::load_default()?,
    };
    layer_config(file, env, args)
}

fn layer_config(file: ConfigFile, env: &EnvConfig, args: &Args) -> Result<AppConfig> {
    let mut config = file.app;
    if env.has_any() {
        debug!("Applying PYTEST_BATCHER_* environment overrides");
        env.apply(&mut config);
    }
    apply_args(args, &mut config)?;
    config.validate()?;
    Ok(config)
}

fn apply_args(args: &Args, config: &mut AppConfig) -> Result<()> {
    if let Some(output_dir) = &args.output_dir {
        config.output_dir = output_dir.clone();
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(strategy) = &args.strategy {
        config.strategy = Strategy::from_str(strategy)
            .with_context(|| format!("Unknown strategy: {strategy} (expected flat or grouped)"))?;
    }
    if let Some(threshold) = args.large_module_threshold {
        config.large_module_threshold = Some(threshold);
    }
    if let Some(chunk_size) = args.large_module_chunk_size {
        config.large_module_chunk_size = chunk_size;
    }
    if let Some(tox_env) = &args.tox_env {
        config.script.environment = Some(tox_env.clone()).filter(|e| !e.is_empty());
    }
    if let Some(max_command_length) = args.max_command_length {
        config.script.max_command_length = max_command_length;
    }
    if args.no_merge_step {
        config.script.append_merge = false;
    }
    Ok(())
}

fn pr_id(args: &Args) -> Result<&str> {
    args.pr_id.as_deref().context("--pr-id is required")
}

fn plan_batches(args: &Args, config: &AppConfig, formatter: &ResultFormatter) -> Result<()> {
    let mut timer = StageTimer::start("plan");
    let pr_id = pr_id(args)?;
    let input = args
        .input
        .as_deref()
        .context("--input is required unless --merge-results is set")?;

    let planner = BatchPlanner::new(config, pr_id, args.workflow_id.clone(), args.prefix.clone())?;
    let outcome = planner.plan_file(Path::new(input))?;
    timer.stage("batches");

    println!(
        "{}",
        formatter.format_plan(&outcome.manifest_path, &outcome.manifest)
    );

    if args.generate_script {
        let merge_step = config.script.append_merge.then(|| MergeStep {
            program: env!("CARGO_PKG_NAME").to_string(),
            output_dir: config.output_dir.clone(),
            run_id: pr_id.to_string(),
            workflow_id: args.workflow_id.clone(),
            prefix: args.prefix.clone(),
        });
        let options = ScriptOptions {
            launcher: config.script.launcher.clone(),
            environment: config.script.environment.clone(),
            max_command_length: config.script.max_command_length,
            merge_step,
        };

        let script = script::generate_script(&outcome.manifest_path, planner.store(), options)?;
        timer.stage("script");

        println!("{}", formatter.format_script(&script));
    }

    timer.finish();
    Ok(())
}

fn merge_results(args: &Args, config: &AppConfig, formatter: &ResultFormatter) -> Result<()> {
    let mut timer = StageTimer::start("merge");
    let store = ArtifactStore::new(&config.output_dir, pr_id(args)?, args.workflow_id.as_deref())
        .with_prefix(args.prefix.clone());
    let merger = ResultMerger::new(store);

    match merger.merge_dir()? {
        MergeOutcome::NoBatchFiles { dir } => {
            println!("{}", formatter.format_no_batches(&dir));
            if args.export.is_some() {
                warn!("Nothing to export");
            }
        }
        MergeOutcome::Merged { path, report } => {
            timer.stage("merge");
            println!("{}", formatter.format_merge(&path, &report));

            if let Some(export) = &args.export {
                output::export_csv(&report.combined, Path::new(export))?;
                println!("✓ Results exported to: {export}");
            }
        }
    }

    timer.finish();
    Ok(())
}

fn manage_config(args: cli::ConfigArgs, env: &EnvConfig) -> Result<()> {
    match args.action {
        cli::ConfigAction::Init { file, force } => {
            if Path::new(&file).exists() && !force {
                anyhow::bail!("{file} already exists (use --force to overwrite)");
            }
            ConfigFile::example().save(&file)?;
            info!("Wrote example configuration");
            println!("✓ Created configuration file: {file}");
        }

        cli::ConfigAction::Show { file } => {
            let mut config = match file.as_ref().or(env.config_file.as_ref()) {
                Some(path) => ConfigFile::load(path)?,
                None => ConfigFile::load_default()?,
            };
            env.apply(&mut config.app);
            println!("{}", serde_yaml::to_string(&config)?);
        }

        cli::ConfigAction::Env => {
            config::env::print_env_help();
        }
    }

    Ok(())
}
