//! Batch planning
//!
//! An explicit pipeline: normalize the raw lines, partition them, write one
//! descriptor per batch, then write the manifest last so it never points at
//! batch files that were not produced.

mod normalize;
mod partition;

pub use normalize::Normalizer;
pub use partition::{partition, PartitionLimits};

use anyhow::Result;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::{AppConfig, ConfigError, RunnerConfig};
use crate::models::{Batch, CommandSpec, Manifest, Strategy, TestId};
use crate::results::{write_json_atomic, ArtifactStore};

/// Result of a planning run
#[derive(Clone, Debug)]
pub struct PlanOutcome {
    pub manifest_path: PathBuf,
    pub manifest: Manifest,
}

/// Plans and writes batches for one run
pub struct BatchPlanner {
    store: ArtifactStore,
    run_id: String,
    workflow_id: Option<String>,
    strategy: Strategy,
    limits: PartitionLimits,
    normalizer: Normalizer,
    runner: RunnerConfig,
}

impl BatchPlanner {
    /// Create a planner from validated configuration
    pub fn new(
        config: &AppConfig,
        run_id: impl Into<String>,
        workflow_id: Option<String>,
        prefix: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let run_id = run_id.into();
        let store = ArtifactStore::new(&config.output_dir, &run_id, workflow_id.as_deref())
            .with_prefix(prefix);
        let limits = PartitionLimits::new(config.batch_size)
            .with_large_modules(config.large_module_threshold, config.large_module_chunk_size);

        Ok(Self {
            store,
            run_id,
            workflow_id,
            strategy: config.strategy,
            limits,
            normalizer: Normalizer::new(config.module_suffix.clone()),
            runner: config.runner.clone(),
        })
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Read an input file and plan it
    pub fn plan_file(&self, input: &Path) -> Result<PlanOutcome> {
        let content =
            std::fs::read_to_string(input).map_err(|source| ConfigError::InputUnreadable {
                path: input.display().to_string(),
                source,
            })?;
        self.plan(content.lines())
    }

    /// Plan raw lines: normalize, partition, write batches, write manifest
    pub fn plan<'a>(&self, lines: impl IntoIterator<Item = &'a str>) -> Result<PlanOutcome> {
        let tests = self.normalizer.normalize(lines);
        info!(
            "Planning {} tests with {} strategy (batch size {})",
            tests.len(),
            self.strategy,
            self.limits.batch_size
        );

        let groups = partition(&tests, self.strategy, self.limits);
        let batches = self.build_batches(groups);

        self.store.ensure_dir()?;
        let batch_files = self.write_batches(&batches)?;
        let manifest = self.build_manifest(batch_files, tests.len());
        let manifest_path = self.write_manifest(&manifest)?;

        Ok(PlanOutcome {
            manifest_path,
            manifest,
        })
    }

    /// Attach ids and runner commands to partitioned groups
    pub fn build_batches(&self, groups: Vec<Vec<TestId>>) -> Vec<Batch> {
        groups
            .into_iter()
            .zip(1u32..)
            .map(|(tests, batch_id)| Batch {
                batch_id,
                pr_id: self.run_id.clone(),
                test_count: tests.len(),
                command: self.command_for(batch_id, &tests),
                tests,
            })
            .collect()
    }

    fn command_for(&self, batch_id: u32, tests: &[TestId]) -> CommandSpec {
        let report_path = self.store.batch_results_path(batch_id);

        let mut options = self.runner.options.clone();
        options.push(format!(
            "{}={}",
            self.runner.report_file_option,
            report_path.display()
        ));
        if self.runner.verbose {
            options.push("-v".to_string());
        }

        CommandSpec {
            executable: self.runner.executable.clone(),
            options,
            test_identifiers: tests.to_vec(),
        }
    }

    /// Write one descriptor per batch, returning paths in generation order
    pub fn write_batches(&self, batches: &[Batch]) -> Result<Vec<String>> {
        let mut files = Vec::with_capacity(batches.len());
        for batch in batches {
            let path = self.store.batch_path(batch.batch_id);
            write_json_atomic(&path, batch)?;
            debug!(
                "Batch {}: {} tests -> {}",
                batch.batch_id,
                batch.test_count,
                path.display()
            );
            files.push(path.display().to_string());
        }
        Ok(files)
    }

    fn build_manifest(&self, batch_files: Vec<String>, total_tests: usize) -> Manifest {
        Manifest {
            pr_id: self.run_id.clone(),
            batch_count: batch_files.len(),
            batch_files,
            total_tests,
            prefix: self.store.prefix().to_string(),
            workflow_id: self.workflow_id.clone(),
            strategy: self.strategy,
            generated_at: Some(Utc::now()),
        }
    }

    /// Write the manifest; called only after every batch file exists
    pub fn write_manifest(&self, manifest: &Manifest) -> Result<PathBuf> {
        let path = self.store.manifest_path();
        write_json_atomic(&path, manifest)?;
        info!(
            "Wrote manifest with {} batches ({} tests)",
            manifest.batch_count, manifest.total_tests
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::read_json;
    use tempfile::tempdir;

    fn config_in(dir: &Path, batch_size: usize, strategy: Strategy) -> AppConfig {
        AppConfig {
            batch_size,
            strategy,
            output_dir: dir.display().to_string(),
            ..Default::default()
        }
    }

    const INPUT: &str = "tests/test_a.py::test_one\n\
                         tests/test_a.py::test_two\n\
                         \n\
                         tests/test_b.py::test_x\n";

    #[test]
    fn test_plan_writes_batches_and_manifest() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path(), 2, Strategy::Flat);
        let planner = BatchPlanner::new(&config, "1234", None, "").unwrap();

        let outcome = planner.plan(INPUT.lines()).unwrap();
        let manifest = &outcome.manifest;

        assert_eq!(manifest.pr_id, "1234");
        assert_eq!(manifest.batch_count, 2);
        assert_eq!(manifest.total_tests, 3);
        assert_eq!(manifest.strategy, Strategy::Flat);
        assert_eq!(
            outcome.manifest_path,
            dir.path().join("pr-1234").join("manifest.json")
        );

        let on_disk: Manifest = read_json(&outcome.manifest_path).unwrap();
        assert_eq!(&on_disk, manifest);

        let second: Batch = read_json(Path::new(&manifest.batch_files[1])).unwrap();
        assert_eq!(second.batch_id, 2);
        assert_eq!(second.tests, vec![TestId::new("tests/test_b.py::test_x")]);
        assert_eq!(second.command.test_identifiers, second.tests);
    }

    #[test]
    fn test_batch_command_options() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path(), 10, Strategy::Grouped);
        let planner = BatchPlanner::new(&config, "9", Some("wf".to_string()), "failed").unwrap();

        let batches = planner.build_batches(vec![vec![TestId::new("a.py::t")]]);
        let command = &batches[0].command;
        let report = dir
            .path()
            .join("pr-9")
            .join("wf")
            .join("failed_test_results_batch_1.json");

        assert_eq!(command.executable, "pytest");
        assert_eq!(
            command.options,
            vec![
                "--tb=short".to_string(),
                "--json-report".to_string(),
                format!("--json-report-file={}", report.display()),
                "-v".to_string(),
            ]
        );
    }

    #[test]
    fn test_empty_input_writes_empty_manifest() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path(), 5, Strategy::Grouped);
        let planner = BatchPlanner::new(&config, "1", None, "").unwrap();

        let outcome = planner.plan(["", "   ", "not a test"]).unwrap();
        assert_eq!(outcome.manifest.batch_count, 0);
        assert_eq!(outcome.manifest.total_tests, 0);
        assert!(outcome.manifest.batch_files.is_empty());
        assert!(outcome.manifest_path.exists());

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("pr-1"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("manifest.json")]);
    }

    #[test]
    fn test_plan_is_deterministic() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path(), 2, Strategy::Grouped);
        let planner = BatchPlanner::new(&config, "1", None, "").unwrap();

        let first = planner.plan(INPUT.lines()).unwrap();
        let batches_first: Vec<Batch> = first
            .manifest
            .batch_files
            .iter()
            .map(|f| read_json(Path::new(f)).unwrap())
            .collect();
        let second = planner.plan(INPUT.lines()).unwrap();
        let batches_second: Vec<Batch> = second
            .manifest
            .batch_files
            .iter()
            .map(|f| read_json(Path::new(f)).unwrap())
            .collect();

        assert_eq!(first.manifest.batch_files, second.manifest.batch_files);
        assert_eq!(batches_first, batches_second);
    }

    #[test]
    fn test_unreadable_input_is_config_error() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path(), 5, Strategy::Flat);
        let planner = BatchPlanner::new(&config, "1", None, "").unwrap();

        let err = planner
            .plan_file(&dir.path().join("missing.txt"))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::InputUnreadable { .. })
        ));
        assert!(!dir.path().join("pr-1").exists());
    }

    #[test]
    fn test_invalid_batch_size_rejected() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path(), 0, Strategy::Flat);
        assert!(matches!(
            BatchPlanner::new(&config, "1", None, ""),
            Err(ConfigError::InvalidBatchSize(0))
        ));
    }
}
