//! Runner script generation
//!
//! Loads a manifest and its batch descriptors, renders the shell script and
//! writes it (plus any tests files for oversized batches) next to the manifest.

mod quote;
mod render;

pub use render::{MergeStep, ScriptOptions, ScriptRenderer};

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::models::{Batch, Manifest};
use crate::results::{make_executable, read_json, write_text_atomic, ArtifactStore};

/// Written script and its side files
#[derive(Clone, Debug)]
pub struct ScriptOutcome {
    pub script_path: PathBuf,
    pub side_files: Vec<PathBuf>,
    pub rendered_batches: usize,
}

/// Load the batches a manifest references, skipping any that are absent
pub fn load_batches(manifest: &Manifest) -> Result<Vec<Batch>> {
    let mut batches = Vec::with_capacity(manifest.batch_files.len());
    for file in &manifest.batch_files {
        let path = Path::new(file);
        if !path.exists() {
            warn!("Batch file listed in manifest is missing: {}", file);
            continue;
        }
        batches.push(read_json(path)?);
    }
    Ok(batches)
}

/// Render the script for the manifest at `manifest_path` and write it
pub fn generate_script(
    manifest_path: &Path,
    store: &ArtifactStore,
    options: ScriptOptions,
) -> Result<ScriptOutcome> {
    let manifest: Manifest = read_json(manifest_path)?;
    let batches = load_batches(&manifest)?;

    let renderer = ScriptRenderer::new(store, options);
    let rendered = renderer.render(&manifest, &batches);

    store.ensure_dir()?;
    let mut side_files = Vec::with_capacity(rendered.side_files.len());
    for side in &rendered.side_files {
        write_text_atomic(&side.path, &side.content)?;
        info!("Batch tests exceed the command length limit; wrote {}", side.path.display());
        side_files.push(side.path.clone());
    }

    let script_path = store.script_path();
    write_text_atomic(&script_path, &rendered.text)?;
    make_executable(&script_path)?;

    Ok(ScriptOutcome {
        script_path,
        side_files,
        rendered_batches: batches.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::models::Strategy;
    use crate::planner::BatchPlanner;
    use tempfile::tempdir;

    fn plan(dir: &Path, lines: &[&str], prefix: &str) -> (ArtifactStore, PathBuf) {
        let config = AppConfig {
            batch_size: 2,
            strategy: Strategy::Flat,
            output_dir: dir.display().to_string(),
            ..Default::default()
        };
        let planner = BatchPlanner::new(&config, "77", None, prefix).unwrap();
        let outcome = planner.plan(lines.iter().copied()).unwrap();
        (planner.store().clone(), outcome.manifest_path)
    }

    fn options() -> ScriptOptions {
        ScriptOptions {
            launcher: "tox".to_string(),
            environment: Some("py311".to_string()),
            max_command_length: 100_000,
            merge_step: None,
        }
    }

    #[test]
    fn test_generate_script_writes_executable() {
        let dir = tempdir().unwrap();
        let (store, manifest_path) = plan(
            dir.path(),
            &["a.py::t1", "a.py::t2", "b.py::t3"],
            "",
        );

        let outcome = generate_script(&manifest_path, &store, options()).unwrap();
        assert_eq!(outcome.script_path, store.script_path());
        assert_eq!(outcome.rendered_batches, 2);

        let text = std::fs::read_to_string(&outcome.script_path).unwrap();
        assert!(text.starts_with("#!/bin/bash\n# Test commands for PR-77\n# Total batches: 2\n"));
        assert_eq!(text.matches("|| true").count(), 2);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&outcome.script_path)
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[test]
    fn test_prefixed_script_name() {
        let dir = tempdir().unwrap();
        let (store, manifest_path) = plan(dir.path(), &["a.py::t1"], "failed");

        let outcome = generate_script(&manifest_path, &store, options()).unwrap();
        assert!(outcome.script_path.ends_with("pr-77/run_failed_tests.sh"));
    }

    #[test]
    fn test_missing_batch_file_is_skipped() {
        let dir = tempdir().unwrap();
        let (store, manifest_path) = plan(
            dir.path(),
            &["a.py::t1", "a.py::t2", "b.py::t3"],
            "",
        );
        std::fs::remove_file(store.batch_path(1)).unwrap();

        let outcome = generate_script(&manifest_path, &store, options()).unwrap();
        assert_eq!(outcome.rendered_batches, 1);
        let text = std::fs::read_to_string(&outcome.script_path).unwrap();
        assert!(!text.contains("Running batch 1"));
        assert!(text.contains("Running batch 2"));
    }

    #[test]
    fn test_side_files_written() {
        let dir = tempdir().unwrap();
        let (store, manifest_path) = plan(dir.path(), &["a.py::t1", "a.py::t2"], "");
        let mut opts = options();
        opts.max_command_length = 10;

        let outcome = generate_script(&manifest_path, &store, opts).unwrap();
        assert_eq!(outcome.side_files, vec![store.tests_list_path(1)]);
        assert_eq!(
            std::fs::read_to_string(store.tests_list_path(1)).unwrap(),
            "a.py::t1\na.py::t2\n"
        );
    }
}
