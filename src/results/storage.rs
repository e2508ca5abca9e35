//! Artifact storage and layout
//!
//! Every file for a run lives under `<output-dir>/pr-<run-id>[/<workflow-id>]`.
//! JSON artifacts are written to a temporary sibling first and renamed into
//! place, so readers never observe a half-written file.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the per-batch report files, without prefix
const RESULTS_BATCH_STEM: &str = "test_results_batch_";

/// Directory layout for one run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactStore {
    run_dir: PathBuf,
    prefix: String,
}

impl ArtifactStore {
    /// Create a store for a run id and optional workflow id
    pub fn new(output_dir: impl AsRef<Path>, run_id: &str, workflow_id: Option<&str>) -> Self {
        let mut run_dir = output_dir.as_ref().join(format!("pr-{run_id}"));
        if let Some(workflow) = workflow_id.filter(|w| !w.is_empty()) {
            run_dir = run_dir.join(workflow);
        }
        Self {
            run_dir,
            prefix: String::new(),
        }
    }

    /// Label every file name with `<prefix>_`
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Ensure the run directory exists
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.run_dir)
            .with_context(|| format!("Failed to create directory: {}", self.run_dir.display()))
    }

    fn labelled(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}_{name}", self.prefix)
        }
    }

    pub fn batch_path(&self, batch_id: u32) -> PathBuf {
        self.run_dir.join(self.labelled(&format!("batch_{batch_id}.json")))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.run_dir.join(self.labelled("manifest.json"))
    }

    /// Report file the runner writes for one batch
    pub fn batch_results_path(&self, batch_id: u32) -> PathBuf {
        self.run_dir.join(self.labelled(&format!("{RESULTS_BATCH_STEM}{batch_id}.json")))
    }

    pub fn combined_results_path(&self) -> PathBuf {
        self.run_dir.join(self.labelled("test_results.json"))
    }

    /// Side file holding the tests of an oversized batch
    pub fn tests_list_path(&self, batch_id: u32) -> PathBuf {
        self.run_dir.join(self.labelled(&format!("batch_{batch_id}_tests.txt")))
    }

    pub fn script_path(&self) -> PathBuf {
        if self.prefix.is_empty() {
            self.run_dir.join("run_tests.sh")
        } else {
            self.run_dir.join(format!("run_{}_tests.sh", self.prefix))
        }
    }

    /// Batch id encoded in a per-batch report file name, if the name matches
    pub fn parse_results_file_name<'a>(&self, file_name: &'a str) -> Option<&'a str> {
        let stem = file_name.strip_suffix(".json")?;
        let stem = if self.prefix.is_empty() {
            stem
        } else {
            stem.strip_prefix(self.prefix.as_str())?.strip_prefix('_')?
        };
        let id = stem.strip_prefix(RESULTS_BATCH_STEM)?;
        (!id.is_empty()).then_some(id)
    }
}

/// Serialize `value` as pretty JSON and publish it at `path` atomically
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let tmp = temp_sibling(path);
    discard_on_error(&tmp, write_json_file(&tmp, value))?;
    publish(&tmp, path)
}

fn write_json_file<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("Failed to write JSON: {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

/// Write text to `path` atomically
pub fn write_text_atomic(path: &Path, content: &str) -> Result<()> {
    let tmp = temp_sibling(path);
    let written = fs::write(&tmp, content)
        .with_context(|| format!("Failed to write file: {}", tmp.display()));
    discard_on_error(&tmp, written)?;
    publish(&tmp, path)
}

/// Read and parse a JSON file
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse JSON: {}", path.display()))
}

/// Mark a file as executable (0755)
#[cfg(unix)]
pub fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .with_context(|| format!("Failed to set permissions: {}", path.display()))
}

#[cfg(not(unix))]
pub fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

/// Remove a half-written temp file when writing it failed
fn discard_on_error(tmp: &Path, result: Result<()>) -> Result<()> {
    if result.is_err() {
        let _ = fs::remove_file(tmp);
    }
    result
}

fn publish(tmp: &Path, path: &Path) -> Result<()> {
    let moved = fs::rename(tmp, path)
        .with_context(|| format!("Failed to move {} into place", path.display()));
    discard_on_error(tmp, moved)?;
    debug!("Wrote {}", path.display());
    Ok(())
}
