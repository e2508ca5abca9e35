//! Merging per-batch result summaries into one combined report
//!
//! Discovery goes through [`BatchSource`] so the merge logic can run against
//! the filesystem or an in-memory set of files.

use anyhow::{Context, Result};
use std::cmp::Ordering;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::storage::{write_json_atomic, ArtifactStore};
use crate::models::ResultSummary;

/// Source of per-batch report files
pub trait BatchSource {
    /// Names of all files available in the source
    fn list(&self) -> Result<Vec<String>>;

    /// Raw content of one file
    fn read(&self, name: &str) -> Result<String>;
}

/// Reads report files from a run directory
pub struct FsBatchSource {
    dir: PathBuf,
}

impl FsBatchSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl BatchSource for FsBatchSource {
    fn list(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list directory: {}", self.dir.display()))?
        {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }

    fn read(&self, name: &str) -> Result<String> {
        let path = self.dir.join(name);
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))
    }
}

/// A batch file that could not be merged
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedFile {
    pub name: String,
    pub reason: String,
}

/// Result of folding a set of batch reports
#[derive(Clone, Debug, Default)]
pub struct MergeReport {
    pub combined: ResultSummary,
    /// Files merged, in merge order
    pub merged: Vec<String>,
    pub skipped: Vec<SkippedFile>,
}

impl MergeReport {
    /// True when no report file matched at all
    pub fn is_empty(&self) -> bool {
        self.merged.is_empty() && self.skipped.is_empty()
    }
}

/// Outcome of a merge run
#[derive(Clone, Debug)]
pub enum MergeOutcome {
    /// No batch report files matched; nothing was written
    NoBatchFiles { dir: PathBuf },
    /// Combined report written to `path`
    Merged { path: PathBuf, report: MergeReport },
}

/// Combines per-batch reports for one run
pub struct ResultMerger {
    store: ArtifactStore,
}

impl ResultMerger {
    pub fn new(store: ArtifactStore) -> Self {
        Self { store }
    }

    /// Matching report files in merge order: numeric batch id first, then name
    pub fn discover(&self, source: &dyn BatchSource) -> Result<Vec<String>> {
        let mut matched: Vec<(String, String)> = source
            .list()?
            .into_iter()
            .filter_map(|name| {
                let id = self.store.parse_results_file_name(&name)?.to_string();
                Some((id, name))
            })
            .collect();

        matched.sort_by(|(a_id, a_name), (b_id, b_name)| {
            compare_batch_ids(a_id, b_id).then_with(|| a_name.cmp(b_name))
        });

        Ok(matched.into_iter().map(|(_, name)| name).collect())
    }

    /// Fold all matching files; unreadable or corrupt files are logged and skipped
    pub fn merge(&self, source: &dyn BatchSource) -> Result<MergeReport> {
        let names = self.discover(source)?;
        let mut report = MergeReport::default();

        for name in names {
            let parsed = source.read(&name).and_then(|content| {
                serde_json::from_str::<ResultSummary>(&content)
                    .with_context(|| format!("Failed to parse {name}"))
            });

            match parsed {
                Ok(summary) => {
                    debug!(
                        "Merging {} ({} tests, exit code {})",
                        name, summary.summary.total, summary.exitcode
                    );
                    report.combined.absorb(summary);
                    report.merged.push(name);
                }
                Err(e) => {
                    warn!("Skipping {}: {:#}", name, e);
                    report.skipped.push(SkippedFile {
                        name,
                        reason: format!("{e:#}"),
                    });
                }
            }
        }

        Ok(report)
    }

    /// Merge the run directory and write the combined report
    pub fn merge_dir(&self) -> Result<MergeOutcome> {
        let source = FsBatchSource::new(self.store.run_dir());
        self.merge_and_write(&source)
    }

    /// Merge from `source` and write the combined report into the run directory
    pub fn merge_and_write(&self, source: &dyn BatchSource) -> Result<MergeOutcome> {
        let dir = self.store.run_dir().to_path_buf();

        let report = self.merge(source)?;
        if report.is_empty() {
            warn!("No batch result files found in {}", dir.display());
            return Ok(MergeOutcome::NoBatchFiles { dir });
        }

        self.store.ensure_dir()?;
        let path = self.output_path();
        write_json_atomic(&path, &report.combined)?;

        info!(
            "Merged {} batch files ({} skipped) into {}",
            report.merged.len(),
            report.skipped.len(),
            path.display()
        );

        Ok(MergeOutcome::Merged { path, report })
    }

    /// Where the combined report is written
    pub fn output_path(&self) -> PathBuf {
        self.store.combined_results_path()
    }
}

/// Numeric ids sort numerically and before non-numeric ones
fn compare_batch_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}
