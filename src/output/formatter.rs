//! Output formatters for plan and merge outcomes
//!
//! Provides table and JSON console output plus CSV export of merged records.

use anyhow::{Context, Result};
use serde_json::json;
use std::fmt::Write;
use std::path::Path;
use tracing::info;

use crate::models::{Manifest, ResultSummary};
use crate::results::MergeReport;
use crate::script::ScriptOutcome;

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    /// Format a planning outcome
    pub fn format_plan(&self, manifest_path: &Path, manifest: &Manifest) -> String {
        match self.format {
            OutputFormat::Json => json!({
                "manifest": manifest_path.display().to_string(),
                "batch_count": manifest.batch_count,
                "total_tests": manifest.total_tests,
                "batch_files": manifest.batch_files,
            })
            .to_string(),
            OutputFormat::Table => {
                let mut out = String::new();
                let _ = writeln!(out, "Created manifest file: {}", manifest_path.display());
                if manifest.is_empty() {
                    let _ = write!(out, "  No tests to batch (0 batches)");
                } else {
                    let _ = write!(
                        out,
                        "  {} tests in {} batches ({} strategy)",
                        manifest.total_tests, manifest.batch_count, manifest.strategy
                    );
                }
                out
            }
        }
    }

    /// Format the path of a generated script
    pub fn format_script(&self, outcome: &ScriptOutcome) -> String {
        match self.format {
            OutputFormat::Json => json!({
                "script": outcome.script_path.display().to_string(),
                "batches": outcome.rendered_batches,
                "side_files": outcome
                    .side_files
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>(),
            })
            .to_string(),
            OutputFormat::Table => {
                let mut out = format!(
                    "Created bash script: {} ({} batches)",
                    outcome.script_path.display(),
                    outcome.rendered_batches
                );
                for side in &outcome.side_files {
                    let _ = write!(out, "\n  tests file: {}", side.display());
                }
                out
            }
        }
    }

    /// Format a completed merge
    pub fn format_merge(&self, path: &Path, report: &MergeReport) -> String {
        match self.format {
            OutputFormat::Json => json!({
                "combined": path.display().to_string(),
                "merged": report.merged,
                "skipped": report
                    .skipped
                    .iter()
                    .map(|s| json!({"file": s.name, "reason": s.reason}))
                    .collect::<Vec<_>>(),
                "summary": report.combined.summary,
                "exitcode": report.combined.exitcode,
            })
            .to_string(),
            OutputFormat::Table => self.format_merge_table(path, report),
        }
    }

    fn format_merge_table(&self, path: &Path, report: &MergeReport) -> String {
        let combined = &report.combined;
        let counts = &combined.summary;
        let mut out = String::new();

        let _ = writeln!(out, "Combined results: {}", path.display());
        let _ = writeln!(out, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        let _ = writeln!(
            out,
            "Batches merged: {} | Skipped: {}",
            report.merged.len(),
            report.skipped.len()
        );
        for skipped in &report.skipped {
            let _ = writeln!(out, "  ! {}: {}", skipped.name, skipped.reason);
        }
        let _ = writeln!(out, "{counts}");
        let _ = writeln!(
            out,
            "Pass Rate: {:.1}% | Duration: {:.2}s",
            counts.pass_rate(),
            combined.duration
        );
        let _ = writeln!(out, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        let _ = write!(out, "Exit code: {}", self.exit_code_label(combined));
        out
    }

    fn exit_code_label(&self, summary: &ResultSummary) -> String {
        match (summary.is_success(), self.colorize) {
            (true, true) => "\x1b[32m0\x1b[0m".to_string(),
            (false, true) => format!("\x1b[31m{}\x1b[0m", summary.exitcode),
            (_, false) => summary.exitcode.to_string(),
        }
    }

    /// Format the distinct "nothing to merge" condition
    pub fn format_no_batches(&self, dir: &Path) -> String {
        match self.format {
            OutputFormat::Json => json!({
                "combined": null,
                "merged": [],
                "message": format!("no batch result files found in {}", dir.display()),
            })
            .to_string(),
            OutputFormat::Table => format!(
                "No batch result files found in {}; nothing merged",
                dir.display()
            ),
        }
    }
}

/// Write one CSV row per test record: nodeid, outcome, duration
pub fn export_csv(summary: &ResultSummary, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;

    writer.write_record(["nodeid", "outcome", "duration"])?;
    for record in &summary.tests {
        let duration = format!("{:.6}", record.duration());
        writer.write_record([
            record.nodeid.as_str(),
            record.outcome.as_str(),
            duration.as_str(),
        ])?;
    }
    writer.flush()?;

    info!("Exported {} test records to {}", summary.tests.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Strategy, SummaryCounts, TestRecord};
    use crate::results::SkippedFile;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn report() -> MergeReport {
        MergeReport {
            combined: ResultSummary {
                exitcode: 1,
                duration: 3.5,
                summary: SummaryCounts {
                    passed: 3,
                    failed: 1,
                    total: 4,
                    ..Default::default()
                },
                tests: vec![TestRecord {
                    nodeid: "a.py::t, with comma".to_string(),
                    outcome: "passed".to_string(),
                    extra: serde_json::from_value(json!({"call": {"duration": 0.5}})).unwrap(),
                }],
                ..Default::default()
            },
            merged: vec!["test_results_batch_1.json".to_string()],
            skipped: vec![SkippedFile {
                name: "test_results_batch_2.json".to_string(),
                reason: "expected value".to_string(),
            }],
        }
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("table"), Some(OutputFormat::Table));
        assert_eq!(OutputFormat::from_str("csv"), None);
    }

    #[test]
    fn test_format_merge_table() {
        let formatter = ResultFormatter::new(OutputFormat::Table).no_color();
        let out = formatter.format_merge(Path::new("out/test_results.json"), &report());

        assert!(out.contains("Combined results: out/test_results.json"));
        assert!(out.contains("Batches merged: 1 | Skipped: 1"));
        assert!(out.contains("test_results_batch_2.json: expected value"));
        assert!(out.contains("Pass Rate: 75.0%"));
        assert!(out.ends_with("Exit code: 1"));
    }

    #[test]
    fn test_format_merge_json() {
        let formatter = ResultFormatter::new(OutputFormat::Json);
        let out = formatter.format_merge(Path::new("r.json"), &report());
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(value["summary"]["total"], 4);
        assert_eq!(value["exitcode"], 1);
        assert_eq!(value["skipped"][0]["file"], "test_results_batch_2.json");
    }

    #[test]
    fn test_format_plan_empty() {
        let manifest = Manifest {
            pr_id: "1".to_string(),
            batch_count: 0,
            batch_files: Vec::new(),
            total_tests: 0,
            prefix: String::new(),
            workflow_id: None,
            strategy: Strategy::Grouped,
            generated_at: None,
        };
        let out = ResultFormatter::new(OutputFormat::Table)
            .format_plan(&PathBuf::from("pr-1/manifest.json"), &manifest);
        assert!(out.starts_with("Created manifest file: pr-1/manifest.json"));
        assert!(out.contains("0 batches"));
    }

    #[test]
    fn test_no_batches_is_distinct() {
        let formatter = ResultFormatter::new(OutputFormat::Table);
        let out = formatter.format_no_batches(Path::new("artifacts/pr-9"));
        assert!(out.contains("No batch result files found in artifacts/pr-9"));
    }

    #[test]
    fn test_export_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.csv");

        export_csv(&report().combined, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "nodeid,outcome,duration\n\"a.py::t, with comma\",passed,0.500000\n"
        );
    }

    #[test]
    fn test_format_script_lists_side_files() {
        let outcome = ScriptOutcome {
            script_path: "out/pr-1/run_tests.sh".into(),
            side_files: vec!["out/pr-1/batch_2_tests.txt".into()],
            rendered_batches: 3,
        };

        let table = ResultFormatter::new(OutputFormat::Table).no_color().format_script(&outcome);
        assert!(table.starts_with("Created bash script: out/pr-1/run_tests.sh (3 batches)"));
        assert!(table.contains("tests file: out/pr-1/batch_2_tests.txt"));

        let json = ResultFormatter::new(OutputFormat::Json).no_color().format_script(&outcome);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["batches"], 3);
        assert_eq!(value["side_files"][0], "out/pr-1/batch_2_tests.txt");
    }
}
