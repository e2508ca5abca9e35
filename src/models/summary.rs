//! Result summary models
//!
//! Mirrors the pytest-json-report layout so per-batch reports can be read
//! and the combined report can be consumed by the same tooling.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Outcome counters for a batch or a whole run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryCounts {
    #[serde(default, deserialize_with = "lenient_count")]
    pub passed: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub failed: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub skipped: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub xfailed: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub xpassed: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub error: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub collected: u64,

    /// Counters this tool does not name (e.g. `deselected`), summed by key
    #[serde(flatten, deserialize_with = "lenient_counts")]
    pub other: BTreeMap<String, u64>,
}

/// Integral, float or numeric-string counts; anything else reads as zero
fn count_from(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f.round() as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(count_from(&Value::deserialize(deserializer)?).unwrap_or(0))
}

fn lenient_counts<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<String, u64>, D::Error> {
    let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
    Ok(raw
        .iter()
        .filter_map(|(key, value)| Some((key.clone(), count_from(value)?)))
        .collect())
}

impl SummaryCounts {
    /// Add another set of counters; absent keys count as zero
    pub fn add(&mut self, other: &SummaryCounts) {
        self.passed += other.passed;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.xfailed += other.xfailed;
        self.xpassed += other.xpassed;
        self.error += other.error;
        self.total += other.total;
        self.collected += other.collected;

        for (key, value) in &other.other {
            *self.other.entry(key.clone()).or_insert(0) += value;
        }
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.passed as f64 / self.total as f64) * 100.0
        }
    }
}

impl fmt::Display for SummaryCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total: {} | Pass: {} | Fail: {} | Skip: {} | XFail: {} | XPass: {} | Error: {}",
            self.total,
            self.passed,
            self.failed,
            self.skipped,
            self.xfailed,
            self.xpassed,
            self.error
        )
    }
}

/// A single test record; fields beyond `nodeid` and `outcome` are kept verbatim
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestRecord {
    #[serde(default)]
    pub nodeid: String,

    #[serde(default)]
    pub outcome: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TestRecord {
    /// Sum of the setup, call and teardown phase durations, in seconds
    pub fn duration(&self) -> f64 {
        ["setup", "call", "teardown"]
            .iter()
            .filter_map(|phase| self.extra.get(*phase))
            .filter_map(|phase| phase.get("duration"))
            .filter_map(Value::as_f64)
            .sum()
    }
}

/// Structured report for one batch or the combined run
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    /// Creation time as epoch seconds
    #[serde(default)]
    pub created: Option<f64>,

    /// Duration in seconds
    #[serde(default)]
    pub duration: f64,

    #[serde(default)]
    pub exitcode: i32,

    #[serde(default)]
    pub root: Option<String>,

    #[serde(default)]
    pub environment: BTreeMap<String, Value>,

    #[serde(default)]
    pub summary: SummaryCounts,

    #[serde(default)]
    pub collectors: Vec<Value>,

    #[serde(default)]
    pub tests: Vec<TestRecord>,

    #[serde(default)]
    pub warnings: Vec<Value>,
}

impl ResultSummary {
    /// Fold one batch report into this accumulator.
    ///
    /// Counters and durations are summed and lists are concatenated. The
    /// first nonzero exit code sticks, as do the first `created` and `root`
    /// values. Environment keys from `batch` overwrite existing ones.
    pub fn absorb(&mut self, batch: ResultSummary) {
        self.summary.add(&batch.summary);
        self.duration += batch.duration;

        if self.exitcode == 0 && batch.exitcode != 0 {
            self.exitcode = batch.exitcode;
        }
        if self.created.is_none() {
            self.created = batch.created;
        }
        if self.root.is_none() {
            self.root = batch.root;
        }

        self.environment.extend(batch.environment);
        self.tests.extend(batch.tests);
        self.collectors.extend(batch.collectors);
        self.warnings.extend(batch.warnings);
    }

    pub fn is_success(&self) -> bool {
        self.exitcode == 0
    }
}
