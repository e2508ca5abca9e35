//! Batch planning models
//!
//! Defines test identifiers, batch descriptors, and the run manifest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between a module path and a test name
pub const NODE_SEPARATOR: &str = "::";

/// A normalized pytest node identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestId(String);

impl TestId {
    /// Wrap an already-normalized identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Module path: the segment before the first `::`, or the whole id for a bare module
    pub fn module(&self) -> &str {
        match self.0.find(NODE_SEPARATOR) {
            Some(idx) => &self.0[..idx],
            None => &self.0,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TestId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Partitioning strategy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Consecutive fixed-size chunks
    Flat,
    /// Whole modules packed greedily up to the batch size
    #[default]
    Grouped,
}

impl Strategy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "flat" | "size" => Some(Strategy::Flat),
            "grouped" | "module" | "modules" => Some(Strategy::Grouped),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Flat => "flat",
            Strategy::Grouped => "grouped",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runner invocation for a single batch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Runner executable (e.g. `pytest`)
    pub executable: String,

    /// Reporting options, including the per-batch report file
    pub options: Vec<String>,

    /// Tests to pass to the runner, same order as the batch
    pub test_identifiers: Vec<TestId>,
}

/// A bounded group of tests executed by one runner invocation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    /// Sequential batch id, starting at 1
    pub batch_id: u32,

    /// Run this batch belongs to
    pub pr_id: String,

    /// Number of tests in the batch
    pub test_count: usize,

    /// Tests in execution order
    pub tests: Vec<TestId>,

    /// Runner invocation
    pub command: CommandSpec,
}

/// Index of all batch files written for one run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub pr_id: String,

    pub batch_count: usize,

    /// Batch file paths in generation order
    pub batch_files: Vec<String>,

    pub total_tests: usize,

    /// File-name label, empty when unset
    #[serde(default)]
    pub prefix: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,

    #[serde(default)]
    pub strategy: Strategy,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

impl Manifest {
    /// Whether the manifest lists no batches
    pub fn is_empty(&self) -> bool {
        self.batch_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_of_node_id() {
        let id = TestId::new("tests/test_a.py::TestX::test_one[1-2]");
        assert_eq!(id.module(), "tests/test_a.py");
    }

    #[test]
    fn test_bare_module() {
        let id = TestId::new("tests/test_b.py");
        assert_eq!(id.module(), "tests/test_b.py");
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!(Strategy::from_str("flat"), Some(Strategy::Flat));
        assert_eq!(Strategy::from_str("GROUPED"), Some(Strategy::Grouped));
        assert_eq!(Strategy::from_str("random"), None);
        assert_eq!(Strategy::default(), Strategy::Grouped);
    }

    #[test]
    fn test_manifest_tolerates_minimal_json() {
        let json = r#"{"pr_id":"42","batch_count":0,"batch_files":[],"total_tests":0}"#;
        let manifest: Manifest = serde_json::from_str(json).unwrap();
        assert!(manifest.is_empty());
        assert_eq!(manifest.prefix, "");
        assert_eq!(manifest.strategy, Strategy::Grouped);
    }
}
