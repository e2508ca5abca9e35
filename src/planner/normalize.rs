//! Input normalization
//!
//! Turns raw lines (as printed by `pytest --collect-only -q`, CI logs, or
//! hand-written lists) into canonical test identifiers.

use std::collections::HashSet;
use tracing::debug;

use crate::models::TestId;

/// Normalizes raw lines into test identifiers
#[derive(Clone, Debug)]
pub struct Normalizer {
    module_suffix: String,
}

impl Normalizer {
    pub fn new(module_suffix: impl Into<String>) -> Self {
        Self {
            module_suffix: module_suffix.into(),
        }
    }

    /// Normalize one line, returning `None` for blanks and unrecognized text
    pub fn normalize_line(&self, raw: &str) -> Option<TestId> {
        let line = raw.trim();
        if line.is_empty() {
            return None;
        }

        let token = line.split(' ').next().unwrap_or(line);
        let token = strip_wrapper(token);

        if self.is_node_id(token) || self.is_bare_module(token) {
            Some(TestId::new(token))
        } else {
            debug!("Discarding unrecognized line: {}", line);
            None
        }
    }

    /// Normalize all lines, keeping input order and dropping repeats
    pub fn normalize<'a>(&self, lines: impl IntoIterator<Item = &'a str>) -> Vec<TestId> {
        let mut seen = HashSet::new();
        let mut tests = Vec::new();

        for line in lines {
            if let Some(id) = self.normalize_line(line) {
                if seen.insert(id.clone()) {
                    tests.push(id);
                } else {
                    debug!("Dropping duplicate test: {}", id);
                }
            }
        }

        tests
    }

    fn is_node_id(&self, token: &str) -> bool {
        match token.split_once("::") {
            Some((module, test)) => !module.is_empty() && !test.is_empty(),
            None => false,
        }
    }

    fn is_bare_module(&self, token: &str) -> bool {
        token.len() > self.module_suffix.len() && token.ends_with(&self.module_suffix)
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(".py")
    }
}

/// Remove one `[...]` layer wrapping the whole token
fn strip_wrapper(token: &str) -> &str {
    token
        .strip_prefix('[')
        .and_then(|inner| inner.strip_suffix(']'))
        .map(str::trim)
        .unwrap_or(token)
}
