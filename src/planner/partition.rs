//! Partitioning of normalized tests into batches

use crate::models::{Strategy, TestId};

/// Limits applied while partitioning
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartitionLimits {
    /// Target tests per batch
    pub batch_size: usize,
    /// Modules above this count are split on their own
    pub large_module_threshold: Option<usize>,
    /// Chunk size for split modules
    pub large_module_chunk_size: usize,
}

impl PartitionLimits {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            large_module_threshold: None,
            large_module_chunk_size: batch_size,
        }
    }

    pub fn with_large_modules(mut self, threshold: Option<usize>, chunk_size: usize) -> Self {
        self.large_module_threshold = threshold;
        self.large_module_chunk_size = chunk_size;
        self
    }
}

/// Split tests into batches using the given strategy.
///
/// Sizes of zero are rejected by config validation before reaching here; a
/// zero is treated as one so the functions stay total.
pub fn partition(
    tests: &[TestId],
    strategy: Strategy,
    limits: PartitionLimits,
) -> Vec<Vec<TestId>> {
    match strategy {
        Strategy::Flat => partition_flat(tests, limits.batch_size),
        Strategy::Grouped => partition_grouped(tests, limits),
    }
}

/// Consecutive chunks of `batch_size`; only the last may be short
pub fn partition_flat(tests: &[TestId], batch_size: usize) -> Vec<Vec<TestId>> {
    tests
        .chunks(batch_size.max(1))
        .map(<[TestId]>::to_vec)
        .collect()
}

/// Pack whole modules greedily, splitting only modules above the threshold
pub fn partition_grouped(tests: &[TestId], limits: PartitionLimits) -> Vec<Vec<TestId>> {
    let batch_size = limits.batch_size.max(1);
    let chunk_size = limits.large_module_chunk_size.max(1);

    let mut batches = Vec::new();
    let mut current: Vec<TestId> = Vec::new();

    for module_tests in group_by_module(tests) {
        let oversized = limits
            .large_module_threshold
            .is_some_and(|threshold| module_tests.len() > threshold);

        if oversized {
            if !current.is_empty() {
                batches.push(std::mem::take(&mut current));
            }
            batches.extend(module_tests.chunks(chunk_size).map(<[TestId]>::to_vec));
            continue;
        }

        if !current.is_empty() && current.len() + module_tests.len() > batch_size {
            batches.push(std::mem::take(&mut current));
        }
        current.extend(module_tests);
    }

    if !current.is_empty() {
        batches.push(current);
    }

    batches
}

/// Bucket tests by module, preserving first-seen module order
fn group_by_module(tests: &[TestId]) -> Vec<Vec<TestId>> {
    let mut order: Vec<&str> = Vec::new();
    let mut buckets: std::collections::HashMap<&str, Vec<TestId>> =
        std::collections::HashMap::new();

    for test in tests {
        let module = test.module();
        buckets
            .entry(module)
            .or_insert_with(|| {
                order.push(module);
                Vec::new()
            })
            .push(test.clone());
    }

    order
        .into_iter()
        .filter_map(|module| buckets.remove(module))
        .collect()
}
