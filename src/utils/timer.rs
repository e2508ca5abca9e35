//! Stage timing
//!
//! Measures the phases of a plan or merge run and reports them at debug level.

use std::time::{Duration, Instant};
use tracing::debug;

/// Timer for one command, with named stages
#[derive(Debug)]
pub struct StageTimer {
    label: String,
    start: Instant,
    stages: Vec<(String, Duration)>,
}

impl StageTimer {
    /// Create and start a new timer
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            start: Instant::now(),
            stages: Vec::new(),
        }
    }

    /// Mark the end of a stage
    pub fn stage(&mut self, name: impl Into<String>) {
        self.stages.push((name.into(), self.start.elapsed()));
    }

    /// Duration of each stage, not cumulative
    pub fn stage_times(&self) -> Vec<(&str, Duration)> {
        let mut prev = Duration::ZERO;
        self.stages
            .iter()
            .map(|(name, cumulative)| {
                let time = cumulative.saturating_sub(prev);
                prev = *cumulative;
                (name.as_str(), time)
            })
            .collect()
    }

    /// Stop the timer, log each stage, and return the total
    pub fn finish(self) -> Duration {
        let total = self.start.elapsed();
        for (name, time) in self.stage_times() {
            debug!("{} / {}: {}ms", self.label, name, time.as_millis());
        }
        debug!("{} total: {}ms", self.label, total.as_millis());
        total
    }
}
