//! Data models for batch planning and result merging
//!
//! This module contains all data structures used throughout the application.

mod batch;
mod summary;

pub use batch::{Batch, CommandSpec, Manifest, Strategy, TestId};
pub use summary::{ResultSummary, SummaryCounts, TestRecord};
