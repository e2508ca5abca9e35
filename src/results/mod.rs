//! Result storage and merging
//!
//! Provides the on-disk artifact layout and the merge of per-batch reports.

mod merge;
mod storage;

pub use merge::{MergeOutcome, MergeReport, ResultMerger, SkippedFile};
pub use storage::{make_executable, read_json, write_json_atomic, write_text_atomic, ArtifactStore};
