//! Output formatting module
//!
//! Provides console and file output for plan and merge outcomes.

mod formatter;

pub use formatter::{export_csv, OutputFormat, ResultFormatter};
