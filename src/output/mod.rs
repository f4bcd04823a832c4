//! Output module for run statistics and reports
//!
//! This module handles:
//! - Counting category outcomes during a batch run
//! - Periodic progress summaries
//! - The final JSON run report

mod report;
pub mod stats;

pub use report::{format_duration, RunReport};
pub use stats::{CategoryOutcome, FailedCategory, RunStats};
