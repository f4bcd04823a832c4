//! Orchestrator module for resumable batch runs
//!
//! This module handles:
//! - Category selection and the per-category pipeline
//! - Per-category run logs in the output directory
//! - Cleanup of unproductive logs and checkpoint eviction
//! - Interrupts: stop after the current category, exit on the second one

mod category_log;
mod cleanup;
mod coordinator;
mod interrupt;

pub use category_log::{log_path, CategoryLog, ProductRecord, LOG_SUFFIX};
pub use cleanup::{cleanup, cleanup_reason, CleanupReason, CleanupSummary, RemovedLog};
pub use coordinator::{select_categories, ResumableOrchestrator, RunOptions};
pub use interrupt::{watch_interrupts, INTERRUPT_EXIT_CODE};
