//! Run statistics
//!
//! Counters updated once per finished category, plus the periodic progress
//! summary written to the log.

use crate::state::CategoryState;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Final state of one category in a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryOutcome {
    pub id: i64,
    pub name: String,
    pub outcome: CategoryState,
    pub products_found: usize,
    pub patterns_learned: bool,
}

/// A category that failed, with the error that stopped it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedCategory {
    pub id: i64,
    pub name: String,
    pub error: String,
}

/// Counters for a batch run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Categories in the catalog
    pub total_categories: usize,

    /// Categories that finished without error, with or without patterns
    pub categories_processed: usize,

    pub categories_with_patterns: usize,

    pub categories_no_patterns: usize,

    pub categories_failed: usize,

    /// Product pages fetched across all categories
    pub total_products_scraped: usize,

    pub outcomes: Vec<CategoryOutcome>,

    pub failed_categories: Vec<FailedCategory>,
}

impl RunStats {
    pub fn new(total_categories: usize) -> Self {
        Self {
            total_categories,
            ..Self::default()
        }
    }

    /// Records a finished category
    ///
    /// `error` is only used for failed categories.
    pub fn record(&mut self, outcome: CategoryOutcome, error: Option<&str>) {
        self.total_products_scraped += outcome.products_found;

        match outcome.outcome {
            CategoryState::Learned => {
                self.categories_processed += 1;
                self.categories_with_patterns += 1;
            }
            CategoryState::NoPatterns => {
                self.categories_processed += 1;
                self.categories_no_patterns += 1;
            }
            CategoryState::Failed => {
                self.categories_failed += 1;
                self.failed_categories.push(FailedCategory {
                    id: outcome.id,
                    name: outcome.name.clone(),
                    error: error.unwrap_or("unknown error").to_string(),
                });
            }
            CategoryState::Pending | CategoryState::InProgress => {
                tracing::warn!(
                    "Category '{}' recorded in non-terminal state {}",
                    outcome.name,
                    outcome.outcome
                );
            }
        }

        self.outcomes.push(outcome);
    }

    /// Categories finished so far, failed ones included
    pub fn categories_finished(&self) -> usize {
        self.categories_processed + self.categories_failed
    }

    /// Percentage of processed categories that yielded patterns
    pub fn success_rate(&self) -> f64 {
        if self.categories_processed > 0 {
            (self.categories_with_patterns as f64 / self.categories_processed as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Logs a progress summary
    pub fn log_progress(&self, elapsed: Duration) {
        tracing::info!(
            "Progress: {} categories finished in {:?} ({} with patterns, {} without, {} failed, {} products, {:.1}% success)",
            self.categories_finished(),
            elapsed,
            self.categories_with_patterns,
            self.categories_no_patterns,
            self.categories_failed,
            self.total_products_scraped,
            self.success_rate()
        );
    }
}
