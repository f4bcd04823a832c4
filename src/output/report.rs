//! Final run report

use crate::output::stats::{CategoryOutcome, FailedCategory, RunStats};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Failed categories listed in the printed summary
const MAX_FAILURES_SHOWN: usize = 10;

/// Summary of a batch run, written as JSON when the run ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub start_time: String,
    pub end_time: String,
    pub duration_seconds: f64,
    /// Human-readable duration such as `1h 02m 03s`
    pub duration: String,
    pub config_hash: String,
    /// True when the run was stopped before every selected category finished
    pub interrupted: bool,
    pub total_categories: usize,
    pub categories_processed: usize,
    pub categories_with_patterns: usize,
    pub categories_no_patterns: usize,
    pub categories_failed: usize,
    pub total_products_scraped: usize,
    pub success_rate: f64,
    pub outcomes: Vec<CategoryOutcome>,
    pub failed_categories: Vec<FailedCategory>,
}

impl RunReport {
    /// Builds the report from final statistics
    pub fn new(
        stats: &RunStats,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        config_hash: &str,
        interrupted: bool,
    ) -> Self {
        let elapsed = end - start;
        let duration_seconds = elapsed.num_milliseconds().max(0) as f64 / 1000.0;

        Self {
            start_time: start.to_rfc3339(),
            end_time: end.to_rfc3339(),
            duration_seconds,
            duration: format_duration(elapsed.num_seconds().max(0) as u64),
            config_hash: config_hash.to_string(),
            interrupted,
            total_categories: stats.total_categories,
            categories_processed: stats.categories_processed,
            categories_with_patterns: stats.categories_with_patterns,
            categories_no_patterns: stats.categories_no_patterns,
            categories_failed: stats.categories_failed,
            total_products_scraped: stats.total_products_scraped,
            success_rate: stats.success_rate(),
            outcomes: stats.outcomes.clone(),
            failed_categories: stats.failed_categories.clone(),
        }
    }

    /// Writes the report as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        tracing::info!("Saved run report to {}", path.display());
        Ok(())
    }

    /// Reads a previously saved report
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Logs the final summary
    pub fn log_summary(&self) {
        let heading = if self.interrupted {
            "Run interrupted"
        } else {
            "Run completed"
        };
        tracing::info!("{} after {}", heading, self.duration);
        tracing::info!(
            "Categories: {} in catalog, {} processed, {} with patterns, {} without, {} failed",
            self.total_categories,
            self.categories_processed,
            self.categories_with_patterns,
            self.categories_no_patterns,
            self.categories_failed
        );
        tracing::info!(
            "Products scraped: {}, success rate: {:.1}%",
            self.total_products_scraped,
            self.success_rate
        );

        let finished = self.categories_processed + self.categories_failed;
        if finished > 0 {
            tracing::info!(
                "Average time per category: {:.1}s",
                self.duration_seconds / finished as f64
            );
        }

        for failed in self.failed_categories.iter().take(MAX_FAILURES_SHOWN) {
            tracing::warn!("Failed: {} (id {}): {}", failed.name, failed.id, failed.error);
        }
        if self.failed_categories.len() > MAX_FAILURES_SHOWN {
            tracing::warn!(
                "... and {} more failed categories",
                self.failed_categories.len() - MAX_FAILURES_SHOWN
            );
        }
    }
}

/// Formats whole seconds as `Xh MMm SSs`, `Xm SSs` or `Xs`
pub fn format_duration(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
