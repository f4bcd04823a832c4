//! Removal of unproductive category logs
//!
//! A category whose log shows no products, no learned patterns, or products
//! without any attribute is dropped from the output directory and evicted
//! from the checkpoint, so the next run picks it up again.

use crate::orchestrator::category_log::{CategoryLog, LOG_SUFFIX};
use crate::state::{CheckpointEntry, CheckpointStore};
use crate::Result;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Why a category log is removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupReason {
    NoProducts,
    NoPatterns,
    NoAttributes,
}

impl CleanupReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoProducts => "no_products",
            Self::NoPatterns => "no_patterns",
            Self::NoAttributes => "no_attributes",
        }
    }
}

impl fmt::Display for CleanupReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Returns the reason a log should be removed, checked in order:
/// no products, no patterns, products without attributes
pub fn cleanup_reason(log: &CategoryLog) -> Option<CleanupReason> {
    if log.products_found == 0 {
        return Some(CleanupReason::NoProducts);
    }
    if !log.patterns_learned {
        return Some(CleanupReason::NoPatterns);
    }
    if !log.products.is_empty() && log.products_with_attributes() == 0 {
        return Some(CleanupReason::NoAttributes);
    }
    None
}

/// A log selected for removal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovedLog {
    pub path: PathBuf,
    pub category: String,
    pub category_id: Option<i64>,
    pub reason: CleanupReason,
}

/// What a cleanup pass found and did
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupSummary {
    pub dry_run: bool,
    pub logs_scanned: usize,
    pub logs_kept: usize,
    /// Logs that could not be read or parsed
    pub logs_unreadable: usize,
    pub removed: Vec<RemovedLog>,
    pub by_reason: BTreeMap<CleanupReason, usize>,
    /// Checkpoint entries dropped (or that would be dropped in a dry run)
    pub evicted: Vec<CheckpointEntry>,
    /// Checkpoint entries left afterwards
    pub remaining: usize,
}

/// Scans category logs, removes unproductive ones and evicts their categories
/// from the checkpoint
///
/// Running it twice in a row changes nothing the second time. In a dry run
/// the summary is computed but no file is touched.
///
/// # Arguments
///
/// * `output_dir` - Directory holding `*_log.json` files
/// * `checkpoints` - The checkpoint to evict from
/// * `dry_run` - Report only
pub fn cleanup(
    output_dir: &Path,
    checkpoints: &CheckpointStore,
    dry_run: bool,
) -> Result<CleanupSummary> {
    let mut summary = CleanupSummary {
        dry_run,
        ..CleanupSummary::default()
    };

    for path in log_files(output_dir)? {
        summary.logs_scanned += 1;

        let log = match CategoryLog::read(&path) {
            Ok(log) => log,
            Err(e) => {
                tracing::warn!("Skipping unreadable log {}: {}", path.display(), e);
                summary.logs_unreadable += 1;
                continue;
            }
        };

        match cleanup_reason(&log) {
            Some(reason) => {
                *summary.by_reason.entry(reason).or_insert(0) += 1;
                summary.removed.push(RemovedLog {
                    path,
                    category: log.category,
                    category_id: log.category_id,
                    reason,
                });
            }
            None => summary.logs_kept += 1,
        }
    }

    let ids: HashSet<i64> = summary
        .removed
        .iter()
        .filter_map(|removed| removed.category_id)
        .collect();
    let names: HashSet<String> = summary
        .removed
        .iter()
        .filter(|removed| removed.category_id.is_none())
        .map(|removed| removed.category.clone())
        .collect();

    let mut record = checkpoints.load()?;
    summary.evicted = record.evict(&ids, &names);
    summary.remaining = record.len();

    if dry_run {
        tracing::info!(
            "Dry run: {} of {} logs would be removed, {} checkpoint entries evicted",
            summary.removed.len(),
            summary.logs_scanned,
            summary.evicted.len()
        );
        return Ok(summary);
    }

    for removed in &summary.removed {
        match fs::remove_file(&removed.path) {
            Ok(()) => tracing::info!("Removed {} ({})", removed.category, removed.reason),
            Err(e) => tracing::warn!("Failed to remove {}: {}", removed.path.display(), e),
        }
    }

    if !summary.evicted.is_empty() || checkpoints.path().exists() {
        checkpoints.save(&record)?;
    }

    tracing::info!(
        "Cleanup removed {} logs and evicted {} checkpoint entries ({} remain)",
        summary.removed.len(),
        summary.evicted.len(),
        summary.remaining
    );

    Ok(summary)
}

/// Category log files in `dir`, sorted by name; a missing directory has none
fn log_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map_or(false, |name| name.ends_with(LOG_SUFFIX))
        })
        .collect();
    paths.sort();
    Ok(paths)
}
