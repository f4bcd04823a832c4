use crate::{MinerError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// One processed category in the checkpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointEntry {
    pub id: i64,
    pub name: String,
    /// RFC 3339 time at which the category finished
    pub timestamp: String,
}

/// Durable record of the categories a batch has finished
///
/// Entries are appended once per completed category, in completion order.
/// Cleanup may prune entries so the category is picked up again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    #[serde(default)]
    pub processed_categories: Vec<CheckpointEntry>,
    #[serde(default)]
    pub last_category_id: Option<i64>,
}

impl CheckpointRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a finished category and moves the `last_category_id` pointer to it
    pub fn append(&mut self, id: i64, name: &str) {
        self.processed_categories.push(CheckpointEntry {
            id,
            name: name.to_string(),
            timestamp: Utc::now().to_rfc3339(),
        });
        self.last_category_id = Some(id);
    }

    pub fn contains(&self, id: i64) -> bool {
        self.processed_categories.iter().any(|entry| entry.id == id)
    }

    /// Ids of every processed category
    pub fn processed_ids(&self) -> HashSet<i64> {
        self.processed_categories.iter().map(|entry| entry.id).collect()
    }

    pub fn len(&self) -> usize {
        self.processed_categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processed_categories.is_empty()
    }

    /// Removes entries matching one of `ids`, or one of `names` when the id is
    /// not listed, and returns the removed entries
    ///
    /// Remaining entries are de-duplicated by id (first occurrence wins) and
    /// `last_category_id` is recomputed from what is left.
    pub fn evict(&mut self, ids: &HashSet<i64>, names: &HashSet<String>) -> Vec<CheckpointEntry> {
        let mut removed = Vec::new();
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(self.processed_categories.len());

        for entry in self.processed_categories.drain(..) {
            if ids.contains(&entry.id) || names.contains(&entry.name) {
                removed.push(entry);
            } else if seen.insert(entry.id) {
                kept.push(entry);
            }
        }

        self.processed_categories = kept;
        self.recompute_last();
        removed
    }

    /// Points `last_category_id` at the final remaining entry, or None
    pub fn recompute_last(&mut self) {
        self.last_category_id = self.processed_categories.last().map(|entry| entry.id);
    }
}

/// Loads and persists the checkpoint file
///
/// Writes go to a sibling temp file first and are then renamed over the
/// checkpoint, so a crash never leaves a half-written document behind.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the checkpoint
    ///
    /// # Returns
    ///
    /// * `Ok(CheckpointRecord)` - The stored record, or an empty one if no file exists
    /// * `Err(MinerError)` - The file exists but cannot be read or parsed
    pub fn load(&self) -> Result<CheckpointRecord> {
        if !self.path.exists() {
            return Ok(CheckpointRecord::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|source| self.io_error(source))?;
        let record = serde_json::from_str(&content)?;
        Ok(record)
    }

    /// Persists the checkpoint synchronously
    ///
    /// Any failure here is returned as `MinerError::Checkpoint`; callers must
    /// stop the run rather than continue with unpersisted progress.
    pub fn save(&self, record: &CheckpointRecord) -> Result<()> {
        let json = serde_json::to_string_pretty(record)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
            }
        }

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(|source| self.io_error(source))?;
        fs::rename(&tmp_path, &self.path).map_err(|source| self.io_error(source))?;
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> MinerError {
        MinerError::Checkpoint {
            path: self.path.display().to_string(),
            source,
        }
    }
}
