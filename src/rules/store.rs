use crate::rules::{rule_file_stem, RuleError, RuleSet};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Reads and writes rule documents, one JSON file per (category, site)
///
/// Loaded documents are cached for the lifetime of the store and never
/// re-read. Saving writes through to the cache so a freshly learned rule set
/// is visible to the next lookup.
#[derive(Debug)]
pub struct RuleStore {
    dir: PathBuf,
    cache: HashMap<String, Arc<RuleSet>>,
}

impl RuleStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: HashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the rule document for a category/site pair
    pub fn path_for(&self, category: &str, site: &str) -> PathBuf {
        self.dir.join(format!("{}.json", rule_file_stem(category, site)))
    }

    /// Loads the rule set for a category/site pair
    ///
    /// A missing document means no rules have been learned yet. A document
    /// that cannot be read or parsed is a configuration defect: it is logged
    /// and treated the same as a missing one.
    pub fn load(&mut self, category: &str, site: &str) -> Option<Arc<RuleSet>> {
        let key = rule_file_stem(category, site);
        if let Some(cached) = self.cache.get(&key) {
            return Some(Arc::clone(cached));
        }

        let path = self.dir.join(format!("{}.json", key));
        if !path.exists() {
            tracing::debug!("No rule document at {}", path.display());
            return None;
        }

        match read_rule_set(&path) {
            Ok(rule_set) => {
                let rule_set = Arc::new(rule_set);
                self.cache.insert(key, Arc::clone(&rule_set));
                Some(rule_set)
            }
            Err(e) => {
                tracing::warn!("Ignoring unusable rule document: {}", e);
                None
            }
        }
    }

    /// Writes a rule set to disk and replaces the cached copy
    pub fn save(&mut self, rule_set: RuleSet) -> Result<Arc<RuleSet>, RuleError> {
        let key = rule_file_stem(&rule_set.category, &rule_set.site);
        let path = self.dir.join(format!("{}.json", key));

        fs::create_dir_all(&self.dir).map_err(|source| RuleError::Io {
            path: self.dir.display().to_string(),
            source,
        })?;

        let json = serde_json::to_string_pretty(&rule_set).map_err(RuleError::Serialize)?;
        fs::write(&path, json).map_err(|source| RuleError::Io {
            path: path.display().to_string(),
            source,
        })?;

        tracing::debug!(
            "Saved {} rules for '{}' to {}",
            rule_set.rule_count(),
            rule_set.category,
            path.display()
        );

        let rule_set = Arc::new(rule_set);
        self.cache.insert(key, Arc::clone(&rule_set));
        Ok(rule_set)
    }

    /// Reads every rule document in the directory, in file-name order
    ///
    /// Documents that fail to parse are logged and skipped; only an
    /// unreadable directory is an error.
    pub fn load_all(&self) -> Result<Vec<RuleSet>, RuleError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| RuleError::Io {
            path: self.dir.display().to_string(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().map_or(false, |ext| ext == "json"))
            .collect();
        paths.sort();

        let mut rule_sets = Vec::with_capacity(paths.len());
        for path in paths {
            match read_rule_set(&path) {
                Ok(rule_set) => rule_sets.push(rule_set),
                Err(e) => tracing::warn!("Skipping {}", e),
            }
        }

        Ok(rule_sets)
    }
}

fn read_rule_set(path: &Path) -> Result<RuleSet, RuleError> {
    let content = fs::read_to_string(path).map_err(|source| RuleError::Io {
        path: path.display().to_string(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| RuleError::Parse {
        path: path.display().to_string(),
        source,
    })
}
