//! Per-category run logs

use crate::catalog::CategoryRecord;
use crate::extractor::{ExtractedAttributeMap, ValidationReport};
use crate::rules::normalize_category_key;
use crate::state::CategoryState;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name suffix shared by every category log
pub const LOG_SUFFIX: &str = "_log.json";

/// One product processed for a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub attributes: ExtractedAttributeMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
}

/// Everything a run produced for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryLog {
    pub category: String,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub site: String,
    #[serde(default = "default_outcome")]
    pub outcome: CategoryState,
    #[serde(default)]
    pub products_found: usize,
    #[serde(default)]
    pub patterns_learned: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub products: Vec<ProductRecord>,
}

fn default_outcome() -> CategoryState {
    CategoryState::Pending
}

impl CategoryLog {
    /// Starts an empty log for a category
    pub fn new(category: &CategoryRecord, site: &str) -> Self {
        Self {
            category: category.name.clone(),
            category_id: Some(category.id),
            site: site.to_string(),
            outcome: CategoryState::Pending,
            products_found: 0,
            patterns_learned: false,
            error: None,
            products: Vec::new(),
        }
    }

    /// Number of products with at least one extracted attribute
    pub fn products_with_attributes(&self) -> usize {
        self.products
            .iter()
            .filter(|product| !product.attributes.is_empty())
            .count()
    }

    /// Writes the log into `dir`, replacing an older log of the same category
    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = log_path(dir, &self.site, &self.category);
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Path of the log for a category: `<dir>/<site>_<normalized category>_log.json`
pub fn log_path(dir: &Path, site: &str, category: &str) -> PathBuf {
    dir.join(format!(
        "{}_{}{}",
        site,
        normalize_category_key(category),
        LOG_SUFFIX
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn category() -> CategoryRecord {
        CategoryRecord {
            id: 7,
            name: "Men's Watches".to_string(),
            description: None,
            product_def_id: None,
            product_def_name: None,
        }
    }

    #[test]
    fn test_log_path() {
        let path = log_path(Path::new("out"), "shop", "Men's Watches");
        assert_eq!(path, Path::new("out/shop_mens_watches_log.json"));
    }

    #[test]
    fn test_write_and_read() {
        let dir = TempDir::new().unwrap();
        let mut log = CategoryLog::new(&category(), "shop");
        log.outcome = CategoryState::Learned;
        log.products_found = 1;
        log.patterns_learned = true;
        log.products.push(ProductRecord {
            url: "https://shop.example.com/p/1".to_string(),
            title: "Watch".to_string(),
            attributes: [("brand".to_string(), "Acme".to_string())].into(),
            validation: None,
        });

        let path = log.write(dir.path()).unwrap();
        assert!(path.ends_with("shop_mens_watches_log.json"));
        assert_eq!(CategoryLog::read(&path).unwrap(), log);
        assert_eq!(log.products_with_attributes(), 1);
    }

    #[test]
    fn test_read_tolerates_sparse_logs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shop_x_log.json");
        fs::write(&path, r#"{"category": "X", "products_found": 0}"#).unwrap();

        let log = CategoryLog::read(&path).unwrap();
        assert_eq!(log.category_id, None);
        assert!(!log.patterns_learned);
        assert!(log.products.is_empty());
    }
}
