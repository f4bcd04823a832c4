//! Extraction rules and their persistence
//!
//! # Components
//!
//! - `ExtractionRule`: One method (regex or selector) plus an optional fallback chain
//! - `RuleSet`: Every rule learned for one category on one site
//! - `RuleStore`: Cached JSON persistence, one document per category/site

mod rule;
mod rule_set;
mod store;

pub use rule::{ExtractionRule, MethodKind, RuleIdentity, RuleMethod, RuleSource};
pub use rule_set::RuleSet;
pub use store::RuleStore;

use thiserror::Error;

/// Errors raised while reading or writing rule documents
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("malformed rule document {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("failed to serialize rule document: {0}")]
    Serialize(serde_json::Error),
}

/// Normalizes a category name into a file-name key
///
/// Lower-cases, drops apostrophes and other punctuation, and collapses runs of
/// whitespace, `-` and `_` into a single `_`. Different spellings of the same
/// category therefore share one rule document.
pub fn normalize_category_key(category: &str) -> String {
    let mut key = String::with_capacity(category.len());
    let mut pending_separator = false;

    for c in category.chars() {
        if c.is_alphanumeric() {
            if pending_separator && !key.is_empty() {
                key.push('_');
            }
            pending_separator = false;
            key.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_separator = true;
        }
    }

    key
}

/// File stem shared by the rule document of a category/site pair
pub fn rule_file_stem(category: &str, site: &str) -> String {
    format!("{}_{}", normalize_category_key(category), site)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_category_key() {
        assert_eq!(normalize_category_key("Phone Cases"), "phone_cases");
        assert_eq!(normalize_category_key("Men's Watches"), "mens_watches");
        assert_eq!(normalize_category_key("  T-Shirts & Tops "), "t_shirts_tops");
        assert_eq!(normalize_category_key("USB__Hubs"), "usb_hubs");
        assert_eq!(normalize_category_key("!!!"), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for name in ["Phone Cases", "Men's Watches", "a - b _ c"] {
            let once = normalize_category_key(name);
            assert_eq!(normalize_category_key(&once), once);
        }
    }

    #[test]
    fn test_rule_file_stem() {
        assert_eq!(rule_file_stem("Women's Shoes", "amazon"), "womens_shoes_amazon");
    }
}
