//! Attribute extraction
//!
//! Applies learned rule sets to product pages and checks the result against
//! the category's required attributes:
//! - `apply`: rule and fallback-chain application on one page
//! - `validate`: coverage, datatype and constraint checks

mod apply;
mod validate;

pub use apply::{apply_chain, apply_rule, cached_regex, compile_regex, PageContext, Resolution};
pub use validate::{validate, ValidationReport};

use crate::crawler::ProductFields;
use crate::rules::{RuleSet, RuleStore};
use scraper::Html;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Attribute name to extracted value
pub type ExtractedAttributeMap = BTreeMap<String, String>;

/// Extracts attributes from product pages using stored rule sets
///
/// The extractor owns its [`RuleStore`], so each rule document is read at most
/// once per extractor.
#[derive(Debug)]
pub struct AttributeExtractor {
    store: RuleStore,
}

impl AttributeExtractor {
    pub fn new(store: RuleStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &RuleStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut RuleStore {
        &mut self.store
    }

    /// Rule set for a category/site pair, if one has been stored
    pub fn rule_set(&mut self, category: &str, site: &str) -> Option<Arc<RuleSet>> {
        self.store.load(category, site)
    }

    /// Extracts every attribute the category's rule set knows about
    ///
    /// # Arguments
    ///
    /// * `document` - The parsed product page
    /// * `fields` - Basic fields scraped with the page
    /// * `category` - Category name, in any spelling
    /// * `site` - Site identifier
    ///
    /// # Returns
    ///
    /// The extracted values; empty when no rule set exists for the pair
    pub fn extract(
        &mut self,
        document: &Html,
        fields: &ProductFields,
        category: &str,
        site: &str,
    ) -> ExtractedAttributeMap {
        let Some(rule_set) = self.store.load(category, site) else {
            tracing::debug!("No rules for '{}' on {}", category, site);
            return ExtractedAttributeMap::new();
        };

        let page = PageContext::new(document, fields);
        extract_with(&rule_set, &page)
    }
}

/// Applies a rule set to one page
///
/// For each attribute the top-level rules are tried in
/// [`RuleSet::ordered_rules`] order; the first chain that resolves wins.
pub fn extract_with(rule_set: &RuleSet, page: &PageContext<'_>) -> ExtractedAttributeMap {
    let mut extracted = ExtractedAttributeMap::new();

    for attribute in rule_set.attribute_names() {
        for rule in rule_set.ordered_rules(attribute) {
            let resolution = apply_chain(rule, page);
            if let Some(value) = resolution.value {
                tracing::debug!(
                    "{} = '{}' after {} attempt(s){}",
                    attribute,
                    value,
                    resolution.attempts,
                    if resolution.from_default { " (default)" } else { "" }
                );
                extracted.insert(attribute.to_string(), value);
                break;
            }
        }
    }

    extracted
}
