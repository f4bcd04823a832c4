//! Rule consolidation across categories
//!
//! Flattens every rule chain of every stored rule set into standalone rules,
//! merges rules with the same identity and ranks the result into a shared
//! library.

mod merge;

pub use merge::merge_rules;

use crate::rules::{ExtractionRule, RuleIdentity, RuleSet};
use crate::{MinerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Deduplicated, frequency-ranked rules from many categories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedLibrary {
    pub total_categories_processed: usize,
    pub categories_with_patterns: usize,
    pub total_products_analyzed: usize,
    pub unique_patterns_count: usize,
    pub patterns: Vec<ExtractionRule>,
}

/// Accumulates rule sets into a [`ConsolidatedLibrary`]
#[derive(Debug, Default)]
pub struct PatternConsolidator {
    patterns: BTreeMap<RuleIdentity, ExtractionRule>,
    categories: usize,
    categories_with_patterns: usize,
    products_analyzed: usize,
}

impl PatternConsolidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds every rule of a rule set, fallbacks included, as standalone rules
    pub fn add(&mut self, rule_set: &RuleSet) {
        self.categories += 1;
        self.products_analyzed += rule_set.products_analyzed;
        if rule_set.patterns_learned {
            self.categories_with_patterns += 1;
        }

        for rule in rule_set.attributes.values().flatten().flat_map(ExtractionRule::chain) {
            let standalone = rule.without_fallback();
            match self.patterns.get_mut(&standalone.identity()) {
                Some(existing) => merge_rules(existing, &standalone),
                None => {
                    self.patterns.insert(standalone.identity(), standalone);
                }
            }
        }
    }

    /// Ranks the merged rules by frequency, then confidence, then identity
    pub fn finish(self) -> ConsolidatedLibrary {
        let mut ranked: Vec<(RuleIdentity, ExtractionRule)> = self.patterns.into_iter().collect();
        ranked.sort_by(|(a_id, a), (b_id, b)| {
            b.frequency
                .cmp(&a.frequency)
                .then_with(|| b.confidence.total_cmp(&a.confidence))
                .then_with(|| a_id.cmp(b_id))
        });

        let patterns: Vec<ExtractionRule> = ranked.into_iter().map(|(_, rule)| rule).collect();

        ConsolidatedLibrary {
            total_categories_processed: self.categories,
            categories_with_patterns: self.categories_with_patterns,
            total_products_analyzed: self.products_analyzed,
            unique_patterns_count: patterns.len(),
            patterns,
        }
    }
}

/// Consolidates a collection of rule sets
pub fn consolidate(rule_sets: &[RuleSet]) -> ConsolidatedLibrary {
    let mut consolidator = PatternConsolidator::new();
    for rule_set in rule_sets {
        consolidator.add(rule_set);
    }
    consolidator.finish()
}

/// Writes the library as pretty JSON, creating parent directories
pub fn write_library(library: &ConsolidatedLibrary, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(library).map_err(MinerError::Json)?;
    fs::write(path, json)?;

    tracing::info!(
        "Wrote {} unique patterns from {} categories to {}",
        library.unique_patterns_count,
        library.total_categories_processed,
        path.display()
    );
    Ok(())
}
