//! Pattern learning
//!
//! Discovers extraction rules for a category from a small sample of product
//! pages:
//! - `structure`: label/value pairs in tables, definition lists and labelled siblings
//! - `labels`: filtering of code-like labels and attribute name normalization
//!
//! Free text (description, then title) is also scanned for `Label: value`
//! segments. Every candidate rule is scored by applying it to the sample with
//! the extractor's own rule application.

mod labels;
mod structure;

pub use labels::{clean_label, is_valid_attribute_name, normalize_attribute_name};
pub use structure::{css_path, find_pairs, label_scope, StructuredPair};

use crate::config::LearnerConfig;
use crate::crawler::html::clean_text;
use crate::crawler::ProductPage;
use crate::extractor::{apply_rule, PageContext};
use crate::rules::{ExtractionRule, RuleIdentity, RuleSet, RuleSource};
use scraper::Html;
use std::collections::{BTreeMap, BTreeSet};

/// Values longer than this are paragraphs, not attribute values
const MAX_VALUE_LENGTH: usize = 250;

/// Priority of regex rules over the description and title
const PRIORITY_DESCRIPTION: u32 = 4;
const PRIORITY_TITLE: u32 = 5;
const PRIORITY_OTHER_TEXT: u32 = 6;

/// Result of a learning run
#[derive(Debug, Clone, PartialEq)]
pub struct LearnOutcome {
    pub rule_set: RuleSet,
    /// True iff at least one rule cleared the confidence threshold
    pub patterns_learned: bool,
}

/// Where a value was found: selector, priority and, for keyed pairs, the label
type Location = (String, u32, Option<String>);

/// Everything seen on the sample pages, keyed by attribute name
#[derive(Debug, Default)]
struct Observations {
    /// Raw labels each attribute was seen under
    labels: BTreeMap<String, BTreeSet<String>>,
    /// Values seen per (page, attribute)
    values: BTreeMap<(usize, String), BTreeSet<String>>,
    /// Value locations per attribute, with the pages each was seen on
    locations: BTreeMap<String, BTreeMap<Location, BTreeSet<usize>>>,
    /// Text mentions per attribute: (source, raw label) -> pages
    mentions: BTreeMap<String, BTreeMap<(RuleSource, String), BTreeSet<usize>>>,
}

impl Observations {
    /// Validates and normalizes a label; returns the attribute name if usable
    fn accept(&mut self, page: usize, raw_label: &str, value: &str) -> Option<String> {
        let label = clean_label(raw_label);
        if !is_valid_attribute_name(&label) {
            return None;
        }

        let value = clean_text(value);
        if value.is_empty() || value.chars().count() > MAX_VALUE_LENGTH {
            return None;
        }

        let attribute = normalize_attribute_name(&label);
        if attribute.is_empty() {
            return None;
        }

        self.labels
            .entry(attribute.clone())
            .or_default()
            .insert(label);
        self.values
            .entry((page, attribute.clone()))
            .or_default()
            .insert(value);

        Some(attribute)
    }

    fn record_location(&mut self, page: usize, pair: &StructuredPair) {
        if let Some(attribute) = self.accept(page, &pair.label, &pair.value) {
            let label = pair.keyed.then(|| clean_label(&pair.label));
            self.locations
                .entry(attribute)
                .or_default()
                .entry((pair.selector.clone(), pair.priority, label))
                .or_default()
                .insert(page);
        }
    }

    fn record_mention(&mut self, page: usize, source: &RuleSource, label: &str, value: &str) {
        if let Some(attribute) = self.accept(page, label, value) {
            self.mentions
                .entry(attribute)
                .or_default()
                .entry((source.clone(), clean_label(label)))
                .or_default()
                .insert(page);
        }
    }

    fn attributes(&self) -> impl Iterator<Item = &String> {
        self.labels.keys()
    }

    fn observed(&self, page: usize, attribute: &str) -> Option<&BTreeSet<String>> {
        self.values.get(&(page, attribute.to_string()))
    }
}

/// Learns extraction rules from sample pages
#[derive(Debug, Clone)]
pub struct PatternLearner {
    config: LearnerConfig,
}

impl PatternLearner {
    pub fn new(config: LearnerConfig) -> Self {
        Self { config }
    }

    /// Number of pages a learning run looks at
    pub fn sample_size(&self) -> usize {
        self.config.sample_size
    }

    /// Learns a rule set for a category from sample pages
    ///
    /// # Arguments
    ///
    /// * `category` - Category name stored in the rule set
    /// * `site` - Site identifier stored in the rule set
    /// * `pages` - Fetched product pages; only the first `sample-size` are used
    ///
    /// # Returns
    ///
    /// The learned rule set. Finding nothing is a valid outcome: the rule set
    /// is then empty and `patterns_learned` is false.
    pub fn learn(&self, category: &str, site: &str, pages: &[ProductPage]) -> LearnOutcome {
        let sample = &pages[..pages.len().min(self.config.sample_size)];
        let documents: Vec<Html> = sample.iter().map(ProductPage::document).collect();
        let contexts: Vec<PageContext<'_>> = documents
            .iter()
            .zip(sample)
            .map(|(document, page)| PageContext::new(document, &page.fields))
            .collect();

        let observations = observe(&contexts);

        let mut rule_set = RuleSet::new(category, site);
        rule_set.products_analyzed = sample.len();
        rule_set.learned_at = Some(chrono::Utc::now().to_rfc3339());

        for attribute in observations.attributes() {
            let candidates = candidates_for(attribute, &observations, sample.len());
            let survivors = self.score(attribute, candidates, &observations, &contexts);

            let mut survivors = survivors.into_iter();
            if let Some(primary) = survivors.next() {
                let chain = survivors.fold(primary, ExtractionRule::then);
                tracing::debug!(
                    "Learned {} rule(s) for '{}' (frequency {}, confidence {:.2})",
                    chain.chain_depth(),
                    attribute,
                    chain.frequency,
                    chain.confidence
                );
                rule_set.insert(chain);
            }
        }

        let patterns_learned = !rule_set.is_empty();
        rule_set.patterns_learned = patterns_learned;

        if patterns_learned {
            tracing::info!(
                "Learned {} attribute(s) for '{}' from {} page(s)",
                rule_set.attributes.len(),
                category,
                sample.len()
            );
        } else {
            tracing::info!(
                "No patterns found for '{}' in {} page(s)",
                category,
                sample.len()
            );
        }

        LearnOutcome {
            rule_set,
            patterns_learned,
        }
    }

    /// Applies each candidate to the sample and keeps those above the threshold
    ///
    /// Survivors are returned in chain order: priority, then frequency and
    /// confidence, then signature.
    fn score(
        &self,
        attribute: &str,
        candidates: BTreeMap<RuleIdentity, ExtractionRule>,
        observations: &Observations,
        contexts: &[PageContext<'_>],
    ) -> Vec<ExtractionRule> {
        let sample_keys = observations
            .labels
            .get(attribute)
            .cloned()
            .unwrap_or_default();

        let mut survivors: Vec<(RuleIdentity, ExtractionRule)> = candidates
            .into_iter()
            .filter_map(|(identity, mut rule)| {
                let frequency = contexts
                    .iter()
                    .enumerate()
                    .filter(|(page, context)| {
                        let Some(expected) = observations.observed(*page, attribute) else {
                            return false;
                        };
                        apply_rule(&rule, context)
                            .map(|value| expected.contains(&clean_text(&value)))
                            .unwrap_or(false)
                    })
                    .count() as u32;

                rule.frequency = frequency;
                rule.confidence = frequency as f64 / contexts.len() as f64;
                rule.sample_keys = sample_keys.clone();

                if frequency > 0 && rule.confidence >= self.config.min_confidence {
                    Some((identity, rule))
                } else {
                    tracing::debug!(
                        "Discarding {:?} for '{}' (confidence {:.2})",
                        identity.signature,
                        attribute,
                        rule.confidence
                    );
                    None
                }
            })
            .collect();

        survivors.sort_by(|(a_id, a), (b_id, b)| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| b.frequency.cmp(&a.frequency))
                .then_with(|| b.confidence.total_cmp(&a.confidence))
                .then_with(|| a_id.signature.cmp(&b_id.signature))
        });

        survivors.into_iter().map(|(_, rule)| rule).collect()
    }
}

/// Collects structural pairs and text mentions from every sample page
fn observe(contexts: &[PageContext<'_>]) -> Observations {
    let mut observations = Observations::default();

    for (page, context) in contexts.iter().enumerate() {
        for pair in find_pairs(context.document()) {
            observations.record_location(page, &pair);
        }

        for source in [RuleSource::Description, RuleSource::Title] {
            for (label, value) in text_pairs(context.source_text(&source)) {
                observations.record_mention(page, &source, label, value);
            }
        }
    }

    observations
}

/// Splits text into `Label: value` segments
///
/// Segments are separated by newlines, `|`, `;` and `•`; the label is
/// everything before the first colon.
fn text_pairs(text: &str) -> Vec<(&str, &str)> {
    text.split(|c: char| matches!(c, '\n' | '|' | ';' | '•'))
        .filter_map(|segment| segment.split_once(':'))
        .map(|(label, value)| (label.trim(), value.trim()))
        .filter(|(label, value)| !label.is_empty() && !value.is_empty())
        .collect()
}

/// Regex matching a label followed by a colon and capturing the value
fn label_pattern(label: &str) -> String {
    format!(r"\b{}\s*:\s*([^\n|;•]+)", regex::escape(label))
}

fn text_priority(source: &RuleSource) -> u32 {
    match source {
        RuleSource::Description => PRIORITY_DESCRIPTION,
        RuleSource::Title => PRIORITY_TITLE,
        _ => PRIORITY_OTHER_TEXT,
    }
}

/// Builds candidate rules for one attribute, de-duplicated by identity
///
/// A location becomes a selector candidate once it is seen on at least
/// `min(2, sample_count)` pages. Keyed locations read the value next to the
/// attribute's label, wherever its row sits. Every text mention becomes a regex
/// candidate. An attribute only ever seen at unstable locations still gets
/// a description regex so it is scored rather than silently dropped.
fn candidates_for(
    attribute: &str,
    observations: &Observations,
    sample_count: usize,
) -> BTreeMap<RuleIdentity, ExtractionRule> {
    let mut candidates = BTreeMap::new();
    let min_pages = sample_count.min(2);

    let locations = observations.locations.get(attribute);
    let mentions = observations.mentions.get(attribute);

    for ((selector, priority, label), pages) in locations.into_iter().flatten() {
        if pages.len() >= min_pages {
            let rule = ExtractionRule::selector(attribute, selector).priority(*priority);
            let rule = match label {
                Some(label) => rule.label(label),
                None => rule,
            };
            add_candidate(&mut candidates, rule);
        }
    }

    for (source, label) in mentions.into_iter().flatten().map(|(key, _)| key) {
        add_candidate(
            &mut candidates,
            ExtractionRule::regex(attribute, &label_pattern(label), source.clone())
                .flags("IGNORECASE")
                .priority(text_priority(source)),
        );
    }

    let no_text = mentions.map_or(true, BTreeMap::is_empty);
    if candidates.is_empty() && no_text {
        if let Some(label) = observations
            .labels
            .get(attribute)
            .and_then(|labels| labels.iter().next())
        {
            add_candidate(
                &mut candidates,
                ExtractionRule::regex(attribute, &label_pattern(label), RuleSource::Description)
                    .flags("IGNORECASE")
                    .priority(PRIORITY_DESCRIPTION),
            );
        }
    }

    candidates
}

fn add_candidate(candidates: &mut BTreeMap<RuleIdentity, ExtractionRule>, rule: ExtractionRule) {
    candidates.entry(rule.identity()).or_insert(rule);
}
