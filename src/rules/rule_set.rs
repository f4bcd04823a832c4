use crate::rules::rule::ExtractionRule;
use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// All extraction rules for one (category, site) pair
///
/// Each attribute maps to a list of top-level rules, each of which may carry
/// its own fallback chain. A learning run stores one chain per attribute;
/// alternates accumulate when rule documents are edited or merged by hand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub category: String,

    #[serde(default, alias = "website")]
    pub site: String,

    /// True iff at least one rule cleared the confidence threshold
    #[serde(default, alias = "patterns_found")]
    pub patterns_learned: bool,

    #[serde(default, alias = "total_products_analyzed")]
    pub products_analyzed: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learned_at: Option<String>,

    #[serde(with = "one_or_many")]
    pub attributes: BTreeMap<String, Vec<ExtractionRule>>,
}

impl RuleSet {
    pub fn new(category: &str, site: &str) -> Self {
        Self {
            category: category.to_string(),
            site: site.to_string(),
            ..Self::default()
        }
    }

    /// Adds a top-level rule (with its fallback chain) for an attribute
    pub fn insert(&mut self, mut rule: ExtractionRule) {
        let name = rule.attribute_name.clone();
        rule.set_attribute_name_if_empty(&name);
        self.attributes.entry(name).or_default().push(rule);
    }

    /// Top-level rules for `attribute`, in stored order
    pub fn rules_for(&self, attribute: &str) -> &[ExtractionRule] {
        self.attributes
            .get(attribute)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Top-level rules for `attribute` in the order they should be tried:
    /// highest frequency, then highest confidence, then lowest priority
    pub fn ordered_rules(&self, attribute: &str) -> Vec<&ExtractionRule> {
        let mut rules: Vec<&ExtractionRule> = self.rules_for(attribute).iter().collect();
        rules.sort_by(|a, b| compare_alternates(a, b));
        rules
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Total number of rules, counting every fallback
    pub fn rule_count(&self) -> usize {
        self.attributes
            .values()
            .flatten()
            .map(ExtractionRule::chain_depth)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.values().all(Vec::is_empty)
    }
}

fn compare_alternates(a: &ExtractionRule, b: &ExtractionRule) -> Ordering {
    b.frequency
        .cmp(&a.frequency)
        .then_with(|| b.confidence.total_cmp(&a.confidence))
        .then_with(|| a.priority.cmp(&b.priority))
}

/// Writes single-rule lists as a bare rule object and reads either form
mod one_or_many {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(Box<ExtractionRule>),
        Many(Vec<ExtractionRule>),
    }

    pub fn serialize<S: Serializer>(
        attributes: &BTreeMap<String, Vec<ExtractionRule>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(attributes.len()))?;
        for (name, rules) in attributes {
            match rules.as_slice() {
                [single] => map.serialize_entry(name, single)?,
                _ => map.serialize_entry(name, rules)?,
            }
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, Vec<ExtractionRule>>, D::Error> {
        let raw = BTreeMap::<String, OneOrMany>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|(name, entry)| {
                let mut rules = match entry {
                    OneOrMany::One(rule) => vec![*rule],
                    OneOrMany::Many(rules) => rules,
                };
                for rule in &mut rules {
                    rule.set_attribute_name_if_empty(&name);
                }
                (name, rules)
            })
            .collect())
    }
}
