//! Rule application
//!
//! Shared by the extractor and by the learner, which scores candidate rules
//! by applying them to its own sample pages.

use crate::crawler::html::{document_text, element_text, parse_selector, select_block_text};
use crate::crawler::ProductFields;
use crate::learner::{clean_label, normalize_attribute_name};
use crate::rules::{ExtractionRule, RuleMethod, RuleSource};
use regex::{Regex, RegexBuilder};
use scraper::{ElementRef, Html, Selector};
use std::cell::OnceCell;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

/// Elements tried when a description rule runs and the scraped description is empty
const DESCRIPTION_FALLBACK_SELECTOR: &str =
    "#productDescription, #description, section#postingbody, [itemprop='description']";

/// Compiled patterns held before the cache is emptied
const REGEX_CACHE_LIMIT: usize = 4096;

type RegexCache = Mutex<HashMap<(String, String), Option<Regex>>>;

/// Compiled patterns keyed by pattern and flag string; invalid patterns are kept as `None`
fn regex_cache() -> &'static RegexCache {
    static CACHE: OnceLock<RegexCache> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// A parsed product page plus its basic fields
pub struct PageContext<'a> {
    document: &'a Html,
    fields: &'a ProductFields,
    full_text: OnceCell<String>,
    page_description: OnceCell<String>,
}

impl<'a> PageContext<'a> {
    pub fn new(document: &'a Html, fields: &'a ProductFields) -> Self {
        Self {
            document,
            fields,
            full_text: OnceCell::new(),
            page_description: OnceCell::new(),
        }
    }

    pub fn document(&self) -> &Html {
        self.document
    }

    pub fn fields(&self) -> &ProductFields {
        self.fields
    }

    /// Text a regex rule with the given source runs against
    pub fn source_text(&self, source: &RuleSource) -> &str {
        match source {
            RuleSource::Title => self.fields.name.as_str(),
            RuleSource::Description if !self.fields.description.is_empty() => {
                self.fields.description.as_str()
            }
            RuleSource::Description => self
                .page_description
                .get_or_init(|| {
                    Selector::parse(DESCRIPTION_FALLBACK_SELECTOR)
                        .ok()
                        .and_then(|selector| select_block_text(self.document, &selector))
                        .unwrap_or_default()
                })
                .as_str(),
            RuleSource::FullText => self
                .full_text
                .get_or_init(|| document_text(self.document))
                .as_str(),
            RuleSource::Field(name) => self.fields.get(name).unwrap_or(""),
        }
    }
}

/// Outcome of applying a rule chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub value: Option<String>,
    /// Number of methods tried, one per rule in the chain reached
    pub attempts: usize,
    /// True when the value is a configured default rather than extracted
    pub from_default: bool,
}

/// Applies a rule and its fallback chain
///
/// Rules are tried in chain order until one yields a non-empty value. If none
/// does, the deepest configured `default` is used.
pub fn apply_chain(rule: &ExtractionRule, page: &PageContext<'_>) -> Resolution {
    let mut attempts = 0;

    for link in rule.chain() {
        attempts += 1;
        if let Some(value) = apply_rule(link, page) {
            return Resolution {
                value: Some(value),
                attempts,
                from_default: false,
            };
        }
    }

    let default = rule
        .chain()
        .filter_map(|link| link.default.clone())
        .last();

    Resolution {
        from_default: default.is_some(),
        value: default,
        attempts,
    }
}

/// Applies one rule, ignoring its fallback
///
/// Malformed patterns and selectors are logged and yield no value.
pub fn apply_rule(rule: &ExtractionRule, page: &PageContext<'_>) -> Option<String> {
    let value = match &rule.method {
        RuleMethod::Regex {
            pattern,
            flags,
            group,
        } => {
            let text = page.source_text(&rule.source);
            if text.is_empty() {
                return None;
            }
            let regex = cached_regex(pattern, flags.as_deref())?;
            extract_by_regex(&regex, text, *group)
        }
        RuleMethod::Selector {
            selector,
            attribute,
            label,
        } => {
            let selector = parse_selector(selector)?;
            let element = match label {
                Some(label) => labelled_value(page.document(), &selector, label)?,
                None => page.document().select(&selector).next()?,
            };
            match attribute {
                Some(name) => element.value().attr(name).map(str::to_string),
                None => Some(element_text(element)),
            }
        }
    };

    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Value element of the first label element whose text names `label`
///
/// Labels are compared by attribute name, so `Item weight:` matches
/// `Item Weight`. The value is the label's next element sibling.
fn labelled_value<'d>(
    document: &'d Html,
    selector: &Selector,
    label: &str,
) -> Option<ElementRef<'d>> {
    let wanted = normalize_attribute_name(&clean_label(label));
    let names_label = |element: &ElementRef<'_>| {
        normalize_attribute_name(&clean_label(&element_text(*element))) == wanted
    };

    document
        .select(selector)
        .filter(names_label)
        .find_map(|element| element.next_siblings().find_map(ElementRef::wrap))
}

/// Compiled form of a pattern, built once per pattern and flag string
pub fn cached_regex(pattern: &str, flags: Option<&str>) -> Option<Regex> {
    let key = (pattern.to_string(), flags.unwrap_or("").to_string());

    if let Ok(cache) = regex_cache().lock() {
        if let Some(compiled) = cache.get(&key) {
            return compiled.clone();
        }
    }

    let compiled = compile_regex(pattern, flags);
    if let Ok(mut cache) = regex_cache().lock() {
        if cache.len() >= REGEX_CACHE_LIMIT {
            cache.clear();
        }
        cache.insert(key, compiled.clone());
    }
    compiled
}

/// Builds a regex from a pattern and a flag string such as `"IGNORECASE|DOTALL"`
pub fn compile_regex(pattern: &str, flags: Option<&str>) -> Option<Regex> {
    let flags = flags.unwrap_or("").to_ascii_uppercase();

    let result = RegexBuilder::new(pattern)
        .case_insensitive(flags.contains("IGNORECASE"))
        .multi_line(flags.contains("MULTILINE"))
        .dot_matches_new_line(flags.contains("DOTALL"))
        .build();

    match result {
        Ok(regex) => Some(regex),
        Err(e) => {
            tracing::warn!("Invalid regex pattern '{}': {}", pattern, e);
            None
        }
    }
}

/// Returns the declared group when it exists, else group 1 when the pattern
/// has groups, else the whole match
fn extract_by_regex(regex: &Regex, text: &str, group: Option<usize>) -> Option<String> {
    let captures = regex.captures(text)?;
    let group_count = captures.len() - 1;

    let index = match group {
        Some(g) if g > 0 && g <= group_count => g,
        _ if group_count > 0 => 1,
        _ => 0,
    };

    captures.get(index).map(|m| m.as_str().to_string())
}
