//! Label/value structures on a product page
//!
//! Finds label/value pairs in tables, definition lists and labelled sibling
//! elements. A pair is located by the selector of its label elements within
//! the nearest stable container plus the label text, so the same attribute is
//! found again when rows appear in a different order. Pairs without a label
//! element fall back to a positional CSS path.

use crate::crawler::html::element_text;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;

/// Class fragments that mark an element as the label of the next sibling
const LABEL_CLASS_MARKERS: [&str; 5] = [
    "label",
    "key",
    "a-col-left",
    "a-text-bold",
    "rpi-attribute-label",
];

/// Author links on book pages carry no label of their own
const AUTHOR_LINK_SELECTOR: &str = "span.author a[href*='/e/']";

/// Selector priority by anchor kind; lower is more specific
pub const PRIORITY_ID: u32 = 1;
pub const PRIORITY_CLASS: u32 = 2;
pub const PRIORITY_TAG: u32 = 3;

/// A label/value pair found in the page structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredPair {
    /// Raw label text as shown on the page
    pub label: String,
    pub value: String,
    /// Label elements in the pair's container, or a CSS path to the value
    /// when `keyed` is false
    pub selector: String,
    pub priority: u32,
    /// True when the value is found by matching the label text
    pub keyed: bool,
}

/// Finds label/value pairs in a parsed page
///
/// Pairs come from two-cell table rows, `dt`/`dd` pairs and elements with a
/// label-like class followed by a value sibling. Duplicate locations are
/// reported once.
pub fn find_pairs(document: &Html) -> Vec<StructuredPair> {
    let mut pairs = Vec::new();
    let mut seen = BTreeSet::new();

    let mut push = |label: String,
                    label_element: Option<ElementRef<'_>>,
                    value_element: ElementRef<'_>| {
        let value = element_text(value_element);
        if label.is_empty() || value.is_empty() {
            return;
        }
        let ((selector, priority), keyed) = match label_element {
            Some(element) => (label_scope(document, element), true),
            None => (css_path(document, value_element), false),
        };
        if seen.insert((label.clone(), selector.clone())) {
            pairs.push(StructuredPair {
                label,
                value,
                selector,
                priority,
                keyed,
            });
        }
    };

    if let Ok(rows) = Selector::parse("tr") {
        for row in document.select(&rows) {
            let cells: Vec<ElementRef<'_>> = child_elements(row).collect();
            if let [label, value] = cells.as_slice() {
                let label_tag = label.value().name();
                if (label_tag == "th" || label_tag == "td") && value.value().name() == "td" {
                    push(element_text(*label), Some(*label), *value);
                }
            }
        }
    }

    if let Ok(terms) = Selector::parse("dt") {
        for term in document.select(&terms) {
            if let Some(definition) = next_element_sibling(term) {
                if definition.value().name() == "dd" {
                    push(element_text(term), Some(term), definition);
                }
            }
        }
    }

    if let Ok(classed) = Selector::parse("[class]") {
        for element in document.select(&classed) {
            if matches!(element.value().name(), "tr" | "th" | "td" | "dt" | "dd") {
                continue;
            }
            let is_label = element.value().classes().any(|class| {
                LABEL_CLASS_MARKERS
                    .iter()
                    .any(|marker| class.contains(marker))
            });
            if !is_label {
                continue;
            }
            if let Some(value) = next_element_sibling(element) {
                push(element_text(element), Some(element), value);
            }
        }
    }

    if let Ok(author) = Selector::parse(AUTHOR_LINK_SELECTOR) {
        if let Some(link) = document.select(&author).next() {
            push("Author".to_string(), None, link);
        }
    }

    pairs
}

fn child_elements<'a>(element: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.children().filter_map(ElementRef::wrap)
}

fn next_element_sibling(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.next_siblings().find_map(ElementRef::wrap)
}

/// Selector for `label` and the other label elements of its container
///
/// The container is the nearest ancestor with a usable `id`, a class that
/// identifies exactly one element of the page, or `body`. A label carrying a
/// label-like class keeps that class in the selector.
pub fn label_scope(document: &Html, label: ElementRef<'_>) -> (String, u32) {
    let (container, priority) = label
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find_map(|ancestor| anchor(document, ancestor))
        .unwrap_or_else(|| ("body".to_string(), PRIORITY_TAG));

    let tag = label.value().name();
    let target = match marker_class(label) {
        Some(class) => format!("{}.{}", tag, class),
        None => tag.to_string(),
    };

    (format!("{} {}", container, target), priority)
}

/// Builds a CSS path to `element` and the priority of its anchor
///
/// The path climbs until it reaches an element with a usable `id` (`tag#id`),
/// a class that identifies exactly one element of the page (`tag.class`), or
/// `body`. Each step below the anchor is `tag:nth-of-type(k)`.
pub fn css_path(document: &Html, element: ElementRef<'_>) -> (String, u32) {
    let mut steps = Vec::new();
    let mut current = element;

    let (root, priority) = loop {
        if let Some(found) = anchor(document, current) {
            break found;
        }

        match current.parent().and_then(ElementRef::wrap) {
            Some(parent) if parent.value().name() != "html" => {
                let tag = current.value().name();
                steps.push(format!("{}:nth-of-type({})", tag, position_of_type(current)));
                current = parent;
            }
            _ => break ("body".to_string(), PRIORITY_TAG),
        }
    };

    let mut path = root;
    for step in steps.iter().rev() {
        path.push_str(" > ");
        path.push_str(step);
    }

    (path, priority)
}

/// `tag#id`, a unique `tag.class` or `body` when `element` can anchor a selector
fn anchor(document: &Html, element: ElementRef<'_>) -> Option<(String, u32)> {
    let tag = element.value().name();

    if let Some(id) = element.value().id().filter(|id| is_css_identifier(id)) {
        return Some((format!("{}#{}", tag, id), PRIORITY_ID));
    }

    if let Some(class) = unique_class(document, element) {
        return Some((format!("{}.{}", tag, class), PRIORITY_CLASS));
    }

    (tag == "body").then(|| ("body".to_string(), PRIORITY_TAG))
}

/// First class of `element` containing a label marker
fn marker_class<'a>(element: ElementRef<'a>) -> Option<&'a str> {
    element.value().classes().find(|class| {
        is_css_identifier(class)
            && LABEL_CLASS_MARKERS
                .iter()
                .any(|marker| class.contains(marker))
    })
}

/// One-based position among siblings with the same tag
fn position_of_type(element: ElementRef<'_>) -> usize {
    let tag = element.value().name();
    1 + element
        .prev_siblings()
        .filter_map(ElementRef::wrap)
        .filter(|sibling| sibling.value().name() == tag)
        .count()
}

/// First class of `element` that selects only it within the document
fn unique_class<'a>(document: &Html, element: ElementRef<'a>) -> Option<&'a str> {
    let tag = element.value().name();

    element
        .value()
        .classes()
        .filter(|class| is_css_identifier(class))
        .find(|class| {
            Selector::parse(&format!("{}.{}", tag, class))
                .map(|selector| document.select(&selector).take(2).count() == 1)
                .unwrap_or(false)
        })
}

fn is_css_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().map_or(false, |c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
