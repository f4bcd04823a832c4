//! Attribute label filtering and normalization

use regex::{Regex, RegexBuilder};
use std::sync::OnceLock;

/// Labels at or above this length are prose, not attribute names
const MAX_LABEL_LENGTH: usize = 100;

/// Most characters outside `[A-Za-z0-9\s_-]` a label may contain
const MAX_SPECIAL_CHARS: usize = 2;

/// Fragments that only occur in scripts and inline code
const CODE_PATTERNS: [&str; 19] = [
    r"function\s*\(",
    r"var\s+\w+",
    r"window\.",
    r"return\s+",
    r"\.push\(",
    r"\.load\(",
    r"\.create\(",
    r"\.execute\(",
    r"=>",
    r"const\s+",
    r"let\s+",
    r"\{.*\}",
    r"\[.*\]",
    r"===|!==",
    r"typeof\s+",
    r"^\w+\(",
    r"javascript:",
    r"void\(",
    r"__\w+__",
];

/// CSS property names that leak out of inline styles
const CSS_PROPERTIES: [&str; 25] = [
    "color",
    "background",
    "margin",
    "padding",
    "border",
    "width",
    "height",
    "display",
    "position",
    "top",
    "left",
    "right",
    "bottom",
    "float",
    "font-size",
    "font-weight",
    "font-family",
    "line-height",
    "text-align",
    "word-wrap",
    "overflow",
    "z-index",
    "opacity",
    "cursor",
    "visibility",
];

fn code_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        CODE_PATTERNS
            .iter()
            .filter_map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .ok()
            })
            .collect()
    })
}

/// Strips whitespace and a trailing colon from a raw label
pub fn clean_label(raw: &str) -> String {
    raw.trim().trim_end_matches(':').trim_end().to_string()
}

/// Returns true if `label` looks like a product attribute name rather than code
///
/// A CSS property name is only rejected in its raw lower-case form, so a
/// `Color` row in a specification table is still accepted.
pub fn is_valid_attribute_name(label: &str) -> bool {
    let label = label.trim();

    if label.is_empty() || label.chars().count() >= MAX_LABEL_LENGTH {
        return false;
    }

    if code_patterns().iter().any(|pattern| pattern.is_match(label)) {
        return false;
    }

    if CSS_PROPERTIES.contains(&label) {
        return false;
    }

    if !label.chars().next().map_or(false, |c| c.is_ascii_alphabetic()) {
        return false;
    }

    let special = label
        .chars()
        .filter(|c| !(c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-' || *c == '_'))
        .count();

    special <= MAX_SPECIAL_CHARS
}

/// Turns a label into an attribute name
///
/// Lower-cases, replaces whitespace runs with `_`, drops everything that is
/// not a word character or `-`, and trims surrounding underscores.
pub fn normalize_attribute_name(label: &str) -> String {
    let lowered = label.trim().to_lowercase();

    let joined = lowered.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect();

    kept.trim_matches('_').to_string()
}
