//! HTML helpers shared by the scraper, learner and extractor
//!
//! Text is always cleaned the same way so that a value observed while
//! learning compares equal to the value a rule later extracts.

use scraper::{ElementRef, Html, Node, Selector};

/// Elements whose text is never page content
const NON_CONTENT_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Collapses whitespace runs and removes zero-width and bidi control characters
pub fn clean_text(text: &str) -> String {
    text.split(|c: char| c.is_whitespace())
        .map(|word| word.chars().filter(|c| !is_invisible(*c)).collect::<String>())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_invisible(c: char) -> bool {
    matches!(c, '\u{200b}'..='\u{200f}' | '\u{202a}'..='\u{202e}' | '\u{feff}')
}

/// Cleaned text content of an element
pub fn element_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

/// Visible text of a whole document, one cleaned line per text node
///
/// Script, style and template contents are skipped.
pub fn document_text(document: &Html) -> String {
    block_text(document.root_element())
}

/// Visible text below an element, one cleaned line per text node
///
/// Keeps line structure so `Label: value` segments stay separable.
pub fn block_text(element: ElementRef<'_>) -> String {
    let mut lines = Vec::new();

    for node in element.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map_or(false, |el| NON_CONTENT_TAGS.contains(&el.name()))
        });
        if hidden {
            continue;
        }

        let line = clean_text(text);
        if !line.is_empty() {
            lines.push(line);
        }
    }

    lines.join("\n")
}

/// Parses a selector, logging configuration defects instead of failing
pub fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!("Invalid CSS selector '{}': {:?}", selector, e);
            None
        }
    }
}

/// Cleaned text of the first element matching `selector`, if non-empty
pub fn select_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(element_text)
        .filter(|text| !text.is_empty())
}

/// Line-structured text of the first element matching `selector`, if non-empty
pub fn select_block_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(block_text)
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_block_text_keeps_lines() {
        let document = Html::parse_document(
            "<div id='d'><p>Material: Silicone</p><p>Weight:  30 g</p></div>",
        );
        let selector = Selector::parse("#d").unwrap();
        assert_eq!(
            select_block_text(&document, &selector),
            Some("Material: Silicone\nWeight: 30 g".to_string())
        );
    }

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  16 \n\t GB  "), "16 GB");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn test_clean_text_strips_invisible_characters() {
        assert_eq!(clean_text("\u{200e}Black\u{200f}"), "Black");
        assert_eq!(clean_text("\u{feff}Brand \u{200b} Name"), "Brand Name");
    }

    #[test]
    fn test_element_text_joins_children() {
        let document =
            Html::parse_fragment("<table><tr><td>16<b>GB</b> RAM</td></tr></table>");
        let selector = Selector::parse("td").unwrap();
        let td = document.select(&selector).next().unwrap();
        assert_eq!(element_text(td), "16 GB RAM");
    }

    #[test]
    fn test_document_text_skips_scripts() {
        let html = r#"<html><head><style>p { color: red; }</style></head>
            <body><p>Weight: 200 g</p><script>var x = 1;</script><p>Brand: Acme</p></body></html>"#;
        let text = document_text(&Html::parse_document(html));
        assert_eq!(text, "Weight: 200 g\nBrand: Acme");
    }

    #[test]
    fn test_select_text() {
        let document = Html::parse_document("<h1 id='t'> Phone  Case </h1><h2></h2>");
        assert_eq!(
            select_text(&document, &Selector::parse("#t").unwrap()),
            Some("Phone Case".to_string())
        );
        assert_eq!(select_text(&document, &Selector::parse("h2").unwrap()), None);
        assert_eq!(select_text(&document, &Selector::parse("h3").unwrap()), None);
    }

    #[test]
    fn test_parse_selector_rejects_malformed() {
        assert!(parse_selector("div.spec > td").is_some());
        assert!(parse_selector("div[").is_none());
    }
}
