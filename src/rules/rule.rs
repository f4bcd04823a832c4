use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// How a rule pulls a value out of its source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum RuleMethod {
    /// Search the source text; return the declared group, else group 1, else the whole match
    Regex {
        pattern: String,
        /// Flag names such as `"IGNORECASE|MULTILINE"`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        flags: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        group: Option<usize>,
    },
    /// First node matching a CSS selector; an HTML attribute of it, or its text
    ///
    /// With a `label`, the selector matches label elements instead: the first
    /// one whose text names the label is taken and its next element sibling
    /// is read.
    Selector {
        selector: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attribute: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
}

impl RuleMethod {
    pub fn kind(&self) -> MethodKind {
        match self {
            Self::Regex { .. } => MethodKind::Regex,
            Self::Selector { .. } => MethodKind::Selector,
        }
    }
}

/// Discriminant of [`RuleMethod`], used in identity keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    Regex,
    Selector,
}

/// Where a regex rule reads its text from
///
/// Selector rules always run against the page document, so the source only
/// matters for regex rules.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum RuleSource {
    /// The product name
    #[default]
    Title,
    /// The product description
    Description,
    /// Visible text of the whole page
    FullText,
    /// A named field scraped alongside the product
    Field(String),
}

impl RuleSource {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::FullText => "full_text",
            Self::Field(name) => name,
        }
    }

    /// Parses the plain-string form; unknown names become [`RuleSource::Field`]
    pub fn from_name(name: &str) -> Self {
        match name {
            "title" | "name" => Self::Title,
            "description" => Self::Description,
            "full_text" | "all" => Self::FullText,
            other => Self::Field(other.to_string()),
        }
    }
}

impl fmt::Display for RuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SourceRepr {
    Name(String),
    Field { field: String },
}

impl Serialize for RuleSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Field(field) => SourceRepr::Field {
                field: field.clone(),
            }
            .serialize(serializer),
            other => serializer.serialize_str(other.as_str()),
        }
    }
}

impl<'de> Deserialize<'de> for RuleSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match SourceRepr::deserialize(deserializer)? {
            SourceRepr::Name(name) => Self::from_name(&name),
            SourceRepr::Field { field } => Self::Field(field),
        })
    }
}

/// One way to obtain one attribute's value
///
/// `frequency`, `confidence` and `sample_keys` are statistics gathered while
/// learning; they never take part in [`ExtractionRule::identity`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRule {
    #[serde(default)]
    pub attribute_name: String,

    #[serde(flatten)]
    pub method: RuleMethod,

    #[serde(default)]
    pub source: RuleSource,

    /// Tried when this rule yields nothing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<Box<ExtractionRule>>,

    /// Used when the whole chain yields nothing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// Lower is more specific
    #[serde(default)]
    pub priority: u32,

    #[serde(default)]
    pub frequency: u32,

    #[serde(default)]
    pub confidence: f64,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub sample_keys: BTreeSet<String>,
}

/// Deduplication key of a rule: method kind, priority and structural signature
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleIdentity {
    pub kind: MethodKind,
    pub priority: u32,
    pub signature: String,
}

impl ExtractionRule {
    /// Creates a regex rule reading from `source`
    pub fn regex(attribute_name: &str, pattern: &str, source: RuleSource) -> Self {
        Self::with_method(
            attribute_name,
            RuleMethod::Regex {
                pattern: pattern.to_string(),
                flags: None,
                group: None,
            },
            source,
        )
    }

    /// Creates a selector rule returning the matched node's text
    pub fn selector(attribute_name: &str, selector: &str) -> Self {
        Self::with_method(
            attribute_name,
            RuleMethod::Selector {
                selector: selector.to_string(),
                attribute: None,
                label: None,
            },
            RuleSource::FullText,
        )
    }

    fn with_method(attribute_name: &str, method: RuleMethod, source: RuleSource) -> Self {
        Self {
            attribute_name: attribute_name.to_string(),
            method,
            source,
            fallback: None,
            default: None,
            priority: 0,
            frequency: 0,
            confidence: 0.0,
            sample_keys: BTreeSet::new(),
        }
    }

    /// Sets regex flags; no effect on selector rules
    pub fn flags(mut self, value: &str) -> Self {
        if let RuleMethod::Regex { flags, .. } = &mut self.method {
            *flags = Some(value.to_string());
        }
        self
    }

    /// Sets the regex capture group; no effect on selector rules
    pub fn group(mut self, value: usize) -> Self {
        if let RuleMethod::Regex { group, .. } = &mut self.method {
            *group = Some(value);
        }
        self
    }

    /// Reads an HTML attribute instead of text; no effect on regex rules
    pub fn html_attribute(mut self, value: &str) -> Self {
        if let RuleMethod::Selector { attribute, .. } = &mut self.method {
            *attribute = Some(value.to_string());
        }
        self
    }

    /// Reads the value next to the label element named `value`; no effect on
    /// regex rules
    pub fn label(mut self, value: &str) -> Self {
        if let RuleMethod::Selector { label, .. } = &mut self.method {
            *label = Some(value.to_string());
        }
        self
    }

    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn default_value(mut self, value: &str) -> Self {
        self.default = Some(value.to_string());
        self
    }

    /// Appends `rule` at the end of this rule's fallback chain
    pub fn then(mut self, rule: ExtractionRule) -> Self {
        self.push_fallback(rule);
        self
    }

    fn push_fallback(&mut self, rule: ExtractionRule) {
        match &mut self.fallback {
            Some(next) => next.push_fallback(rule),
            None => self.fallback = Some(Box::new(rule)),
        }
    }

    /// Number of rules in the chain starting here
    pub fn chain_depth(&self) -> usize {
        self.chain().count()
    }

    /// Iterates this rule followed by its fallbacks
    pub fn chain(&self) -> impl Iterator<Item = &ExtractionRule> {
        std::iter::successors(Some(self), |rule| rule.fallback.as_deref())
    }

    /// This rule on its own, with the fallback chain removed
    pub fn without_fallback(&self) -> ExtractionRule {
        ExtractionRule {
            fallback: None,
            ..self.clone()
        }
    }

    /// Identity used to recognise the same rule learned in different categories
    pub fn identity(&self) -> RuleIdentity {
        let signature = match &self.method {
            RuleMethod::Selector {
                selector,
                attribute,
                label,
            } => format!(
                "{}|{}|{}",
                selector,
                attribute.as_deref().unwrap_or(""),
                label.as_deref().unwrap_or("")
            ),
            RuleMethod::Regex {
                pattern,
                flags,
                group,
            } => format!(
                "{}|{}|{}|{}",
                pattern,
                flags.as_deref().unwrap_or(""),
                group.map(|g| g.to_string()).unwrap_or_default(),
                self.source
            ),
        };

        RuleIdentity {
            kind: self.method.kind(),
            priority: self.priority,
            signature,
        }
    }

    /// Fills empty attribute names along the chain
    pub(crate) fn set_attribute_name_if_empty(&mut self, name: &str) {
        if self.attribute_name.is_empty() {
            self.attribute_name = name.to_string();
        }
        if let Some(next) = self.fallback.as_deref_mut() {
            next.set_attribute_name_if_empty(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_rule_json_shape() {
        let rule = ExtractionRule::regex("color", "(Black|White)", RuleSource::Title)
            .flags("IGNORECASE")
            .priority(5);
        let value = serde_json::to_value(&rule).unwrap();

        assert_eq!(value["method"], "regex");
        assert_eq!(value["pattern"], "(Black|White)");
        assert_eq!(value["flags"], "IGNORECASE");
        assert_eq!(value["source"], "title");
        assert_eq!(value["priority"], 5);
        assert!(value.get("fallback").is_none());
        assert!(value.get("group").is_none());
    }

    #[test]
    fn test_selector_rule_json_shape() {
        let rule = ExtractionRule::selector("image", "img#main").html_attribute("src");
        let value = serde_json::to_value(&rule).unwrap();

        assert_eq!(value["method"], "selector");
        assert_eq!(value["selector"], "img#main");
        assert_eq!(value["attribute"], "src");
        assert!(value.get("label").is_none());
    }

    #[test]
    fn test_labelled_selector_rule() {
        let rule = ExtractionRule::selector("brand", "table#specs th").label("Brand");
        let value = serde_json::to_value(&rule).unwrap();
        assert_eq!(value["label"], "Brand");

        let parsed: ExtractionRule = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, rule);

        let other_label = ExtractionRule::selector("brand", "table#specs th").label("Maker");
        let unlabelled = ExtractionRule::selector("brand", "table#specs th");
        assert_ne!(rule.identity(), other_label.identity());
        assert_ne!(rule.identity(), unlabelled.identity());

        let regex = ExtractionRule::regex("brand", "X", RuleSource::Title).label("Brand");
        assert!(matches!(regex.method, RuleMethod::Regex { .. }));
    }

    #[test]
    fn test_parse_minimal_rule_document() {
        let json = r#"{"method": "regex", "pattern": "(\\d+)GB", "source": "all"}"#;
        let rule: ExtractionRule = serde_json::from_str(json).unwrap();

        assert_eq!(rule.source, RuleSource::FullText);
        assert_eq!(rule.priority, 0);
        assert!(rule.attribute_name.is_empty());
        assert!(matches!(rule.method, RuleMethod::Regex { group: None, .. }));
    }

    #[test]
    fn test_source_field_forms() {
        let plain: RuleSource = serde_json::from_str("\"price\"").unwrap();
        let tagged: RuleSource = serde_json::from_str(r#"{"field": "price"}"#).unwrap();
        assert_eq!(plain, RuleSource::Field("price".to_string()));
        assert_eq!(plain, tagged);

        let written = serde_json::to_string(&tagged).unwrap();
        assert_eq!(written, r#"{"field":"price"}"#);
    }

    #[test]
    fn test_nested_fallback_roundtrip() {
        let rule = ExtractionRule::selector("brand", "td.brand")
            .then(ExtractionRule::regex("brand", "Brand:\\s*(\\w+)", RuleSource::Description))
            .then(ExtractionRule::regex("brand", "^(\\w+)", RuleSource::Title).default_value("Unknown"));

        let json = serde_json::to_string(&rule).unwrap();
        let parsed: ExtractionRule = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, rule);
        assert_eq!(parsed.chain_depth(), 3);
        assert_eq!(
            parsed.chain().last().unwrap().default.as_deref(),
            Some("Unknown")
        );
    }

    #[test]
    fn test_identity_ignores_statistics() {
        let mut a = ExtractionRule::regex("color", "X", RuleSource::Title).priority(1);
        let mut b = a.clone();
        a.frequency = 3;
        a.confidence = 0.8;
        a.sample_keys.insert("Colour".to_string());
        b.frequency = 2;
        b.confidence = 0.5;
        b.sample_keys.insert("Color".to_string());

        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn test_identity_distinguishes_structure() {
        let base = ExtractionRule::regex("color", "X", RuleSource::Title).priority(1);
        assert_ne!(base.identity(), base.clone().priority(2).identity());
        assert_ne!(
            base.identity(),
            ExtractionRule::regex("color", "X", RuleSource::Description)
                .priority(1)
                .identity()
        );
        assert_ne!(
            base.identity(),
            ExtractionRule::selector("color", "X").priority(1).identity()
        );
    }

    #[test]
    fn test_without_fallback() {
        let rule = ExtractionRule::selector("a", "p")
            .then(ExtractionRule::selector("a", "span"));
        assert_eq!(rule.without_fallback().chain_depth(), 1);
        assert_eq!(rule.chain_depth(), 2);
    }
}
