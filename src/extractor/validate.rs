use crate::catalog::{AttributeDefinition, Datatype};
use crate::extractor::ExtractedAttributeMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Result of checking an attribute map against a category's required schema
///
/// Validation is advisory: failures are reported here, extracted values are
/// never removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// False when at least one present value failed a check
    pub valid: bool,
    /// Fraction of required attributes present, in [0, 1]
    pub coverage: f64,
    /// Required attributes that were not extracted
    pub missing: BTreeSet<String>,
    /// One description per failed check
    pub errors: Vec<String>,
}

const BOOLEAN_LITERALS: [&str; 6] = ["true", "false", "1", "0", "yes", "no"];

/// Validates extracted attributes against a required-attribute schema
///
/// # Arguments
///
/// * `extracted` - Attribute values of one product
/// * `schema` - The category's required attributes
///
/// # Returns
///
/// A report with coverage, missing names and datatype/constraint errors. With
/// an empty schema, coverage is 1.0 if anything was extracted and 0.0 otherwise.
pub fn validate(
    extracted: &ExtractedAttributeMap,
    schema: &[AttributeDefinition],
) -> ValidationReport {
    let mut report = ValidationReport {
        valid: true,
        coverage: 0.0,
        missing: BTreeSet::new(),
        errors: Vec::new(),
    };

    if schema.is_empty() {
        report.coverage = if extracted.is_empty() { 0.0 } else { 1.0 };
        return report;
    }

    let required: BTreeSet<&str> = schema.iter().map(|attr| attr.name.as_str()).collect();
    let present = required
        .iter()
        .filter(|name| extracted.contains_key(**name))
        .count();

    report.missing = required
        .iter()
        .filter(|name| !extracted.contains_key(**name))
        .map(|name| name.to_string())
        .collect();
    report.coverage = present as f64 / required.len() as f64;

    for attr in schema {
        let Some(value) = extracted.get(&attr.name) else {
            continue;
        };

        let mut errors: Vec<String> = check_datatype(attr, value).into_iter().collect();
        errors.extend(check_constraints(attr, value));

        if !errors.is_empty() {
            report.valid = false;
            report.errors.extend(errors);
        }
    }

    report
}

fn check_datatype(attr: &AttributeDefinition, value: &str) -> Option<String> {
    let ok = match attr.datatype {
        Datatype::Number => value.trim().parse::<f64>().is_ok(),
        Datatype::Boolean => BOOLEAN_LITERALS.contains(&value.trim().to_lowercase().as_str()),
        Datatype::String | Datatype::Date | Datatype::Enum | Datatype::Other(_) => true,
    };

    if ok {
        None
    } else {
        Some(format!(
            "{}: Expected {}, got {}",
            attr.name, attr.datatype, value
        ))
    }
}

/// Checks the optional `allowed_values`, `min`, `max` and `max_length` constraints
fn check_constraints(attr: &AttributeDefinition, value: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let Value::Object(rules) = &attr.validation_rules else {
        return errors;
    };

    if let Some(Value::Array(allowed)) = rules.get("allowed_values") {
        let matches = allowed.iter().any(|candidate| match candidate {
            Value::String(s) => s.eq_ignore_ascii_case(value.trim()),
            other => other.to_string() == value.trim(),
        });
        if !matches {
            errors.push(format!("{}: '{}' is not an allowed value", attr.name, value));
        }
    }

    if let Ok(number) = value.trim().parse::<f64>() {
        if let Some(min) = rules.get("min").and_then(Value::as_f64) {
            if number < min {
                errors.push(format!("{}: {} is below minimum {}", attr.name, value, min));
            }
        }
        if let Some(max) = rules.get("max").and_then(Value::as_f64) {
            if number > max {
                errors.push(format!("{}: {} is above maximum {}", attr.name, value, max));
            }
        }
    }

    if let Some(max_length) = rules.get("max_length").and_then(Value::as_u64) {
        let length = value.chars().count() as u64;
        if length > max_length {
            errors.push(format!(
                "{}: length {} exceeds max_length {}",
                attr.name, length, max_length
            ));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(pairs: &[(&str, &str)]) -> ExtractedAttributeMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_full_coverage_string() {
        let report = validate(
            &map(&[("color", "White")]),
            &[AttributeDefinition::new("color", Datatype::String)],
        );
        assert_eq!(report.coverage, 1.0);
        assert!(report.valid);
        assert!(report.missing.is_empty());
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_partial_coverage_reports_missing() {
        let schema = vec![
            AttributeDefinition::new("color", Datatype::String),
            AttributeDefinition::new("weight", Datatype::Number),
            AttributeDefinition::new("brand", Datatype::String),
            AttributeDefinition::new("waterproof", Datatype::Boolean),
        ];
        let report = validate(&map(&[("color", "Red"), ("extra", "x")]), &schema);

        assert_eq!(report.coverage, 0.25);
        assert!(report.valid);
        let missing: Vec<&str> = report.missing.iter().map(String::as_str).collect();
        assert_eq!(missing, vec!["brand", "waterproof", "weight"]);
    }

    #[test]
    fn test_empty_schema_degenerate_case() {
        assert_eq!(validate(&map(&[("a", "b")]), &[]).coverage, 1.0);
        assert_eq!(validate(&map(&[]), &[]).coverage, 0.0);
        assert!(validate(&map(&[]), &[]).valid);
    }

    #[test]
    fn test_datatype_mismatches_keep_values() {
        let schema = vec![
            AttributeDefinition::new("weight", Datatype::Number),
            AttributeDefinition::new("waterproof", Datatype::Boolean),
        ];
        let extracted = map(&[("weight", "heavy"), ("waterproof", "maybe")]);
        let report = validate(&extracted, &schema);

        assert!(!report.valid);
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.errors[0], "weight: Expected NUMBER, got heavy");
        assert_eq!(report.coverage, 1.0);
        assert_eq!(extracted.len(), 2);
    }

    #[test]
    fn test_valid_numbers_and_booleans() {
        let schema = vec![
            AttributeDefinition::new("weight", Datatype::Number),
            AttributeDefinition::new("waterproof", Datatype::Boolean),
        ];
        for (weight, flag) in [(" 12.5 ", "YES"), ("-3", "0"), ("1e3", "False")] {
            let report = validate(&map(&[("weight", weight), ("waterproof", flag)]), &schema);
            assert!(report.valid, "{} / {} should be valid", weight, flag);
        }
    }

    #[test]
    fn test_constraints() {
        let mut size = AttributeDefinition::new("size", Datatype::Enum);
        size.validation_rules = json!({"allowed_values": ["S", "M", "L"]});
        let mut weight = AttributeDefinition::new("weight", Datatype::Number);
        weight.validation_rules = json!({"min": 0, "max": 1000});
        let mut sku = AttributeDefinition::new("sku", Datatype::String);
        sku.validation_rules = json!({"max_length": 4});

        let schema = vec![size, weight, sku];

        let ok = validate(&map(&[("size", "m"), ("weight", "250"), ("sku", "AB12")]), &schema);
        assert!(ok.valid, "{:?}", ok.errors);

        let bad = validate(
            &map(&[("size", "XL"), ("weight", "2000"), ("sku", "ABCDE")]),
            &schema,
        );
        assert!(!bad.valid);
        assert_eq!(bad.errors.len(), 3);
    }

    #[test]
    fn test_coverage_bounds() {
        let schema: Vec<AttributeDefinition> = ["a", "b", "c"]
            .iter()
            .map(|n| AttributeDefinition::new(n, Datatype::String))
            .collect();
        let names = ["a", "b", "c", "d"];

        // every subset of {a, b, c, d}
        for mask in 0u32..16 {
            let extracted: ExtractedAttributeMap = names
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, n)| (n.to_string(), "v".to_string()))
                .collect();

            let report = validate(&extracted, &schema);
            assert!((0.0..=1.0).contains(&report.coverage));
            let all_required = ["a", "b", "c"].iter().all(|n| extracted.contains_key(*n));
            assert_eq!(report.coverage == 1.0, all_required);
        }
    }
}
