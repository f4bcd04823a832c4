use crate::rules::ExtractionRule;

/// Merges the statistics of `other` into `rule`
///
/// Both rules must share an identity. Frequencies add up, confidence becomes
/// the frequency-weighted average (the plain average when both frequencies
/// are zero) and sample keys are united. Everything else keeps the values of
/// `rule`.
pub fn merge_rules(rule: &mut ExtractionRule, other: &ExtractionRule) {
    let (f1, f2) = (rule.frequency, other.frequency);
    let (c1, c2) = (rule.confidence, other.confidence);
    let total = f1 + f2;

    rule.confidence = if total > 0 {
        (c1 * f1 as f64 + c2 * f2 as f64) / total as f64
    } else if c1 + c2 > 0.0 {
        (c1 + c2) / 2.0
    } else {
        0.0
    };
    rule.frequency = total;
    rule.sample_keys.extend(other.sample_keys.iter().cloned());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleSource;

    fn stats(frequency: u32, confidence: f64, keys: &[&str]) -> ExtractionRule {
        let mut rule = ExtractionRule::selector("brand", "table#specs td").priority(1);
        rule.frequency = frequency;
        rule.confidence = confidence;
        rule.sample_keys = keys.iter().map(|k| k.to_string()).collect();
        rule
    }

    #[test]
    fn test_weighted_confidence() {
        let mut rule = stats(3, 0.8, &["Brand"]);
        merge_rules(&mut rule, &stats(2, 0.5, &["Brand Name"]));

        assert_eq!(rule.frequency, 5);
        assert!((rule.confidence - 0.68).abs() < 1e-9);
        let keys: Vec<&str> = rule.sample_keys.iter().map(String::as_str).collect();
        assert_eq!(keys, vec!["Brand", "Brand Name"]);
    }

    #[test]
    fn test_zero_frequencies() {
        let mut rule = stats(0, 0.6, &[]);
        merge_rules(&mut rule, &stats(0, 0.2, &[]));
        assert_eq!(rule.frequency, 0);
        assert!((rule.confidence - 0.4).abs() < 1e-9);

        let mut zero = stats(0, 0.0, &[]);
        merge_rules(&mut zero, &stats(0, 0.0, &[]));
        assert_eq!(zero.confidence, 0.0);
    }

    #[test]
    fn test_merge_is_associative() {
        let a = stats(3, 0.8, &["A"]);
        let b = stats(2, 0.5, &["B"]);
        let c = stats(4, 0.25, &["A", "C"]);

        let mut left = a.clone();
        merge_rules(&mut left, &b);
        merge_rules(&mut left, &c);

        let mut right_tail = b.clone();
        merge_rules(&mut right_tail, &c);
        let mut right = a.clone();
        merge_rules(&mut right, &right_tail);

        assert_eq!(left.frequency, right.frequency);
        assert!((left.confidence - right.confidence).abs() < 1e-9);
        assert_eq!(left.sample_keys, right.sample_keys);
    }

    #[test]
    fn test_identity_fields_untouched() {
        let mut rule = ExtractionRule::regex("color", "(Red)", RuleSource::Title).priority(5);
        let mut other = rule.clone();
        other.frequency = 4;
        other.confidence = 1.0;
        merge_rules(&mut rule, &other);

        assert_eq!(rule.identity(), other.identity());
        assert_eq!(rule.frequency, 4);
        assert_eq!(rule.confidence, 1.0);
    }
}
