//! Maps raw `(label, score)` classifier output onto a canonical label set.
//!
//! Each raw entry is mapped by the first rule that applies:
//! exact (substring) match, numeric suffix (`LABEL_2`, `2`), then position.

use crate::domain::labels::LabelSet;
use crate::domain::model::{unit, CanonicalDistribution, LabelMapping, MappingRule, RawScore};

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedLabels {
    pub distribution: CanonicalDistribution,
    pub mappings: Vec<LabelMapping>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LabelNormalizer;

impl LabelNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, raw: &[RawScore], labels: &LabelSet) -> CanonicalDistribution {
        self.normalize_with_trail(raw, labels).distribution
    }

    pub fn normalize_with_trail(&self, raw: &[RawScore], labels: &LabelSet) -> NormalizedLabels {
        let n = labels.len();
        let mut slots = vec![0.0f64; n];
        let mut mappings = Vec::with_capacity(raw.len());

        for (position, entry) in raw.iter().enumerate() {
            let score = unit(entry.score);
            match map_label(&entry.label, position, labels) {
                Some((slot, rule)) => {
                    // 同一標籤出現多次時取最高分
                    slots[slot] = slots[slot].max(score);
                    mappings.push(LabelMapping {
                        raw_label: entry.label.clone(),
                        canonical: Some(labels.labels()[slot]),
                        rule,
                    });
                }
                None => {
                    tracing::debug!(
                        "Raw label '{}' could not be mapped onto the {} labels",
                        entry.label,
                        labels.name
                    );
                    mappings.push(LabelMapping {
                        raw_label: entry.label.clone(),
                        canonical: None,
                        rule: MappingRule::Unmapped,
                    });
                }
            }
        }

        let evidence: Vec<usize> = (0..n).filter(|&i| slots[i] > 0.0).collect();
        match evidence.as_slice() {
            [] => {
                let best_raw = raw.iter().map(|r| unit(r.score)).fold(0.0f64, f64::max);
                if best_raw > 0.0 {
                    tracing::debug!(
                        "No mapped evidence for {} labels; splitting on best raw score {:.3}",
                        labels.name,
                        best_raw
                    );
                    slots = split_around(0, best_raw, n);
                } else {
                    tracing::debug!(
                        "No evidence for {} labels; using default split",
                        labels.name
                    );
                    slots = labels.default_split().to_vec();
                }
            }
            [only] => {
                // 只有一個標籤有分數：其餘機率由剩下的標籤平分
                slots = split_around(*only, slots[*only], n);
            }
            _ => {
                let total: f64 = slots.iter().sum();
                for slot in slots.iter_mut() {
                    *slot /= total;
                }
            }
        }

        NormalizedLabels {
            distribution: CanonicalDistribution::from_slots(labels, &slots),
            mappings,
        }
    }
}

/// `score` at `index`, the remainder shared evenly by the other slots.
fn split_around(index: usize, score: f64, n: usize) -> Vec<f64> {
    let rest = if n > 1 { (1.0 - score) / (n - 1) as f64 } else { 0.0 };
    (0..n).map(|i| if i == index { score } else { rest }).collect()
}

fn map_label(raw_label: &str, position: usize, labels: &LabelSet) -> Option<(usize, MappingRule)> {
    let lowered = raw_label.trim().to_lowercase();
    let folded = fold_separators(&lowered);

    if let Some(slot) = exact_match(&folded, labels) {
        return Some((slot, MappingRule::ExactMatch));
    }

    if let Some(slot) = numeric_suffix(&lowered).and_then(|n| labels.position_for_index(n)) {
        return Some((slot, MappingRule::NumericSuffix));
    }

    if position < labels.len() {
        return Some((position, MappingRule::Positional));
    }

    None
}

/// Lowercased label with `-` and whitespace folded to `_`, so
/// `Non Emergency` and `non-emergency` read as `non_emergency`.
fn fold_separators(label: &str) -> String {
    label
        .to_lowercase()
        .chars()
        .map(|c| if c == '-' || c.is_whitespace() { '_' } else { c })
        .collect()
}

const NEGATION_PREFIXES: [&str; 4] = ["non_", "not_", "non", "not"];

fn exact_match(folded: &str, labels: &LabelSet) -> Option<usize> {
    let canonical: Vec<String> = labels.labels().iter().map(|c| fold_separators(c)).collect();

    // 最長者優先，避免 "non_emergency" 被 "emergency" 搶先匹配
    let (slot, name) = canonical
        .iter()
        .enumerate()
        .filter(|(_, name)| folded.contains(name.as_str()))
        .max_by_key(|(i, name)| (name.len(), std::cmp::Reverse(*i)))?;

    // "not_emergency"、"nonemergency" 指向否定標籤
    let negated = NEGATION_PREFIXES
        .iter()
        .any(|prefix| folded.contains(&format!("{}{}", prefix, name)));
    if negated {
        if let Some(negated_slot) = canonical.iter().position(|c| *c == format!("non_{}", name)) {
            return Some(negated_slot);
        }
    }

    Some(slot)
}

/// `"2"`, `"label_2"`, `"class-2"` all yield 2.
fn numeric_suffix(label: &str) -> Option<usize> {
    if !label.is_empty() && label.chars().all(|c| c.is_ascii_digit()) {
        return label.parse().ok();
    }
    let (_, suffix) = label.rsplit_once(['_', '-'])?;
    if !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()) {
        suffix.parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::labels::{EMERGENCY_LABELS, URGENCY_LABELS};

    fn raw(pairs: &[(&str, f64)]) -> Vec<RawScore> {
        pairs.iter().map(|(l, s)| RawScore::new(*l, *s)).collect()
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("label missing from distribution");
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_single_index_label_rederives_complement() {
        let dist = LabelNormalizer::new().normalize(&raw(&[("LABEL_1", 0.9)]), &EMERGENCY_LABELS);
        assert_close(dist.get("emergency"), 0.9);
        assert_close(dist.get("non_emergency"), 0.1);
    }

    #[test]
    fn test_index_labels_follow_binary_convention() {
        let dist = LabelNormalizer::new().normalize(
            &raw(&[("LABEL_0", 0.8), ("LABEL_1", 0.2)]),
            &EMERGENCY_LABELS,
        );
        assert_close(dist.get("non_emergency"), 0.8);
        assert_close(dist.get("emergency"), 0.2);
    }

    #[test]
    fn test_non_emergency_is_not_mistaken_for_emergency() {
        let result = LabelNormalizer::new().normalize_with_trail(
            &raw(&[("NON_EMERGENCY", 0.75), ("EMERGENCY", 0.25)]),
            &EMERGENCY_LABELS,
        );
        assert_close(result.distribution.get("non_emergency"), 0.75);
        assert_close(result.distribution.get("emergency"), 0.25);
        assert!(result
            .mappings
            .iter()
            .all(|m| m.rule == MappingRule::ExactMatch));
    }

    #[test]
    fn test_negation_spellings_map_to_non_emergency() {
        for spelling in [
            "non-emergency",
            "Non Emergency",
            "not_emergency",
            "NOT-EMERGENCY",
            "nonemergency",
            "label: non emergency",
        ] {
            let result = LabelNormalizer::new().normalize_with_trail(
                &raw(&[(spelling, 0.9), ("emergency", 0.1)]),
                &EMERGENCY_LABELS,
            );
            assert_eq!(
                result.mappings[0].canonical,
                Some("non_emergency"),
                "{} mapped to the wrong label",
                spelling
            );
            assert_eq!(result.mappings[0].rule, MappingRule::ExactMatch);
            assert_close(result.distribution.get("non_emergency"), 0.9);
            assert_close(result.distribution.get("emergency"), 0.1);
        }
    }

    #[test]
    fn test_plain_emergency_is_not_negated() {
        let result = LabelNormalizer::new().normalize_with_trail(
            &raw(&[("Emergency Report", 0.8), ("Routine", 0.2)]),
            &EMERGENCY_LABELS,
        );
        assert_eq!(result.mappings[0].canonical, Some("emergency"));
        assert_close(result.distribution.get("emergency"), 0.8);
    }

    #[test]
    fn test_exact_match_is_case_insensitive_substring() {
        let result = LabelNormalizer::new().normalize_with_trail(
            &raw(&[("urgency_high", 0.5), ("Critical", 0.3), ("low", 0.2)]),
            &URGENCY_LABELS,
        );
        assert_close(result.distribution.get("HIGH"), 0.5);
        assert_close(result.distribution.get("CRITICAL"), 0.3);
        assert_close(result.distribution.get("LOW"), 0.2);
        assert_close(result.distribution.get("MEDIUM"), 0.0);
    }

    #[test]
    fn test_numeric_labels_map_by_index() {
        let result = LabelNormalizer::new().normalize_with_trail(
            &raw(&[("3", 0.6), ("LABEL_2", 0.3), ("class-0", 0.1)]),
            &URGENCY_LABELS,
        );
        assert_close(result.distribution.get("CRITICAL"), 0.6);
        assert_close(result.distribution.get("HIGH"), 0.3);
        assert_close(result.distribution.get("LOW"), 0.1);
        assert!(result
            .mappings
            .iter()
            .all(|m| m.rule == MappingRule::NumericSuffix));
    }

    #[test]
    fn test_arbitrary_labels_fall_back_to_position() {
        let result = LabelNormalizer::new().normalize_with_trail(
            &raw(&[("alpha", 0.1), ("beta", 0.2), ("gamma", 0.3), ("delta", 0.4)]),
            &URGENCY_LABELS,
        );
        assert_close(result.distribution.get("LOW"), 0.1);
        assert_close(result.distribution.get("CRITICAL"), 0.4);
        assert!(result
            .mappings
            .iter()
            .all(|m| m.rule == MappingRule::Positional));
    }

    #[test]
    fn test_out_of_range_suffix_falls_back_to_position() {
        let result =
            LabelNormalizer::new().normalize_with_trail(&raw(&[("LABEL_7", 0.4)]), &URGENCY_LABELS);
        assert_eq!(result.mappings[0].rule, MappingRule::Positional);
        assert_eq!(result.mappings[0].canonical, Some("LOW"));
        assert_close(result.distribution.get("LOW"), 0.4);
        assert_close(result.distribution.get("MEDIUM"), 0.2);
    }

    #[test]
    fn test_scores_are_renormalized() {
        let dist = LabelNormalizer::new()
            .normalize(&raw(&[("LABEL_1", 3.0), ("LABEL_0", 1.0)]), &EMERGENCY_LABELS);
        // scores are clamped to [0, 1] before renormalizing
        assert_close(dist.get("emergency"), 0.5);
        assert_close(dist.get("non_emergency"), 0.5);
    }

    #[test]
    fn test_unmapped_evidence_uses_two_way_split() {
        let result = LabelNormalizer::new().normalize_with_trail(
            &raw(&[("a", 0.0), ("b", 0.0), ("c", 0.8)]),
            &EMERGENCY_LABELS,
        );
        assert_eq!(result.mappings[2].rule, MappingRule::Unmapped);
        assert_close(result.distribution.get("emergency"), 0.8);
        assert_close(result.distribution.get("non_emergency"), 0.2);
    }

    #[test]
    fn test_empty_output_uses_default_split() {
        let dist = LabelNormalizer::new().normalize(&[], &EMERGENCY_LABELS);
        assert_close(dist.get("emergency"), 0.7);
        assert_close(dist.get("non_emergency"), 0.3);

        let dist = LabelNormalizer::new().normalize(&raw(&[("LOW", 0.0)]), &URGENCY_LABELS);
        assert_close(dist.get("LOW"), 0.6);
        assert_close(dist.get("CRITICAL"), 0.0);
    }

    #[test]
    fn test_nan_and_negative_scores_count_as_zero() {
        let dist = LabelNormalizer::new().normalize(
            &raw(&[("LABEL_1", f64::NAN), ("LABEL_0", -0.5)]),
            &EMERGENCY_LABELS,
        );
        assert!((dist.sum() - 1.0).abs() < 1e-9);
        assert_close(dist.get("emergency"), 0.7);
    }

    #[test]
    fn test_numeric_suffix_parsing() {
        assert_eq!(numeric_suffix("label_12"), Some(12));
        assert_eq!(numeric_suffix("7"), Some(7));
        assert_eq!(numeric_suffix("class-3"), Some(3));
        assert_eq!(numeric_suffix("label_x"), None);
        assert_eq!(numeric_suffix("label"), None);
        assert_eq!(numeric_suffix("label_"), None);
    }
}
