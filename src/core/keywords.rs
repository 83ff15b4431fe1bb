use crate::domain::labels::{SeverityLevel, EMERGENCY_LABELS, URGENCY_LABELS};
use crate::domain::model::{
    CanonicalDistribution, ClassificationMethod, EmergencyVerdict, FallbackReason, UrgencyVerdict,
};
use serde::{Deserialize, Serialize};

const KEYWORD_EMERGENCY_CONFIDENCE: f64 = 0.6;

/// Word lists for the keyword heuristic used when a text classifier is
/// missing or fails. Matching is case-insensitive substring matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordRules {
    pub emergency: Vec<String>,
    pub critical: Vec<String>,
    pub high: Vec<String>,
    pub medium: Vec<String>,
}

impl Default for KeywordRules {
    fn default() -> Self {
        fn words(list: &[&str]) -> Vec<String> {
            list.iter().map(|w| w.to_string()).collect()
        }

        Self {
            emergency: words(&[
                "emergency",
                "urgent",
                "help",
                "rescue",
                "trapped",
                "fire",
                "collapsed",
            ]),
            critical: words(&["critical", "immediate", "life threatening"]),
            high: words(&["urgent", "emergency", "help", "rescue"]),
            medium: words(&["need", "assistance", "damaged"]),
        }
    }
}

impl KeywordRules {
    fn matches(words: &[String], lowered: &str) -> bool {
        words
            .iter()
            .any(|w| lowered.contains(w.to_lowercase().as_str()))
    }

    pub fn emergency_verdict(&self, text: &str, reason: FallbackReason) -> EmergencyVerdict {
        let lowered = text.to_lowercase();
        let is_emergency = Self::matches(&self.emergency, &lowered);
        let slots = if is_emergency { [0.7, 0.3] } else { [0.3, 0.7] };

        EmergencyVerdict {
            is_emergency,
            confidence: KEYWORD_EMERGENCY_CONFIDENCE,
            probabilities: CanonicalDistribution::from_slots(&EMERGENCY_LABELS, &slots),
            method: ClassificationMethod::KeywordBased,
            fallback: Some(ClassificationMethod::KeywordBased),
            fallback_reason: Some(reason),
            label_mappings: Vec::new(),
        }
    }

    pub fn urgency_verdict(&self, text: &str, reason: FallbackReason) -> UrgencyVerdict {
        let lowered = text.to_lowercase();
        // 依序檢查：critical > high > medium > low
        let (level, slots) = if Self::matches(&self.critical, &lowered) {
            (SeverityLevel::Critical, [0.1, 0.1, 0.2, 0.6])
        } else if Self::matches(&self.high, &lowered) {
            (SeverityLevel::High, [0.1, 0.2, 0.6, 0.1])
        } else if Self::matches(&self.medium, &lowered) {
            (SeverityLevel::Medium, [0.2, 0.6, 0.2, 0.0])
        } else {
            (SeverityLevel::Low, [0.6, 0.3, 0.1, 0.0])
        };
        let probabilities = CanonicalDistribution::from_slots(&URGENCY_LABELS, &slots);

        UrgencyVerdict {
            urgency_level: level,
            confidence: probabilities.get(level.as_str()).unwrap_or(0.0),
            probabilities,
            method: ClassificationMethod::KeywordBased,
            fallback: Some(ClassificationMethod::KeywordBased),
            fallback_reason: Some(reason),
            label_mappings: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emergency_keywords() {
        let rules = KeywordRules::default();
        let verdict = rules.emergency_verdict("People TRAPPED under rubble", FallbackReason::Unavailable);
        assert!(verdict.is_emergency);
        assert_eq!(verdict.confidence, 0.6);
        assert_eq!(verdict.probabilities.get("emergency"), Some(0.7));
        assert_eq!(verdict.method, ClassificationMethod::KeywordBased);
        assert_eq!(verdict.fallback, Some(ClassificationMethod::KeywordBased));
        assert!(verdict.is_fallback());

        let verdict = rules.emergency_verdict("Road repaving next week", FallbackReason::Unavailable);
        assert!(!verdict.is_emergency);
        assert_eq!(verdict.probabilities.get("non_emergency"), Some(0.7));
    }

    #[test]
    fn test_urgency_tiers_in_order() {
        let rules = KeywordRules::default();
        let reason = || FallbackReason::Failed {
            message: "timeout".to_string(),
        };

        let critical = rules.urgency_verdict("Life threatening, urgent help", reason());
        assert_eq!(critical.urgency_level, SeverityLevel::Critical);
        assert_eq!(critical.confidence, 0.6);

        let high = rules.urgency_verdict("Please rescue us", reason());
        assert_eq!(high.urgency_level, SeverityLevel::High);

        let medium = rules.urgency_verdict("Roof damaged by wind", reason());
        assert_eq!(medium.urgency_level, SeverityLevel::Medium);
        assert_eq!(medium.probabilities.get("CRITICAL"), Some(0.0));

        let low = rules.urgency_verdict("All quiet today", reason());
        assert_eq!(low.urgency_level, SeverityLevel::Low);
        assert_eq!(low.confidence, 0.6);
        assert!(matches!(low.fallback_reason, Some(FallbackReason::Failed { .. })));
    }

    #[test]
    fn test_custom_word_lists() {
        let rules = KeywordRules {
            emergency: vec!["Landslide".to_string()],
            ..KeywordRules::default()
        };
        assert!(rules
            .emergency_verdict("landslide near the school", FallbackReason::Unavailable)
            .is_emergency);
        assert!(!rules
            .emergency_verdict("fire drill", FallbackReason::Unavailable)
            .is_emergency);
    }
}
