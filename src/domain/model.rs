use crate::domain::labels::{DisasterType, LabelSet, SeverityLevel};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// One `(label, score)` pair as produced by an external classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawScore {
    pub label: String,
    pub score: f64,
}

impl RawScore {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

pub const STRUCTURAL_WEIGHT: f64 = 0.30;
pub const DEBRIS_WEIGHT: f64 = 0.30;
pub const SMOKE_FIRE_WEIGHT: f64 = 0.25;
pub const WATER_WEIGHT: f64 = 0.15;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DamageIndicators {
    pub structural_damage_score: f64,
    pub debris_presence: f64,
    pub smoke_fire_indicators: f64,
    pub water_damage_indicators: f64,
    pub overall_damage_score: f64,
    pub brightness: f64,
    pub contrast: f64,
    /// Set only on the fallback vector returned when analysis failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DamageIndicators {
    pub fn from_components(
        structural: f64,
        debris: f64,
        smoke_fire: f64,
        water: f64,
        brightness: f64,
        contrast: f64,
    ) -> Self {
        let structural = unit(structural);
        let debris = unit(debris);
        let smoke_fire = unit(smoke_fire);
        let water = unit(water);

        Self {
            structural_damage_score: structural,
            debris_presence: debris,
            smoke_fire_indicators: smoke_fire,
            water_damage_indicators: water,
            overall_damage_score: Self::weighted_overall(structural, debris, smoke_fire, water),
            brightness: unit(brightness),
            contrast: unit(contrast),
            error: None,
        }
    }

    pub fn weighted_overall(structural: f64, debris: f64, smoke_fire: f64, water: f64) -> f64 {
        structural * STRUCTURAL_WEIGHT
            + debris * DEBRIS_WEIGHT
            + smoke_fire * SMOKE_FIRE_WEIGHT
            + water * WATER_WEIGHT
    }

    /// Moderate-damage defaults used when an image cannot be analyzed.
    pub fn fallback(error: impl Into<String>) -> Self {
        Self {
            structural_damage_score: 0.5,
            debris_presence: 0.5,
            smoke_fire_indicators: 0.3,
            water_damage_indicators: 0.2,
            overall_damage_score: 0.4,
            brightness: 0.5,
            contrast: 0.5,
            error: Some(error.into()),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

/// Clamps into [0, 1]; NaN becomes 0.
pub(crate) fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Probabilities over a fixed, ordered label set. Every label is present.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalDistribution {
    entries: Vec<(&'static str, f64)>,
}

impl CanonicalDistribution {
    pub(crate) fn from_slots(labels: &LabelSet, slots: &[f64]) -> Self {
        let entries = labels
            .labels()
            .iter()
            .enumerate()
            .map(|(i, label)| (*label, slots.get(i).copied().map(unit).unwrap_or(0.0)))
            .collect();
        Self { entries }
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(label))
            .map(|(_, p)| *p)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.entries.iter().map(|(_, p)| p).sum()
    }

    /// Highest probability; ties go to the earlier label.
    pub fn argmax(&self) -> Option<(&'static str, f64)> {
        let mut best: Option<(&'static str, f64)> = None;
        for &(label, p) in &self.entries {
            match best {
                Some((_, best_p)) if p <= best_p => {}
                _ => best = Some((label, p)),
            }
        }
        best
    }
}

impl Serialize for CanonicalDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, p) in &self.entries {
            map.serialize_entry(label, p)?;
        }
        map.end()
    }
}

/// Which precedence rule mapped a raw label onto the canonical set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingRule {
    ExactMatch,
    NumericSuffix,
    Positional,
    Unmapped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelMapping {
    pub raw_label: String,
    pub canonical: Option<&'static str>,
    pub rule: MappingRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMethod {
    Model,
    KeywordBased,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FallbackReason {
    /// No collaborator was configured for this stage.
    Unavailable,
    /// The collaborator ran and returned an error.
    Failed { message: String },
}

impl From<&crate::utils::error::TriageError> for FallbackReason {
    fn from(err: &crate::utils::error::TriageError) -> Self {
        match err {
            crate::utils::error::TriageError::ClassifierUnavailable { .. } => {
                FallbackReason::Unavailable
            }
            other => FallbackReason::Failed {
                message: other.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmergencyVerdict {
    pub is_emergency: bool,
    pub confidence: f64,
    pub probabilities: CanonicalDistribution,
    pub method: ClassificationMethod,
    /// Which fallback produced this verdict; absent for model output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<ClassificationMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub label_mappings: Vec<LabelMapping>,
}

impl EmergencyVerdict {
    pub fn is_fallback(&self) -> bool {
        self.method == ClassificationMethod::KeywordBased
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrgencyVerdict {
    pub urgency_level: SeverityLevel,
    pub confidence: f64,
    pub probabilities: CanonicalDistribution,
    pub method: ClassificationMethod,
    /// Which fallback produced this verdict; absent for model output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<ClassificationMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub label_mappings: Vec<LabelMapping>,
}

impl UrgencyVerdict {
    pub fn is_fallback(&self) -> bool {
        self.method == ClassificationMethod::KeywordBased
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AssessmentComponents {
    pub base_severity: f64,
    pub visual_damage_bonus: f64,
    pub confidence_bonus: f64,
    pub final_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeverityVerdict {
    pub severity_level: SeverityLevel,
    pub priority_score: u8,
    pub damage_detected: bool,
    pub requires_immediate_action: bool,
    pub casualty_risk: bool,
    pub structural_damage_likely: bool,
    pub evacuation_recommended: bool,
    pub emergency_services_needed: bool,
    pub components: AssessmentComponents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageLevel {
    Severe,
    Moderate,
    Minor,
    Minimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualIndicators {
    pub structural_damage: bool,
    pub debris_detected: bool,
    pub fire_smoke_detected: bool,
    pub water_damage: bool,
    pub overall_damage_level: DamageLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionMethod {
    TrainedModel,
    UserProvided,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisasterPrediction {
    pub disaster_type: DisasterType,
    pub confidence: f64,
    pub probabilities: Vec<(DisasterType, f64)>,
    pub method: PredictionMethod,
}

/// Raw output of the disaster-type classifier collaborator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierOutput {
    /// Probability vector in `DisasterType::ALL` order; may be shorter or longer.
    Probabilities(Vec<f64>),
    /// Predict-only models report just the winning index.
    PredictedIndex(usize),
    /// Named scores, mapped like text classifier output.
    Labeled(Vec<RawScore>),
}

/// Preprocessed image input for the feature extractor: BGR, HWC, mean-subtracted.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageAssessment {
    pub damage: DamageIndicators,
    pub visual_indicators: VisualIndicators,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<DisasterPrediction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhanced_confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<SeverityVerdict>,
    pub visual_tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
}
