use crate::domain::labels::{DisasterType, ImpactTier, SeverityLevel};
use crate::domain::model::{
    unit, AssessmentComponents, DamageIndicators, DamageLevel, SeverityVerdict, VisualIndicators,
};

pub const HIGH_IMPACT_BASE: f64 = 7.0;
pub const MEDIUM_IMPACT_BASE: f64 = 5.0;
pub const LOW_IMPACT_BASE: f64 = 3.0;
pub const VISUAL_BONUS_SCALE: f64 = 4.0;
pub const MAX_PRIORITY: f64 = 10.0;

// 視覺指標旗標門檻，建議清單也使用同一組數值
pub const STRUCTURAL_FLAG_THRESHOLD: f64 = 0.4;
pub const DEBRIS_FLAG_THRESHOLD: f64 = 0.5;
pub const FIRE_SMOKE_FLAG_THRESHOLD: f64 = 0.3;
pub const WATER_FLAG_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, Copy, Default)]
pub struct SeverityFusionEngine;

impl SeverityFusionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Deterministic: identical inputs always give an identical verdict.
    pub fn fuse(
        &self,
        disaster_type: DisasterType,
        model_confidence: f64,
        damage: &DamageIndicators,
    ) -> SeverityVerdict {
        let confidence = unit(model_confidence);
        let overall = unit(damage.overall_damage_score);
        let structural = unit(damage.structural_damage_score);
        let debris = unit(damage.debris_presence);

        let base = base_severity(disaster_type);
        let visual_bonus = overall * VISUAL_BONUS_SCALE;
        let confidence_bonus = if confidence > 0.5 {
            (confidence - 0.5) * 2.0
        } else {
            0.0
        };
        let score = (base + visual_bonus + confidence_bonus).min(MAX_PRIORITY);

        let damage_detected =
            overall > 0.25 || structural > 0.30 || debris > 0.40 || score >= 5.0;
        let high_impact = disaster_type.impact_tier() == ImpactTier::High;

        SeverityVerdict {
            severity_level: level_for_score(score),
            priority_score: (score.trunc() as u8).clamp(1, 10),
            damage_detected,
            requires_immediate_action: score >= 7.0,
            casualty_risk: score >= 6.0 && high_impact,
            structural_damage_likely: structural > STRUCTURAL_FLAG_THRESHOLD,
            evacuation_recommended: score >= 8.0,
            emergency_services_needed: score >= 7.0,
            components: AssessmentComponents {
                base_severity: base,
                visual_damage_bonus: visual_bonus,
                confidence_bonus,
                final_score: score,
            },
        }
    }
}

pub fn base_severity(disaster_type: DisasterType) -> f64 {
    match disaster_type.impact_tier() {
        ImpactTier::High => HIGH_IMPACT_BASE,
        ImpactTier::Medium => MEDIUM_IMPACT_BASE,
        ImpactTier::Low => LOW_IMPACT_BASE,
    }
}

pub fn level_for_score(score: f64) -> SeverityLevel {
    if score >= 8.0 {
        SeverityLevel::Critical
    } else if score >= 6.0 {
        SeverityLevel::High
    } else if score >= 4.0 {
        SeverityLevel::Medium
    } else {
        SeverityLevel::Low
    }
}

/// Text-only priority: urgency table, +2 for a flagged emergency, capped at 10.
pub fn text_priority(urgency: SeverityLevel, is_emergency: bool) -> u8 {
    let base: u8 = match urgency {
        SeverityLevel::Low => 2,
        SeverityLevel::Medium => 5,
        SeverityLevel::High => 8,
        SeverityLevel::Critical => 10,
    };
    if is_emergency {
        (base + 2).min(10)
    } else {
        base
    }
}

pub fn damage_level(overall_damage_score: f64) -> DamageLevel {
    if overall_damage_score >= 0.7 {
        DamageLevel::Severe
    } else if overall_damage_score >= 0.5 {
        DamageLevel::Moderate
    } else if overall_damage_score >= 0.3 {
        DamageLevel::Minor
    } else {
        DamageLevel::Minimal
    }
}

pub fn visual_indicators(damage: &DamageIndicators) -> VisualIndicators {
    VisualIndicators {
        structural_damage: damage.structural_damage_score > STRUCTURAL_FLAG_THRESHOLD,
        debris_detected: damage.debris_presence > DEBRIS_FLAG_THRESHOLD,
        fire_smoke_detected: damage.smoke_fire_indicators > FIRE_SMOKE_FLAG_THRESHOLD,
        water_damage: damage.water_damage_indicators > WATER_FLAG_THRESHOLD,
        overall_damage_level: damage_level(damage.overall_damage_score),
    }
}

pub fn enhanced_confidence(model_confidence: f64, damage: &DamageIndicators) -> f64 {
    (unit(model_confidence) + unit(damage.overall_damage_score) * 0.2).min(1.0)
}

pub fn visual_tags(disaster_type: DisasterType, verdict: &SeverityVerdict) -> Vec<String> {
    vec![
        disaster_type.as_str().replace('_', " "),
        verdict.severity_level.as_str().to_lowercase(),
        if verdict.damage_detected {
            "damage_detected".to_string()
        } else {
            "no_damage".to_string()
        },
    ]
}
