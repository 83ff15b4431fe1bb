//! Ordered, size-capped action lists. Order is fixed by precedence tier,
//! so truncation always drops the least safety-critical entries.

use crate::core::fusion::{
    DEBRIS_FLAG_THRESHOLD, FIRE_SMOKE_FLAG_THRESHOLD, STRUCTURAL_FLAG_THRESHOLD,
    WATER_FLAG_THRESHOLD,
};
use crate::domain::labels::{DisasterType, SeverityLevel};
use crate::domain::model::{DamageIndicators, SeverityVerdict};

pub const MAX_RECOMMENDATIONS: usize = 8;

const EMERGENCY_NUMBERS: &str =
    "📞 Call emergency services: 119 (Police), 110 (Fire), 1990 (Ambulance)";
// 純文字版本的措辭不同
const BASIC_EMERGENCY_NUMBERS: &str =
    "📞 Contact emergency services: 119 (Police), 110 (Fire), 1990 (Ambulance)";

#[derive(Debug, Clone, Copy, Default)]
pub struct RecommendationEngine;

impl RecommendationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Recommendations for an image-backed verdict.
    pub fn recommend(
        &self,
        disaster_type: DisasterType,
        verdict: &SeverityVerdict,
        damage: &DamageIndicators,
    ) -> Vec<String> {
        let mut recommendations: Vec<&str> = Vec::new();

        // 1. 整體優先等級
        if verdict.priority_score >= 8 {
            recommendations.extend([
                "🚨 CRITICAL SITUATION - IMMEDIATE ACTION REQUIRED",
                EMERGENCY_NUMBERS,
            ]);
        } else if verdict.priority_score >= 6 {
            recommendations.extend([
                "⚡ HIGH PRIORITY - Deploy emergency response teams",
                "📞 Contact local disaster management authorities",
            ]);
        }

        // 2. 各項視覺指標
        if damage.structural_damage_score > STRUCTURAL_FLAG_THRESHOLD {
            recommendations.extend([
                "🏗️ STRUCTURAL DAMAGE DETECTED - Do not enter buildings",
                "👷 Deploy structural engineers for safety assessment",
            ]);
        }
        if damage.smoke_fire_indicators > FIRE_SMOKE_FLAG_THRESHOLD {
            recommendations.extend([
                "🔥 FIRE/SMOKE DETECTED - Deploy fire suppression teams",
                "💨 Evacuate downwind areas immediately",
            ]);
        }
        if damage.water_damage_indicators > WATER_FLAG_THRESHOLD {
            recommendations.extend([
                "💧 WATER DAMAGE DETECTED - Monitor water levels",
                "⬆️ Move to higher ground if water rising",
            ]);
        }
        if damage.debris_presence > DEBRIS_FLAG_THRESHOLD {
            recommendations.extend([
                "🪨 DEBRIS DETECTED - Deploy search and rescue teams",
                "🚧 Clear access routes for emergency vehicles",
            ]);
        }

        // 3. 災害類型建議
        recommendations.extend_from_slice(image_advisories(disaster_type));

        cap(recommendations)
    }

    /// Recommendations when only text evidence is available.
    pub fn recommend_basic(
        &self,
        is_emergency: bool,
        urgency: SeverityLevel,
        disaster_type: Option<DisasterType>,
    ) -> Vec<String> {
        let mut recommendations: Vec<&str> = Vec::new();

        if is_emergency && urgency == SeverityLevel::Critical {
            recommendations.extend([
                "🚨 IMMEDIATE ACTION REQUIRED",
                BASIC_EMERGENCY_NUMBERS,
                "🛡️ Ensure personal safety first",
                "📍 Share exact location with emergency responders",
            ]);
        } else if is_emergency && urgency == SeverityLevel::High {
            recommendations.extend([
                "⚡ URGENT response needed",
                "📞 Contact local authorities",
                "🚪 Prepare for possible evacuation",
            ]);
        } else if is_emergency {
            recommendations.extend([
                "📞 Report to relevant authorities",
                "👀 Monitor situation closely",
                "📋 Document damage and needs",
            ]);
        }

        if let Some(disaster_type) = disaster_type {
            recommendations.extend_from_slice(basic_advisories(disaster_type));
        }

        cap(recommendations)
    }
}

fn cap(recommendations: Vec<&str>) -> Vec<String> {
    recommendations
        .into_iter()
        .take(MAX_RECOMMENDATIONS)
        .map(str::to_string)
        .collect()
}

fn image_advisories(disaster_type: DisasterType) -> &'static [&'static str] {
    match disaster_type {
        DisasterType::Earthquake => &["⚠️ Monitor for aftershocks", "🏥 Establish medical triage area"],
        DisasterType::Flood => &[
            "📊 Monitor water levels continuously",
            "🚤 Prepare water rescue equipment",
        ],
        DisasterType::Fire => &[
            "💧 Secure water supply for firefighting",
            "🌪️ Monitor wind direction",
        ],
        DisasterType::Landslide => &[
            "⛰️ Monitor slope stability",
            "🚧 Block access to unstable areas",
        ],
        DisasterType::Tsunami => &[
            "🌊 Monitor wave warnings",
            "⬆️ Ensure evacuation to higher ground",
        ],
        _ => &[],
    }
}

fn basic_advisories(disaster_type: DisasterType) -> &'static [&'static str] {
    match disaster_type {
        DisasterType::Flood => &[
            "💧 Move to higher ground",
            "⚠️ Avoid flood waters",
            "📻 Monitor weather updates",
        ],
        DisasterType::Fire => &[
            "🔥 Evacuate immediately if threatened",
            "💨 Stay low to avoid smoke",
            "🚪 Don't use elevators",
        ],
        DisasterType::Earthquake => &[
            "🏠 Take cover under sturdy furniture",
            "🚪 Stay away from windows",
            "⚠️ Expect aftershocks",
        ],
        DisasterType::Landslide => &[
            "⛰️ Move away from slide area",
            "🚧 Avoid unstable slopes",
            "👂 Listen for unusual sounds",
        ],
        DisasterType::Tsunami => &[
            "⬆️ Move to higher ground immediately",
            "🌊 Stay away from coast",
            "📻 Monitor emergency broadcasts",
        ],
        _ => &[],
    }
}
