use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Four-level scale shared by urgency classification and fused severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SeverityLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl SeverityLevel {
    pub const ALL: [SeverityLevel; 4] = [
        SeverityLevel::Low,
        SeverityLevel::Medium,
        SeverityLevel::High,
        SeverityLevel::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityLevel::Low => "LOW",
            SeverityLevel::Medium => "MEDIUM",
            SeverityLevel::High => "HIGH",
            SeverityLevel::Critical => "CRITICAL",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpactTier {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisasterType {
    Earthquake,
    Flood,
    Fire,
    Landslide,
    Cyclone,
    Tsunami,
    BuildingCollapse,
    Explosion,
    Tornado,
    Other,
}

impl DisasterType {
    /// Classifier output order.
    pub const ALL: [DisasterType; 10] = [
        DisasterType::Earthquake,
        DisasterType::Flood,
        DisasterType::Fire,
        DisasterType::Landslide,
        DisasterType::Cyclone,
        DisasterType::Tsunami,
        DisasterType::BuildingCollapse,
        DisasterType::Explosion,
        DisasterType::Tornado,
        DisasterType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DisasterType::Earthquake => "earthquake",
            DisasterType::Flood => "flood",
            DisasterType::Fire => "fire",
            DisasterType::Landslide => "landslide",
            DisasterType::Cyclone => "cyclone",
            DisasterType::Tsunami => "tsunami",
            DisasterType::BuildingCollapse => "building_collapse",
            DisasterType::Explosion => "explosion",
            DisasterType::Tornado => "tornado",
            DisasterType::Other => "other",
        }
    }

    pub fn impact_tier(&self) -> ImpactTier {
        match self {
            DisasterType::Earthquake
            | DisasterType::Tsunami
            | DisasterType::BuildingCollapse
            | DisasterType::Explosion
            | DisasterType::Fire => ImpactTier::High,
            DisasterType::Flood
            | DisasterType::Landslide
            | DisasterType::Cyclone
            | DisasterType::Tornado => ImpactTier::Medium,
            DisasterType::Other => ImpactTier::Low,
        }
    }

    /// 使用者輸入的災害類型：無法辨識時歸為 `Other`
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or_else(|_| {
            tracing::warn!("⚠️ Unknown disaster type '{}', treating as 'other'", value);
            DisasterType::Other
        })
    }
}

impl fmt::Display for DisasterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisasterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| format!("unknown disaster type: {}", s))
    }
}

/// A fixed, ordered set of canonical labels plus the conventions needed to
/// map raw classifier output onto it.
#[derive(Debug, Clone, Copy)]
pub struct LabelSet {
    pub name: &'static str,
    labels: &'static [&'static str],
    /// `index_order[n]` is the canonical position of the model's output index `n`.
    index_order: &'static [usize],
    /// Used when the raw output carries no evidence at all. Sums to 1.0.
    default_split: &'static [f64],
}

impl LabelSet {
    pub fn labels(&self) -> &'static [&'static str] {
        self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn position_for_index(&self, index: usize) -> Option<usize> {
        self.index_order.get(index).copied()
    }

    pub fn default_split(&self) -> &'static [f64] {
        self.default_split
    }
}

// 二元分類器的輸出索引慣例：LABEL_0 = non_emergency，LABEL_1 = emergency
pub const EMERGENCY_LABELS: LabelSet = LabelSet {
    name: "emergency",
    labels: &["emergency", "non_emergency"],
    index_order: &[1, 0],
    default_split: &[0.7, 0.3],
};

pub const URGENCY_LABELS: LabelSet = LabelSet {
    name: "urgency",
    labels: &["LOW", "MEDIUM", "HIGH", "CRITICAL"],
    index_order: &[0, 1, 2, 3],
    default_split: &[0.6, 0.3, 0.1, 0.0],
};

pub const DISASTER_LABELS: LabelSet = LabelSet {
    name: "disaster",
    labels: &[
        "earthquake",
        "flood",
        "fire",
        "landslide",
        "cyclone",
        "tsunami",
        "building_collapse",
        "explosion",
        "tornado",
        "other",
    ],
    index_order: &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
    default_split: &[0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1],
};
