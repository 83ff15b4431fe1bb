use crate::domain::labels::{DisasterType, SeverityLevel};
use crate::domain::model::{EmergencyVerdict, ImageAssessment, UrgencyVerdict};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Default)]
pub struct AssessmentRequest {
    pub text: Option<String>,
    pub image: Option<Vec<u8>>,
    /// When set, image classification is skipped.
    pub disaster_type: Option<DisasterType>,
    pub location: Option<String>,
}

impl AssessmentRequest {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn with_image(mut self, image: Vec<u8>) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_disaster_type(mut self, disaster_type: DisasterType) -> Self {
        self.disaster_type = Some(disaster_type);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Blank text counts as no text.
    pub fn text_input(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn image_input(&self) -> Option<&[u8]> {
        self.image.as_deref().filter(|bytes| !bytes.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BranchConfidence {
    pub emergency: f64,
    pub urgency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingInfo {
    pub timestamp: DateTime<Utc>,
    pub processing_time_ms: f64,
    pub models_used: Vec<String>,
    pub service_name: String,
    pub model_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedAssessment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_analysis: Option<EmergencyVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency_analysis: Option<UrgencyVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_analysis: Option<ImageAssessment>,
    /// `None` when no type was supplied and the image could not be classified.
    pub disaster_type: Option<DisasterType>,
    pub is_emergency: bool,
    pub urgency_level: SeverityLevel,
    pub priority_score: u8,
    pub severity_level: SeverityLevel,
    pub damage_detected: bool,
    pub requires_immediate_action: bool,
    pub confidence: BranchConfidence,
    pub recommendations: Vec<String>,
    pub processing_info: ProcessingInfo,
}

impl CombinedAssessment {
    /// True when any branch ran on a fallback instead of model output.
    pub fn used_fallback(&self) -> bool {
        self.emergency_analysis
            .as_ref()
            .is_some_and(|v| v.is_fallback())
            || self
                .urgency_analysis
                .as_ref()
                .is_some_and(|v| v.is_fallback())
            || self
                .image_analysis
                .as_ref()
                .is_some_and(|i| i.fallback_reason.is_some() || i.damage.is_fallback())
    }

    pub fn disaster_type_label(&self) -> &'static str {
        self.disaster_type.map(|t| t.as_str()).unwrap_or("unknown")
    }
}
