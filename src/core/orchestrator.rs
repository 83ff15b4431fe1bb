use crate::core::fusion::{self, SeverityFusionEngine};
use crate::core::keywords::KeywordRules;
use crate::core::normalizer::LabelNormalizer;
use crate::core::preprocess::preprocess_for_extractor;
use crate::core::recommendation::RecommendationEngine;
use crate::core::visual::VisualDamageAnalyzer;
use crate::domain::assessment::{
    AssessmentRequest, BranchConfidence, CombinedAssessment, ProcessingInfo,
};
use crate::domain::labels::{DisasterType, SeverityLevel, EMERGENCY_LABELS, URGENCY_LABELS};
use crate::domain::model::{
    ClassificationMethod, DisasterPrediction, EmergencyVerdict, FallbackReason, ImageAssessment,
    UrgencyVerdict,
};
use crate::domain::ports::{DisasterClassifier, FeatureExtractor, TextClassifier};
use crate::utils::error::{Result, TriageError};
use std::sync::Arc;
use std::time::Instant;

pub const DEFAULT_MODEL_VERSION: &str = "enhanced_complete_v1.0";
pub const DEFAULT_SERVICE_NAME: &str = "rescue-triage";

/// 沒有執行的分支回報的信心值
const ABSENT_BRANCH_CONFIDENCE: f64 = 0.5;

/// Feature extractor and disaster classifier used together by the image branch.
#[derive(Clone)]
pub struct VisionModels {
    pub extractor: Arc<dyn FeatureExtractor>,
    pub classifier: Arc<dyn DisasterClassifier>,
}

impl VisionModels {
    pub fn new(extractor: Arc<dyn FeatureExtractor>, classifier: Arc<dyn DisasterClassifier>) -> Self {
        Self {
            extractor,
            classifier,
        }
    }
}

/// Runs the text and image branches for one request and fuses them.
///
/// Collaborators are injected through the builder methods; a missing one is
/// a normal state and makes its branch take the documented fallback. The
/// orchestrator keeps no per-request state, so one instance can serve
/// concurrent requests.
#[derive(Clone)]
pub struct AssessmentOrchestrator {
    emergency_classifier: Option<Arc<dyn TextClassifier>>,
    urgency_classifier: Option<Arc<dyn TextClassifier>>,
    vision: Option<VisionModels>,
    keywords: KeywordRules,
    analyzer: VisualDamageAnalyzer,
    normalizer: LabelNormalizer,
    fusion: SeverityFusionEngine,
    recommendations: RecommendationEngine,
    service_name: String,
    model_version: String,
}

struct ImageBranch {
    assessment: ImageAssessment,
    disaster_type: Option<DisasterType>,
}

impl AssessmentOrchestrator {
    pub fn new(keywords: KeywordRules) -> Self {
        Self {
            emergency_classifier: None,
            urgency_classifier: None,
            vision: None,
            keywords,
            analyzer: VisualDamageAnalyzer::new(),
            normalizer: LabelNormalizer::new(),
            fusion: SeverityFusionEngine::new(),
            recommendations: RecommendationEngine::new(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            model_version: DEFAULT_MODEL_VERSION.to_string(),
        }
    }

    pub fn with_emergency_classifier(mut self, classifier: Arc<dyn TextClassifier>) -> Self {
        self.emergency_classifier = Some(classifier);
        self
    }

    pub fn with_urgency_classifier(mut self, classifier: Arc<dyn TextClassifier>) -> Self {
        self.urgency_classifier = Some(classifier);
        self
    }

    pub fn with_vision(mut self, vision: VisionModels) -> Self {
        self.vision = Some(vision);
        self
    }

    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }

    pub fn with_model_version(mut self, model_version: impl Into<String>) -> Self {
        self.model_version = model_version.into();
        self
    }

    /// Always returns a complete assessment; collaborator failures become
    /// tagged fallbacks inside the result.
    pub async fn assess(&self, request: &AssessmentRequest) -> CombinedAssessment {
        let started = Instant::now();
        let mut models_used = Vec::new();

        // 文字分支
        let (emergency, urgency) = match request.text_input() {
            Some(text) => {
                let emergency = self.classify_emergency(text, &mut models_used).await;
                let urgency = self.classify_urgency(text, &mut models_used).await;
                (Some(emergency), Some(urgency))
            }
            None => (None, None),
        };

        // 影像分支
        let image = match request.image_input() {
            Some(bytes) => Some(
                self.assess_image(bytes, request.disaster_type, &mut models_used)
                    .await,
            ),
            None => None,
        };

        let is_emergency = emergency.as_ref().is_some_and(|v| v.is_emergency);
        let urgency_level = urgency
            .as_ref()
            .map(|v| v.urgency_level)
            .unwrap_or(SeverityLevel::Low);
        let disaster_type = match &image {
            Some(branch) => branch.disaster_type,
            None => request.disaster_type,
        };

        // 融合：影像判定優先，否則退回文字優先等級表
        let image_verdict = image
            .as_ref()
            .and_then(|branch| branch.assessment.verdict.as_ref().map(|v| (branch, v)));

        let (priority_score, severity_level, damage_detected, requires_immediate_action, recommendations) =
            match (image_verdict, disaster_type) {
                (Some((branch, verdict)), Some(disaster_type)) => (
                    verdict.priority_score,
                    verdict.severity_level,
                    verdict.damage_detected,
                    verdict.requires_immediate_action,
                    self.recommendations
                        .recommend(disaster_type, verdict, &branch.assessment.damage),
                ),
                _ => {
                    let priority = fusion::text_priority(urgency_level, is_emergency);
                    (
                        priority,
                        urgency_level,
                        is_emergency && priority >= 5,
                        priority >= 8,
                        self.recommendations
                            .recommend_basic(is_emergency, urgency_level, disaster_type),
                    )
                }
            };

        let processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        tracing::info!(
            "✅ Assessment complete: priority {} ({}), {:.1} ms",
            priority_score,
            severity_level,
            processing_time_ms
        );

        CombinedAssessment {
            text: request.text.clone(),
            location: request.location.clone(),
            confidence: BranchConfidence {
                emergency: emergency
                    .as_ref()
                    .map(|v| v.confidence)
                    .unwrap_or(ABSENT_BRANCH_CONFIDENCE),
                urgency: urgency
                    .as_ref()
                    .map(|v| v.confidence)
                    .unwrap_or(ABSENT_BRANCH_CONFIDENCE),
            },
            emergency_analysis: emergency,
            urgency_analysis: urgency,
            image_analysis: image.map(|branch| branch.assessment),
            disaster_type,
            is_emergency,
            urgency_level,
            priority_score,
            severity_level,
            damage_detected,
            requires_immediate_action,
            recommendations,
            processing_info: ProcessingInfo {
                timestamp: chrono::Utc::now(),
                processing_time_ms,
                models_used,
                service_name: self.service_name.clone(),
                model_version: self.model_version.clone(),
            },
        }
    }

    async fn classify_emergency(&self, text: &str, models_used: &mut Vec<String>) -> EmergencyVerdict {
        let classifier = self.emergency_classifier.as_deref();
        match self.run_text_classifier(classifier, "emergency", text).await {
            Ok((name, raw)) => {
                let normalized = self.normalizer.normalize_with_trail(&raw, &EMERGENCY_LABELS);
                let p_emergency = normalized.distribution.get("emergency").unwrap_or(0.0);
                let confidence = normalized
                    .distribution
                    .argmax()
                    .map(|(_, p)| p)
                    .unwrap_or(p_emergency);
                models_used.push(name);

                EmergencyVerdict {
                    is_emergency: p_emergency > 0.5,
                    confidence,
                    probabilities: normalized.distribution,
                    method: ClassificationMethod::Model,
                    fallback: None,
                    fallback_reason: None,
                    label_mappings: normalized.mappings,
                }
            }
            Err(err) => {
                tracing::warn!("⚠️ Emergency classifier fallback to keywords: {}", err);
                self.keywords
                    .emergency_verdict(text, FallbackReason::from(&err))
            }
        }
    }

    async fn classify_urgency(&self, text: &str, models_used: &mut Vec<String>) -> UrgencyVerdict {
        let classifier = self.urgency_classifier.as_deref();
        match self.run_text_classifier(classifier, "urgency", text).await {
            Ok((name, raw)) => {
                let normalized = self.normalizer.normalize_with_trail(&raw, &URGENCY_LABELS);
                let (urgency_level, confidence) = normalized
                    .distribution
                    .argmax()
                    .and_then(|(label, p)| SeverityLevel::from_label(label).map(|l| (l, p)))
                    .unwrap_or((SeverityLevel::Low, 0.0));
                models_used.push(name);

                UrgencyVerdict {
                    urgency_level,
                    confidence,
                    probabilities: normalized.distribution,
                    method: ClassificationMethod::Model,
                    fallback: None,
                    fallback_reason: None,
                    label_mappings: normalized.mappings,
                }
            }
            Err(err) => {
                tracing::warn!("⚠️ Urgency classifier fallback to keywords: {}", err);
                self.keywords.urgency_verdict(text, FallbackReason::from(&err))
            }
        }
    }

    async fn run_text_classifier(
        &self,
        classifier: Option<&dyn TextClassifier>,
        stage: &str,
        text: &str,
    ) -> Result<(String, Vec<crate::domain::model::RawScore>)> {
        let classifier = classifier.ok_or_else(|| TriageError::ClassifierUnavailable {
            name: format!("{} classifier", stage),
        })?;

        let raw = classifier.classify(text).await?;
        if raw.is_empty() {
            return Err(TriageError::InvalidClassifierOutput {
                message: format!("{} returned no scores", classifier.name()),
            });
        }
        tracing::debug!("🔍 {} returned {} raw scores", classifier.name(), raw.len());

        Ok((classifier.name().to_string(), raw))
    }

    async fn assess_image(
        &self,
        image_bytes: &[u8],
        supplied_type: Option<DisasterType>,
        models_used: &mut Vec<String>,
    ) -> ImageBranch {
        let damage = self.analyzer.analyze(image_bytes);
        let visual_indicators = fusion::visual_indicators(&damage);

        let prediction = match supplied_type {
            Some(disaster_type) => {
                tracing::debug!("📝 Using provided disaster type: {}", disaster_type.as_str());
                Ok(DisasterPrediction::user_provided(disaster_type))
            }
            None => self.classify_disaster(image_bytes, models_used).await,
        };

        match prediction {
            Ok(prediction) => {
                let verdict = self
                    .fusion
                    .fuse(prediction.disaster_type, prediction.confidence, &damage);
                let visual_tags = fusion::visual_tags(prediction.disaster_type, &verdict);
                let enhanced_confidence = fusion::enhanced_confidence(prediction.confidence, &damage);
                let disaster_type = Some(prediction.disaster_type);

                ImageBranch {
                    assessment: ImageAssessment {
                        damage,
                        visual_indicators,
                        prediction: Some(prediction),
                        enhanced_confidence: Some(enhanced_confidence),
                        verdict: Some(verdict),
                        visual_tags,
                        fallback_reason: None,
                    },
                    disaster_type,
                }
            }
            Err(err) => {
                tracing::warn!("⚠️ Disaster classification unavailable, using text path: {}", err);
                ImageBranch {
                    assessment: ImageAssessment {
                        damage,
                        visual_indicators,
                        prediction: None,
                        enhanced_confidence: None,
                        verdict: None,
                        visual_tags: Vec::new(),
                        fallback_reason: Some(FallbackReason::from(&err)),
                    },
                    disaster_type: None,
                }
            }
        }
    }

    async fn classify_disaster(
        &self,
        image_bytes: &[u8],
        models_used: &mut Vec<String>,
    ) -> Result<DisasterPrediction> {
        let vision = self
            .vision
            .as_ref()
            .ok_or_else(|| TriageError::ClassifierUnavailable {
                name: "disaster classifier".to_string(),
            })?;

        let tensor = preprocess_for_extractor(
            image_bytes,
            vision.extractor.name(),
            vision.extractor.input_size(),
        )?;
        let features = vision.extractor.extract(&tensor).await?;
        let output = vision.classifier.classify(&features).await?;
        let prediction = DisasterPrediction::from_output(output)?;

        tracing::debug!(
            "🖼️ {} predicted {} ({:.3})",
            vision.classifier.name(),
            prediction.disaster_type.as_str(),
            prediction.confidence
        );
        models_used.push(vision.classifier.name().to_string());

        Ok(prediction)
    }
}

impl Default for AssessmentOrchestrator {
    fn default() -> Self {
        Self::new(KeywordRules::default())
    }
}
