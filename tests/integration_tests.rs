use anyhow::Result;
use image::{ImageFormat, Rgb, RgbImage};
use rescue_triage::adapters::{
    ChannelMeanExtractor, PrecomputedDisasterClassifier, PrecomputedTextClassifier,
};
use rescue_triage::domain::model::{
    ClassificationMethod, ClassifierOutput, FallbackReason, PredictionMethod, RawScore,
};
use rescue_triage::utils::error::TriageError;
use rescue_triage::{
    AssessmentOrchestrator, AssessmentRequest, DisasterType, SeverityLevel, TriageConfig,
    VisionModels,
};
use std::io::Cursor;
use std::sync::Arc;
use tempfile::TempDir;

fn solid_png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    RgbImage::from_pixel(width, height, Rgb(color))
        .write_to(&mut buffer, ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

fn fire_probabilities(p_fire: f64) -> Vec<f64> {
    let rest = (1.0 - p_fire) / 9.0;
    DisasterType::ALL
        .iter()
        .map(|t| if *t == DisasterType::Fire { p_fire } else { rest })
        .collect()
}

#[tokio::test]
async fn test_end_to_end_with_precomputed_collaborators() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let emergency_path = temp_dir.path().join("emergency.json");
    let urgency_path = temp_dir.path().join("urgency.json");
    let disaster_path = temp_dir.path().join("disaster.json");

    std::fs::write(
        &emergency_path,
        r#"[{"label": "LABEL_0", "score": 0.15}, {"label": "LABEL_1", "score": 0.85}]"#,
    )?;
    std::fs::write(
        &urgency_path,
        r#"[{"label": "LOW", "score": 0.05}, {"label": "MEDIUM", "score": 0.15},
            {"label": "HIGH", "score": 0.7}, {"label": "CRITICAL", "score": 0.1}]"#,
    )?;
    std::fs::write(
        &disaster_path,
        serde_json::to_string(&serde_json::json!({ "probabilities": fire_probabilities(0.8) }))?,
    )?;

    let orchestrator = AssessmentOrchestrator::default()
        .with_emergency_classifier(Arc::new(PrecomputedTextClassifier::from_json_file(
            "emergency-bert",
            &emergency_path,
        )?))
        .with_urgency_classifier(Arc::new(PrecomputedTextClassifier::from_json_file(
            "urgency-bert",
            &urgency_path,
        )?))
        .with_vision(VisionModels::new(
            Arc::new(ChannelMeanExtractor::default()),
            Arc::new(PrecomputedDisasterClassifier::from_json_file(
                "vgg16-disaster",
                &disaster_path,
            )?),
        ))
        .with_model_version("test-v1");

    // 純橘色畫面：只有火焰指標
    let request = AssessmentRequest::from_text("Smoke everywhere near the market")
        .with_image(solid_png(32, 32, [255, 80, 0]))
        .with_location("Taichung");
    let result = orchestrator.assess(&request).await;

    let emergency = result.emergency_analysis.as_ref().unwrap();
    assert_eq!(emergency.method, ClassificationMethod::Model);
    assert!(emergency.fallback.is_none());
    assert!(emergency.is_emergency);
    assert_eq!(result.urgency_level, SeverityLevel::High);

    let image = result.image_analysis.as_ref().unwrap();
    assert_eq!(image.damage.smoke_fire_indicators, 1.0);
    assert_eq!(image.damage.structural_damage_score, 0.0);
    assert!((image.damage.overall_damage_score - 0.25).abs() < 1e-9);
    assert!(image.visual_indicators.fire_smoke_detected);
    let prediction = image.prediction.as_ref().unwrap();
    assert_eq!(prediction.method, PredictionMethod::TrainedModel);
    assert!((image.enhanced_confidence.unwrap() - 0.85).abs() < 1e-9);

    // 7 + 0.25*4 + (0.8-0.5)*2 = 8.6
    assert_eq!(result.disaster_type, Some(DisasterType::Fire));
    assert_eq!(result.priority_score, 8);
    assert_eq!(result.severity_level, SeverityLevel::Critical);
    assert!(result.requires_immediate_action);
    assert_eq!(
        result.recommendations,
        vec![
            "🚨 CRITICAL SITUATION - IMMEDIATE ACTION REQUIRED",
            "📞 Call emergency services: 119 (Police), 110 (Fire), 1990 (Ambulance)",
            "🔥 FIRE/SMOKE DETECTED - Deploy fire suppression teams",
            "💨 Evacuate downwind areas immediately",
            "💧 Secure water supply for firefighting",
            "🌪️ Monitor wind direction",
        ]
    );

    assert!(!result.used_fallback());
    assert_eq!(result.processing_info.model_version, "test-v1");
    assert_eq!(
        result.processing_info.models_used,
        vec!["emergency-bert", "urgency-bert", "vgg16-disaster"]
    );
    assert_eq!(result.location.as_deref(), Some("Taichung"));

    Ok(())
}

#[tokio::test]
async fn test_json_output_shape() -> Result<()> {
    let orchestrator = AssessmentOrchestrator::default();
    let request = AssessmentRequest::from_text("Flood water rising, need help")
        .with_disaster_type(DisasterType::Flood);
    let result = orchestrator.assess(&request).await;

    let json = serde_json::to_value(&result)?;
    assert_eq!(json["disaster_type"], "flood");
    assert_eq!(json["urgency_level"], "HIGH");
    assert_eq!(json["emergency_analysis"]["method"], "keyword_based");
    assert_eq!(json["emergency_analysis"]["fallback"], "keyword_based");
    assert_eq!(json["urgency_analysis"]["fallback"], "keyword_based");
    assert_eq!(json["processing_info"]["service_name"], "rescue-triage");
    assert_eq!(json["emergency_analysis"]["fallback_reason"]["kind"], "unavailable");
    assert_eq!(json["urgency_analysis"]["probabilities"]["HIGH"], 0.6);
    assert!(json.get("image_analysis").is_none());
    assert!(json["processing_info"]["timestamp"].is_string());
    // 文字路徑加上洪水建議
    let recommendations = json["recommendations"].as_array().unwrap();
    assert_eq!(recommendations[0], "⚡ URGENT response needed");
    assert_eq!(recommendations[3], "💧 Move to higher ground");

    Ok(())
}

#[tokio::test]
async fn test_water_scene_with_user_type() {
    let orchestrator = AssessmentOrchestrator::default();
    let request = AssessmentRequest::default()
        .with_image(solid_png(24, 24, [0, 0, 255]))
        .with_disaster_type(DisasterType::Flood);
    let result = orchestrator.assess(&request).await;

    let image = result.image_analysis.as_ref().unwrap();
    assert_eq!(image.damage.water_damage_indicators, 1.0);
    assert!(image.visual_indicators.water_damage);
    assert_eq!(
        image.prediction.as_ref().unwrap().method,
        PredictionMethod::UserProvided
    );
    // 5 + 0.15*4 + (0.9-0.5)*2 = 6.4
    assert_eq!(result.priority_score, 6);
    assert_eq!(result.severity_level, SeverityLevel::High);
    assert!(!result.is_emergency);
    assert_eq!(image.visual_tags, vec!["flood", "high", "damage_detected"]);
}

#[tokio::test]
async fn test_predict_only_classifier() {
    let orchestrator = AssessmentOrchestrator::default().with_vision(VisionModels::new(
        Arc::new(ChannelMeanExtractor::new((16, 16))),
        Arc::new(PrecomputedDisasterClassifier::new(
            "predict-only",
            ClassifierOutput::PredictedIndex(5),
        )),
    ));
    let request = AssessmentRequest::default().with_image(solid_png(8, 8, [128, 128, 128]));
    let result = orchestrator.assess(&request).await;

    assert_eq!(result.disaster_type, Some(DisasterType::Tsunami));
    let prediction = result
        .image_analysis
        .as_ref()
        .and_then(|i| i.prediction.as_ref())
        .unwrap();
    assert!((prediction.confidence - 0.85).abs() < 1e-12);
}

#[tokio::test]
async fn test_invalid_classifier_output_degrades_to_text_path() {
    let orchestrator = AssessmentOrchestrator::default().with_vision(VisionModels::new(
        Arc::new(ChannelMeanExtractor::default()),
        Arc::new(PrecomputedDisasterClassifier::new(
            "empty",
            ClassifierOutput::Probabilities(Vec::new()),
        )),
    ));
    let request = AssessmentRequest::from_text("Everything is fine")
        .with_image(solid_png(8, 8, [10, 200, 10]));
    let result = orchestrator.assess(&request).await;

    let image = result.image_analysis.as_ref().unwrap();
    assert!(image.verdict.is_none());
    assert!(matches!(
        image.fallback_reason,
        Some(FallbackReason::Failed { ref message }) if message.contains("empty probability vector")
    ));
    assert_eq!(result.disaster_type_label(), "unknown");
    assert_eq!(result.priority_score, 2);
    assert_eq!(result.severity_level, SeverityLevel::Low);
}

#[tokio::test]
async fn test_orchestrator_from_config_keywords() -> Result<()> {
    let config = TriageConfig::from_toml_str(
        r#"
[service]
name = "valley-dispatch"
model_version = "field-v2"

[keywords]
emergency = ["sos"]
critical = ["mayday"]
"#,
    )?;
    let orchestrator = AssessmentOrchestrator::new(config.keywords.clone())
        .with_service_name(config.service.name.clone())
        .with_model_version(config.service.model_version.clone());

    let result = orchestrator
        .assess(&AssessmentRequest::from_text("SOS mayday from the ridge"))
        .await;
    assert!(result.is_emergency);
    assert_eq!(result.urgency_level, SeverityLevel::Critical);
    assert_eq!(result.processing_info.model_version, "field-v2");
    assert_eq!(result.processing_info.service_name, "valley-dispatch");

    // 預設關鍵字已被覆寫
    let result = orchestrator
        .assess(&AssessmentRequest::from_text("help, trapped"))
        .await;
    assert!(!result.is_emergency);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_requests_share_one_orchestrator() {
    let orchestrator = Arc::new(AssessmentOrchestrator::default());
    let texts = ["fire in the hall", "all quiet", "urgent rescue", "roof damaged"];

    let handles: Vec<_> = texts
        .iter()
        .map(|text| {
            let orchestrator = Arc::clone(&orchestrator);
            let request = AssessmentRequest::from_text(*text);
            tokio::spawn(async move { orchestrator.assess(&request).await })
        })
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    assert!(results[0].is_emergency);
    assert!(!results[1].is_emergency);
    assert_eq!(results[2].urgency_level, SeverityLevel::High);
    assert_eq!(results[3].urgency_level, SeverityLevel::Medium);
}

#[test]
fn test_missing_score_file_is_io_error() {
    let err = PrecomputedTextClassifier::from_json_file("x", "/nonexistent/scores.json").unwrap_err();
    assert!(matches!(err, TriageError::IoError(_)));
}

#[test]
fn test_raw_score_json_roundtrip_shape() {
    let json = serde_json::to_string(&RawScore::new("LABEL_1", 0.5)).unwrap();
    assert_eq!(json, r#"{"label":"LABEL_1","score":0.5}"#);
}
