use clap::Parser;
use rescue_triage::adapters::{
    load_requests, write_results_csv, ChannelMeanExtractor, PrecomputedDisasterClassifier,
    PrecomputedTextClassifier,
};
use rescue_triage::config::{AssessArgs, BatchArgs, Command, ModelArgs};
use rescue_triage::utils::error::{ErrorSeverity, TriageError};
use rescue_triage::utils::{logger, validation::Validate};
use rescue_triage::{
    AssessmentOrchestrator, AssessmentRequest, BatchRunner, CliConfig, DisasterType, TriageConfig,
    VisionModels,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 設定檔決定日誌格式，所以先載入再初始化日誌
    let loaded = cli.load_config();
    let logging = loaded
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    if cli.json_logs || logging.is_json() {
        logger::init_json_logger(if cli.verbose { "debug" } else { logging.level.as_str() });
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting rescue-triage CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 驗證配置
    let config = match cli
        .validate()
        .and(loaded)
        .and_then(|config| config.validate().map(|_| config))
    {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(exit_code(&e).max(1));
        }
    };

    let result = match &cli.command {
        Command::Assess(args) => run_assess(&config, args).await,
        Command::Batch(args) => run_batch(&config, args).await,
    };

    if let Err(e) = result {
        tracing::error!(
            "❌ Triage failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        let code = exit_code(&e);
        if code > 0 {
            std::process::exit(code);
        }
    }

    Ok(())
}

/// 根據錯誤嚴重程度決定退出碼
fn exit_code(error: &TriageError) -> i32 {
    match error.severity() {
        ErrorSeverity::Low => 0,      // 警告，但成功
        ErrorSeverity::Medium => 2,   // 輸入錯誤
        ErrorSeverity::High => 1,     // 處理錯誤
        ErrorSeverity::Critical => 3, // 系統錯誤
    }
}

fn build_orchestrator(
    config: &TriageConfig,
    models: &ModelArgs,
) -> rescue_triage::Result<AssessmentOrchestrator> {
    let mut orchestrator = AssessmentOrchestrator::new(config.keywords.clone())
        .with_service_name(config.service.name.clone())
        .with_model_version(config.service.model_version.clone());

    if let Some(path) = &models.emergency_scores {
        orchestrator = orchestrator.with_emergency_classifier(Arc::new(
            PrecomputedTextClassifier::from_json_file("emergency-scores", path)?,
        ));
    }
    if let Some(path) = &models.urgency_scores {
        orchestrator = orchestrator.with_urgency_classifier(Arc::new(
            PrecomputedTextClassifier::from_json_file("urgency-scores", path)?,
        ));
    }
    if let Some(path) = &models.disaster_probabilities {
        orchestrator = orchestrator.with_vision(VisionModels::new(
            Arc::new(ChannelMeanExtractor::default()),
            Arc::new(PrecomputedDisasterClassifier::from_json_file(
                "disaster-probabilities",
                path,
            )?),
        ));
    }

    Ok(orchestrator)
}

async fn run_assess(config: &TriageConfig, args: &AssessArgs) -> rescue_triage::Result<()> {
    let orchestrator = build_orchestrator(config, &args.models)?;

    let mut request = AssessmentRequest {
        text: args.text.clone(),
        location: args.location.clone(),
        disaster_type: args.disaster_type.as_deref().map(DisasterType::parse_lenient),
        image: None,
    };
    if let Some(path) = &args.image {
        request.image = Some(std::fs::read(path)?);
    }
    if request.text_input().is_none() && request.image_input().is_none() {
        return Err(TriageError::MissingConfigError {
            field: "--text or --image".to_string(),
        });
    }

    let assessment = orchestrator.assess(&request).await;
    let json = if args.pretty {
        serde_json::to_string_pretty(&assessment)?
    } else {
        serde_json::to_string(&assessment)?
    };
    println!("{}", json);

    Ok(())
}

async fn run_batch(config: &TriageConfig, args: &BatchArgs) -> rescue_triage::Result<()> {
    let orchestrator = build_orchestrator(config, &args.models)?;
    let max_reports = args.max_reports.unwrap_or(config.batch.max_reports);
    let runner = BatchRunner::new(orchestrator).with_max_reports(max_reports);

    let requests = load_requests(&args.input, max_reports)?;
    let outcome = runner.run(&requests).await?;

    if let Some(output) = &args.output {
        write_results_csv(output, &outcome)?;
        println!("📁 Results saved to: {}", output.display());
    }
    println!("{}", serde_json::to_string_pretty(&outcome.summary)?);

    Ok(())
}
