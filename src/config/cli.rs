use crate::config::toml_config::{TriageConfig, MAX_BATCH_LIMIT};
use crate::utils::error::{Result, TriageError};
use crate::utils::validation::{self, Validate};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "rescue-triage")]
#[command(about = "Disaster report triage: text urgency, image damage and fused priority")]
pub struct CliConfig {
    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, short, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit JSON log lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Assess a single report and print the result as JSON
    Assess(AssessArgs),
    /// Assess every row of a CSV file
    Batch(BatchArgs),
}

/// Precomputed collaborator output, one JSON file per collaborator.
#[derive(Debug, Clone, Default, Args)]
pub struct ModelArgs {
    /// JSON array of {label, score} from the emergency classifier
    #[arg(long)]
    pub emergency_scores: Option<PathBuf>,

    /// JSON array of {label, score} from the urgency classifier
    #[arg(long)]
    pub urgency_scores: Option<PathBuf>,

    /// JSON disaster classifier output: {"probabilities": [...]},
    /// {"predicted_index": n} or {"labeled": [...]}
    #[arg(long)]
    pub disaster_probabilities: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct AssessArgs {
    #[arg(long)]
    pub text: Option<String>,

    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Skip image classification and use this disaster type
    #[arg(long)]
    pub disaster_type: Option<String>,

    #[arg(long)]
    pub location: Option<String>,

    #[arg(long, help = "Pretty-print the JSON output")]
    pub pretty: bool,

    #[command(flatten)]
    pub models: ModelArgs,
}

#[derive(Debug, Clone, Args)]
pub struct BatchArgs {
    /// CSV with columns text, location, disaster_type, image_path
    #[arg(long)]
    pub input: PathBuf,

    /// Result CSV; the summary is printed either way
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Overrides batch.max_reports from the config file
    #[arg(long)]
    pub max_reports: Option<usize>,

    #[command(flatten)]
    pub models: ModelArgs,
}

impl CliConfig {
    /// 有指定設定檔時從檔案載入，否則使用預設值
    pub fn load_config(&self) -> Result<TriageConfig> {
        match &self.config {
            Some(path) => TriageConfig::from_file(path),
            None => Ok(TriageConfig::default()),
        }
    }

    pub fn models(&self) -> &ModelArgs {
        match &self.command {
            Command::Assess(args) => &args.models,
            Command::Batch(args) => &args.models,
        }
    }
}

pub const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "webp"];

fn path_strings(paths: &[&Option<PathBuf>]) -> Vec<String> {
    paths
        .iter()
        .filter_map(|p| p.as_ref())
        .map(|p| p.to_string_lossy().into_owned())
        .collect()
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        let models = self.models();
        let score_files = path_strings(&[
            &models.emergency_scores,
            &models.urgency_scores,
            &models.disaster_probabilities,
        ]);
        for file in &score_files {
            validation::validate_path("score file", file)?;
        }
        validation::validate_file_extensions("score file", &score_files, &["json"])?;

        match &self.command {
            Command::Assess(args) => {
                if args.text.is_none() && args.image.is_none() {
                    return Err(TriageError::MissingConfigError {
                        field: "--text or --image".to_string(),
                    });
                }
                let images = path_strings(&[&args.image]);
                validation::validate_file_extensions("--image", &images, &IMAGE_EXTENSIONS)?;
            }
            Command::Batch(args) => {
                let input = args.input.to_string_lossy().into_owned();
                validation::validate_path("--input", &input)?;
                validation::validate_file_extensions("--input", &[input], &["csv"])?;
                if let Some(output) = &args.output {
                    validation::validate_path("--output", &output.to_string_lossy())?;
                }
                if let Some(max_reports) = args.max_reports {
                    validation::validate_range("--max-reports", max_reports, 1, MAX_BATCH_LIMIT)?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assess_command() {
        let cli = CliConfig::try_parse_from([
            "rescue-triage",
            "--verbose",
            "assess",
            "--text",
            "bridge collapsed",
            "--disaster-type",
            "earthquake",
            "--emergency-scores",
            "scores.json",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert!(!cli.json_logs);
        match &cli.command {
            Command::Assess(args) => {
                assert_eq!(args.text.as_deref(), Some("bridge collapsed"));
                assert_eq!(args.disaster_type.as_deref(), Some("earthquake"));
                assert!(args.image.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(
            cli.models().emergency_scores,
            Some(PathBuf::from("scores.json"))
        );
    }

    #[test]
    fn test_parse_batch_command_with_global_flags_after_subcommand() {
        let cli = CliConfig::try_parse_from([
            "rescue-triage",
            "batch",
            "--input",
            "reports.csv",
            "--max-reports",
            "20",
            "--json-logs",
        ])
        .unwrap();

        assert!(cli.json_logs);
        match cli.command {
            Command::Batch(args) => {
                assert_eq!(args.input, PathBuf::from("reports.csv"));
                assert_eq!(args.max_reports, Some(20));
                assert!(args.output.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_batch_requires_input() {
        assert!(CliConfig::try_parse_from(["rescue-triage", "batch"]).is_err());
    }

    #[test]
    fn test_load_config_defaults_without_file() {
        let cli = CliConfig::try_parse_from(["rescue-triage", "assess"]).unwrap();
        assert_eq!(cli.load_config().unwrap(), TriageConfig::default());
    }

    #[test]
    fn test_validate_cli_inputs() {
        let parse = |args: &[&str]| {
            let mut full = vec!["rescue-triage"];
            full.extend_from_slice(args);
            CliConfig::try_parse_from(full).unwrap()
        };

        assert!(matches!(
            parse(&["assess"]).validate(),
            Err(TriageError::MissingConfigError { .. })
        ));
        assert!(parse(&["assess", "--text", "help"]).validate().is_ok());
        assert!(parse(&["assess", "--image", "scene.JPG"]).validate().is_ok());
        assert!(parse(&["assess", "--image", "scene.tiff"]).validate().is_err());
        assert!(parse(&["assess", "--text", "x", "--urgency-scores", "u.txt"])
            .validate()
            .is_err());

        assert!(parse(&["batch", "--input", "reports.csv"]).validate().is_ok());
        assert!(parse(&["batch", "--input", "reports.xlsx"]).validate().is_err());
        assert!(parse(&["batch", "--input", "r.csv", "--max-reports", "0"])
            .validate()
            .is_err());
    }
}
