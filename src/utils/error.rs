use thiserror::Error;

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Image decode failed: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Invalid image: {message}")]
    InvalidImage { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Classifier '{name}' is not available")]
    ClassifierUnavailable { name: String },

    #[error("Classifier '{name}' failed: {message}")]
    ClassifierFailed { name: String, message: String },

    #[error("Invalid classifier output: {message}")]
    InvalidClassifierOutput { message: String },

    #[error("Batch of {size} reports exceeds the limit of {max}")]
    BatchLimitExceeded { size: usize, max: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Model,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl TriageError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            TriageError::ConfigError { .. }
            | TriageError::ConfigValidationError { .. }
            | TriageError::InvalidConfigValueError { .. }
            | TriageError::MissingConfigError { .. } => ErrorCategory::Configuration,
            TriageError::ImageError(_)
            | TriageError::InvalidImage { .. }
            | TriageError::CsvError(_)
            | TriageError::SerializationError(_)
            | TriageError::BatchLimitExceeded { .. } => ErrorCategory::Input,
            TriageError::ClassifierUnavailable { .. }
            | TriageError::ClassifierFailed { .. }
            | TriageError::InvalidClassifierOutput { .. } => ErrorCategory::Model,
            TriageError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 模型問題都有關鍵字後備，不影響結果的完整性
            TriageError::ClassifierUnavailable { .. }
            | TriageError::ClassifierFailed { .. }
            | TriageError::InvalidClassifierOutput { .. } => ErrorSeverity::Low,
            TriageError::ImageError(_)
            | TriageError::InvalidImage { .. }
            | TriageError::BatchLimitExceeded { .. } => ErrorSeverity::Medium,
            TriageError::ConfigError { .. }
            | TriageError::ConfigValidationError { .. }
            | TriageError::InvalidConfigValueError { .. }
            | TriageError::MissingConfigError { .. }
            | TriageError::CsvError(_)
            | TriageError::SerializationError(_) => ErrorSeverity::High,
            TriageError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the TOML configuration file and any ${VAR} environment substitutions"
            }
            ErrorCategory::Input => {
                "Check that the input files exist and use a supported format (CSV, JSON, PNG/JPEG)"
            }
            ErrorCategory::Model => {
                "The keyword fallback was used; verify the classifier score files if model output was expected"
            }
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            TriageError::BatchLimitExceeded { size, max } => format!(
                "Too many reports in one batch ({}); split the input into batches of at most {}",
                size, max
            ),
            TriageError::MissingConfigError { field } => {
                format!("Configuration is missing the '{}' setting", field)
            }
            other => format!("{:?} problem: {}", other.category(), other),
        }
    }
}

pub type Result<T> = std::result::Result<T, TriageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_errors_are_low_severity() {
        let err = TriageError::ClassifierFailed {
            name: "urgency".to_string(),
            message: "timeout".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Model);
        assert_eq!(err.severity(), ErrorSeverity::Low);
        assert!(err.to_string().contains("urgency"));
    }

    #[test]
    fn test_batch_limit_message() {
        let err = TriageError::BatchLimitExceeded { size: 60, max: 50 };
        assert_eq!(err.category(), ErrorCategory::Input);
        assert!(err.user_friendly_message().contains("60"));
        assert!(err.user_friendly_message().contains("50"));
    }

    #[test]
    fn test_config_errors_are_high_severity() {
        let err = TriageError::InvalidConfigValueError {
            field: "batch.max_reports".to_string(),
            value: "0".to_string(),
            reason: "must be positive".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }
}
