pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::TriageConfig;
pub use core::{AssessmentOrchestrator, BatchRunner, VisionModels};
pub use domain::assessment::{AssessmentRequest, CombinedAssessment};
pub use domain::labels::{DisasterType, SeverityLevel};
pub use utils::error::{Result, TriageError};
