pub mod batch;
pub mod fusion;
pub mod keywords;
pub mod normalizer;
pub mod orchestrator;
pub mod prediction;
pub mod preprocess;
pub mod recommendation;
pub mod visual;

pub use batch::{BatchOutcome, BatchRunner, BatchSummary};
pub use fusion::SeverityFusionEngine;
pub use keywords::KeywordRules;
pub use normalizer::LabelNormalizer;
pub use orchestrator::{AssessmentOrchestrator, VisionModels};
pub use recommendation::RecommendationEngine;
pub use visual::VisualDamageAnalyzer;
