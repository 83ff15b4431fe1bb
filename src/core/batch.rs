use crate::core::orchestrator::AssessmentOrchestrator;
use crate::domain::assessment::{AssessmentRequest, CombinedAssessment};
use crate::utils::error::{Result, TriageError};
use serde::Serialize;

pub const DEFAULT_MAX_REPORTS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub emergency_count: usize,
    pub immediate_action_count: usize,
    pub fallback_count: usize,
    pub average_processing_time_ms: f64,
}

impl BatchSummary {
    fn from_results(total: usize, results: &[CombinedAssessment]) -> Self {
        let successful = results.len();
        let total_time: f64 = results
            .iter()
            .map(|r| r.processing_info.processing_time_ms)
            .sum();

        Self {
            total,
            successful,
            emergency_count: results.iter().filter(|r| r.is_emergency).count(),
            immediate_action_count: results
                .iter()
                .filter(|r| r.requires_immediate_action)
                .count(),
            fallback_count: results.iter().filter(|r| r.used_fallback()).count(),
            average_processing_time_ms: if successful > 0 {
                total_time / successful as f64
            } else {
                0.0
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOutcome {
    pub results: Vec<CombinedAssessment>,
    pub summary: BatchSummary,
}

/// Rejects a batch larger than `max` before any report is touched.
pub fn check_batch_size(size: usize, max: usize) -> Result<()> {
    if size > max {
        return Err(TriageError::BatchLimitExceeded { size, max });
    }
    Ok(())
}

/// Assesses reports one after another, in input order.
pub struct BatchRunner {
    orchestrator: AssessmentOrchestrator,
    max_reports: usize,
}

impl BatchRunner {
    pub fn new(orchestrator: AssessmentOrchestrator) -> Self {
        Self {
            orchestrator,
            max_reports: DEFAULT_MAX_REPORTS,
        }
    }

    pub fn with_max_reports(mut self, max_reports: usize) -> Self {
        self.max_reports = max_reports;
        self
    }

    pub async fn run(&self, requests: &[AssessmentRequest]) -> Result<BatchOutcome> {
        check_batch_size(requests.len(), self.max_reports)?;

        tracing::info!("📦 Starting batch of {} reports", requests.len());

        let mut results = Vec::with_capacity(requests.len());
        for (index, request) in requests.iter().enumerate() {
            tracing::debug!("📦 Report {}/{}", index + 1, requests.len());
            results.push(self.orchestrator.assess(request).await);
        }

        let summary = BatchSummary::from_results(requests.len(), &results);
        tracing::info!(
            "📦 Batch complete: {} emergencies, {} need immediate action, {} used fallbacks",
            summary.emergency_count,
            summary.immediate_action_count,
            summary.fallback_count
        );

        Ok(BatchOutcome { results, summary })
    }
}
