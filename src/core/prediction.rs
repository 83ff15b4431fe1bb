use crate::core::normalizer::LabelNormalizer;
use crate::domain::labels::{DisasterType, DISASTER_LABELS};
use crate::domain::model::{unit, ClassifierOutput, DisasterPrediction, PredictionMethod};
use crate::utils::error::{Result, TriageError};

/// Confidence assigned when the caller names the disaster type.
pub const USER_PROVIDED_CONFIDENCE: f64 = 0.9;

const PREDICT_ONLY_CONFIDENCE: f64 = 0.85;

impl DisasterPrediction {
    pub fn user_provided(disaster_type: DisasterType) -> Self {
        Self {
            disaster_type,
            confidence: USER_PROVIDED_CONFIDENCE,
            probabilities: vec![(disaster_type, USER_PROVIDED_CONFIDENCE)],
            method: PredictionMethod::UserProvided,
        }
    }

    pub fn from_output(output: ClassifierOutput) -> Result<Self> {
        match output {
            ClassifierOutput::Probabilities(probabilities) => Self::from_probabilities(&probabilities),
            ClassifierOutput::PredictedIndex(index) => {
                Self::from_probabilities(&expand_predicted_index(index))
            }
            ClassifierOutput::Labeled(raw) => {
                if raw.is_empty() {
                    return Err(TriageError::InvalidClassifierOutput {
                        message: "disaster classifier returned no labels".to_string(),
                    });
                }
                let distribution = LabelNormalizer::new().normalize(&raw, &DISASTER_LABELS);
                let probabilities: Vec<f64> = distribution.iter().map(|(_, p)| p).collect();
                Self::from_probabilities(&probabilities)
            }
        }
    }

    /// Argmax over the vector (first maximum wins). A vector shorter than the
    /// label set truncates it; an index past the label set clamps to the last label.
    pub fn from_probabilities(probabilities: &[f64]) -> Result<Self> {
        if probabilities.is_empty() {
            return Err(TriageError::InvalidClassifierOutput {
                message: "disaster classifier returned an empty probability vector".to_string(),
            });
        }

        let labels = &DisasterType::ALL[..probabilities.len().min(DisasterType::ALL.len())];
        if probabilities.len() != DisasterType::ALL.len() {
            tracing::warn!(
                "⚠️ Class count mismatch: model has {}, expected {}",
                probabilities.len(),
                DisasterType::ALL.len()
            );
        }

        let mut best_index = 0;
        let mut best = unit(probabilities[0]);
        for (i, &p) in probabilities.iter().enumerate().skip(1) {
            let p = unit(p);
            if p > best {
                best = p;
                best_index = i;
            }
        }

        let disaster_type = labels[best_index.min(labels.len() - 1)];

        Ok(Self {
            disaster_type,
            confidence: best,
            probabilities: labels
                .iter()
                .zip(probabilities)
                .map(|(t, p)| (*t, unit(*p)))
                .collect(),
            method: PredictionMethod::TrainedModel,
        })
    }
}

/// 只回傳類別索引的模型：預測類別 0.85，其餘平分 0.15
fn expand_predicted_index(index: usize) -> Vec<f64> {
    let n = DisasterType::ALL.len();
    let index = index.min(n - 1);
    let rest = (1.0 - PREDICT_ONLY_CONFIDENCE) / (n - 1) as f64;
    (0..n)
        .map(|i| if i == index { PREDICT_ONLY_CONFIDENCE } else { rest })
        .collect()
}
