//! Collaborators backed by scores that were computed elsewhere, e.g. by a
//! model server whose output was saved as JSON.

use crate::domain::model::{ClassifierOutput, ImageTensor, RawScore};
use crate::domain::ports::{DisasterClassifier, FeatureExtractor, TextClassifier};
use crate::utils::error::{Result, TriageError};
use async_trait::async_trait;
use std::path::Path;

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Returns the same raw scores for every text.
#[derive(Debug, Clone)]
pub struct PrecomputedTextClassifier {
    name: String,
    scores: Vec<RawScore>,
}

impl PrecomputedTextClassifier {
    pub fn new(name: impl Into<String>, scores: Vec<RawScore>) -> Self {
        Self {
            name: name.into(),
            scores,
        }
    }

    /// Reads a JSON array of `{"label": ..., "score": ...}` objects.
    pub fn from_json_file(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let scores: Vec<RawScore> = read_json(path.as_ref())?;
        tracing::debug!(
            "📄 Loaded {} precomputed scores from {}",
            scores.len(),
            path.as_ref().display()
        );
        Ok(Self::new(name, scores))
    }
}

#[async_trait]
impl TextClassifier for PrecomputedTextClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn classify(&self, _text: &str) -> Result<Vec<RawScore>> {
        Ok(self.scores.clone())
    }
}

/// Per-channel mean of the preprocessed tensor. Pairs with a precomputed
/// classifier, which ignores the features anyway.
#[derive(Debug, Clone, Copy)]
pub struct ChannelMeanExtractor {
    input_size: (u32, u32),
}

impl ChannelMeanExtractor {
    pub fn new(input_size: (u32, u32)) -> Self {
        Self { input_size }
    }
}

impl Default for ChannelMeanExtractor {
    fn default() -> Self {
        Self::new((224, 224))
    }
}

#[async_trait]
impl FeatureExtractor for ChannelMeanExtractor {
    fn input_size(&self) -> (u32, u32) {
        self.input_size
    }

    async fn extract(&self, tensor: &ImageTensor) -> Result<Vec<f32>> {
        let pixels = tensor.data.len() / 3;
        if pixels == 0 {
            return Err(TriageError::ClassifierFailed {
                name: "channel-mean".to_string(),
                message: "empty image tensor".to_string(),
            });
        }

        let mut sums = [0f64; 3];
        for chunk in tensor.data.chunks_exact(3) {
            for (sum, value) in sums.iter_mut().zip(chunk) {
                *sum += f64::from(*value);
            }
        }

        Ok(sums.iter().map(|s| (s / pixels as f64) as f32).collect())
    }
}

/// Returns the same classifier output for every image.
#[derive(Debug, Clone)]
pub struct PrecomputedDisasterClassifier {
    name: String,
    output: ClassifierOutput,
}

impl PrecomputedDisasterClassifier {
    pub fn new(name: impl Into<String>, output: ClassifierOutput) -> Self {
        Self {
            name: name.into(),
            output,
        }
    }

    /// Accepts `{"probabilities": [...]}`, `{"predicted_index": n}`,
    /// `{"labeled": [...]}`, or a bare probability array.
    pub fn from_json_file(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let value: serde_json::Value = read_json(path.as_ref())?;
        let output = match value {
            serde_json::Value::Array(_) => {
                ClassifierOutput::Probabilities(serde_json::from_value(value)?)
            }
            other => serde_json::from_value(other)?,
        };
        Ok(Self::new(name, output))
    }
}

#[async_trait]
impl DisasterClassifier for PrecomputedDisasterClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn classify(&self, _features: &[f32]) -> Result<ClassifierOutput> {
        Ok(self.output.clone())
    }
}
