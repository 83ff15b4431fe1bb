use crate::domain::model::{ClassifierOutput, ImageTensor, RawScore};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Emergency or urgency text classifier. Labels may be canonical names,
/// index-style names (`LABEL_1`, `2`) or arbitrary strings.
#[async_trait]
pub trait TextClassifier: Send + Sync {
    fn name(&self) -> &str;
    async fn classify(&self, text: &str) -> Result<Vec<RawScore>>;
}

#[async_trait]
pub trait FeatureExtractor: Send + Sync {
    /// `(width, height)` the extractor expects.
    fn input_size(&self) -> (u32, u32);
    async fn extract(&self, tensor: &ImageTensor) -> Result<Vec<f32>>;
}

#[async_trait]
pub trait DisasterClassifier: Send + Sync {
    fn name(&self) -> &str;
    async fn classify(&self, features: &[f32]) -> Result<ClassifierOutput>;
}
