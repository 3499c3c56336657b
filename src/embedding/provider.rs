use async_trait::async_trait;

use crate::core::errors::ApiError;

/// Turns text into a fixed-length embedding vector.
///
/// Deterministic for identical input and model version.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of inputs; one vector per input, in order.
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;

    /// Embed a single query string.
    async fn embed_one(&self, input: &str) -> Result<Vec<f32>, ApiError> {
        let mut vectors = self.embed(&[input.to_string()]).await?;
        if vectors.is_empty() {
            return Err(ApiError::Internal(
                "embedding provider returned no vectors".to_string(),
            ));
        }
        Ok(vectors.remove(0))
    }
}
