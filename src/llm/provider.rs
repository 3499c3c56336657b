use async_trait::async_trait;

use crate::core::errors::ApiError;

use super::types::ChatRequest;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "groq")
    fn name(&self) -> &str;

    /// chat completion (non-streaming, single attempt)
    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, ApiError>;
}
