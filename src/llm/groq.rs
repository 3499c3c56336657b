//! Groq chat-completion client (OpenAI-compatible API).

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::errors::ApiError;

use super::provider::LlmProvider;
use super::types::ChatRequest;

#[derive(Clone)]
pub struct GroqProvider {
    base_url: String,
    api_key: String,
    client: Client,
}

impl GroqProvider {
    pub fn new(base_url: String, api_key: String, timeout: std::time::Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        }
    }
}

fn build_body(request: &ChatRequest, model_id: &str) -> Value {
    let mut body = json!({
        "model": model_id,
        "messages": request.messages,
        "stream": false,
    });

    if let Some(obj) = body.as_object_mut() {
        if let Some(t) = request.temperature {
            obj.insert("temperature".to_string(), json!(t));
        }
        if let Some(t) = request.max_tokens {
            obj.insert("max_tokens".to_string(), json!(t));
        }
    }

    body
}

#[async_trait]
impl LlmProvider for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    /// One attempt, no retry. A non-success status surfaces the raw
    /// response body so the caller can hand it back as an error string.
    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, ApiError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = build_body(&request, model_id);

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(text));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::ChatMessage;

    #[test]
    fn body_carries_model_messages_and_sampling() {
        let request = ChatRequest::new(vec![ChatMessage::user("Any weekly bundles?")])
            .with_sampling(0.5, 512);
        let body = build_body(&request, "meta-llama/llama-4-scout-17b-16e-instruct");

        assert_eq!(body["model"], "meta-llama/llama-4-scout-17b-16e-instruct");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Any weekly bundles?");
        assert_eq!(body["temperature"], 0.5);
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn sampling_is_omitted_when_unset() {
        let request = ChatRequest::new(vec![ChatMessage::user("hi")]);
        let body = build_body(&request, "m");

        assert!(body.get("temperature").is_none());
        assert!(body.get("max_tokens").is_none());
    }
}
