//! Search engine boundary.
//!
//! One scoped query in, a list of raw hits out. Individual calls may fail;
//! callers are expected to carry on with the remaining scoped queries.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::core::errors::ApiError;

/// A raw result from the underlying search engine.
#[derive(Debug, Clone, Serialize)]
pub struct EngineHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

#[async_trait]
pub trait SearchEngine: Send + Sync {
    async fn search(
        &self,
        query: &str,
        region: &str,
        recency: &str,
        max_results: usize,
    ) -> Result<Vec<EngineHit>, ApiError>;
}

/// DuckDuckGo instant-answer API client.
pub struct DuckDuckGoEngine {
    client: Client,
}

impl DuckDuckGoEngine {
    pub fn new(timeout: std::time::Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }
}

#[async_trait]
impl SearchEngine for DuckDuckGoEngine {
    async fn search(
        &self,
        query: &str,
        region: &str,
        recency: &str,
        max_results: usize,
    ) -> Result<Vec<EngineHit>, ApiError> {
        let url = format!(
            "https://api.duckduckgo.com/?q={}&format=json&no_redirect=1&no_html=1&kl={}&df={}",
            urlencoding::encode(query),
            urlencoding::encode(region),
            urlencoding::encode(recency)
        );

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !response.status().is_success() {
            return Err(ApiError::Internal(format!(
                "DuckDuckGo search failed: {}",
                response.status()
            )));
        }

        let payload: Value = response.json().await.map_err(ApiError::internal)?;
        let mut results = Vec::new();

        if let Some(abstract_text) = payload.get("AbstractText").and_then(|v| v.as_str()) {
            if let Some(url) = payload.get("AbstractURL").and_then(|v| v.as_str()) {
                if !abstract_text.is_empty() && !url.is_empty() {
                    results.push(EngineHit {
                        title: abstract_text
                            .split(" - ")
                            .next()
                            .unwrap_or(abstract_text)
                            .to_string(),
                        snippet: abstract_text.to_string(),
                        url: url.to_string(),
                    });
                }
            }
        }

        if let Some(items) = payload.get("Results").and_then(|v| v.as_array()) {
            extract_topics(items, &mut results);
        }
        if let Some(items) = payload.get("RelatedTopics").and_then(|v| v.as_array()) {
            extract_topics(items, &mut results);
        }

        results.truncate(max_results);
        Ok(results)
    }
}

fn extract_topics(items: &[Value], results: &mut Vec<EngineHit>) {
    for item in items {
        if let Some(topics) = item.get("Topics").and_then(|v| v.as_array()) {
            extract_topics(topics, results);
            continue;
        }
        let text = item.get("Text").and_then(|v| v.as_str()).unwrap_or("");
        let url = item.get("FirstURL").and_then(|v| v.as_str()).unwrap_or("");
        if text.is_empty() || url.is_empty() {
            continue;
        }
        results.push(EngineHit {
            title: text.split(" - ").next().unwrap_or(text).to_string(),
            snippet: text.to_string(),
            url: url.to_string(),
        });
    }
}
