//! Web search adapter — site-scoped package lookups.
//!
//! Issues three scoped queries (official site, aggregator site, generic),
//! tags each hit with the source type of the query that produced it,
//! deduplicates by URL and truncates to the requested count.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use super::engine::SearchEngine;

/// A deduplicated, source-tagged web search result.
#[derive(Debug, Clone, Serialize)]
pub struct WebResult {
    pub title: String,
    pub snippet: String,
    pub url: String,
    pub source_type: String,
    pub search_query: String,
}

const STOP_WORDS: [&str; 8] = ["tell", "me", "about", "what", "are", "is", "the", "for"];
const PACKAGE_TERMS: [&str; 6] = ["package", "offer", "bundle", "deal", "international", "city"];
const LOCATION_TERMS: [&str; 2] = ["pakistan", "jazz"];

pub struct WebSearchAdapter {
    engine: Arc<dyn SearchEngine>,
    official_site: String,
    aggregator_site: String,
    region: String,
    recency: String,
}

impl WebSearchAdapter {
    pub fn new(
        engine: Arc<dyn SearchEngine>,
        official_site: impl Into<String>,
        aggregator_site: impl Into<String>,
        region: impl Into<String>,
        recency: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            official_site: official_site.into(),
            aggregator_site: aggregator_site.into(),
            region: region.into(),
            recency: recency.into(),
        }
    }

    /// Run the scoped queries for `query` and return up to `max_results`
    /// unique results. A failing scoped query is skipped; total failure
    /// degrades to an empty list, never an error.
    pub async fn search_packages(&self, query: &str, max_results: usize) -> Vec<WebResult> {
        let clean = clean_query_for_search(query);

        let scoped_queries = [
            format!("site:{} {} package details", self.official_site, clean),
            format!("site:{} {} jazz bundle", self.aggregator_site, clean),
            format!("{} Jazz mobile internet plan Pakistan", clean),
        ];

        let mut all_results = Vec::new();
        for scoped in &scoped_queries {
            tracing::debug!("Searching with: {}", scoped);
            match self
                .engine
                .search(scoped, &self.region, &self.recency, max_results)
                .await
            {
                Ok(hits) => {
                    let source_type = self.source_type_for(scoped);
                    for hit in hits {
                        all_results.push(WebResult {
                            title: hit.title,
                            snippet: hit.snippet,
                            url: hit.url,
                            source_type: source_type.clone(),
                            search_query: scoped.clone(),
                        });
                    }
                }
                Err(err) => {
                    tracing::warn!("Scoped query '{}' failed: {}", scoped, err);
                    continue;
                }
            }
        }

        let mut unique = dedupe_by_url(all_results);
        unique.truncate(max_results);
        unique
    }

    fn source_type_for(&self, scoped_query: &str) -> String {
        if scoped_query.contains(&format!("site:{}", self.official_site)) {
            "Official Jazz Website".to_string()
        } else if scoped_query.contains(&format!("site:{}", self.aggregator_site)) {
            "ProPakistani".to_string()
        } else {
            "General Web".to_string()
        }
    }
}

/// Strip filler words and make sure the query carries package and location
/// context before it goes to the engine.
fn clean_query_for_search(query: &str) -> String {
    let query_lower = query.to_lowercase();
    let mut words: Vec<&str> = query
        .split_whitespace()
        .filter(|word| !STOP_WORDS.contains(&word.to_lowercase().as_str()))
        .collect();

    if !PACKAGE_TERMS.iter().any(|term| query_lower.contains(term)) {
        words.push("package");
    }
    if !LOCATION_TERMS.iter().any(|term| query_lower.contains(term)) {
        words.push("Pakistan");
    }

    words.join(" ")
}

/// First occurrence of a URL wins; order is otherwise preserved.
fn dedupe_by_url(results: Vec<WebResult>) -> Vec<WebResult> {
    let mut seen_urls = HashSet::new();
    results
        .into_iter()
        .filter(|result| !result.url.is_empty() && seen_urls.insert(result.url.clone()))
        .collect()
}

/// Format results for prompt injection.
pub fn format_web_results(results: &[WebResult]) -> String {
    if results.is_empty() {
        return "No recent packages found online.".to_string();
    }

    let mut formatted = String::from("Latest packages found online:\n\n");
    for (i, result) in results.iter().enumerate() {
        formatted.push_str(&format!("{}. {}\n", i + 1, result.title));
        formatted.push_str(&format!("   Summary: {}\n", result.snippet));
        formatted.push_str(&format!("   Source: {}\n", result.source_type));
        formatted.push_str(&format!("   URL: {}\n\n", result.url));
    }
    formatted.push_str(
        "Note: These results are from online searches and may be more current than our database. \
         Please verify details on the official Jazz website.\n",
    );

    formatted
}
