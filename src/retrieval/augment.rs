//! Web augmentation decision — should live web search supplement the
//! locally retrieved context?

use chrono::{Datelike, Utc};

use super::fusion::FusedResults;

/// Query terms that signal the user wants up-to-date information.
const RECENCY_TERMS: [&str; 10] = [
    "latest",
    "current",
    "new package",
    "today",
    "now",
    "recent",
    "updated",
    "this month",
    "this week",
    "available now",
];

/// Package-type keywords the local corpus is expected to cover. A query
/// mentioning one that the retrieved documents never mention is a coverage
/// gap worth going online for.
const PACKAGE_KEYWORDS: [&str; 9] = [
    "5g",
    "4g",
    "unlimited",
    "night",
    "student",
    "senior",
    "weekly",
    "monthly",
    "international",
];

/// Decides whether a query needs live web augmentation.
///
/// Pure with respect to its inputs: the term tables (including the
/// current-year token) are fixed at construction.
pub struct AugmentationDecider {
    recency_terms: Vec<String>,
    package_keywords: Vec<String>,
}

impl AugmentationDecider {
    pub fn new() -> Self {
        let mut recency_terms: Vec<String> =
            RECENCY_TERMS.iter().map(|t| t.to_string()).collect();
        recency_terms.push(Utc::now().year().to_string());

        Self {
            recency_terms,
            package_keywords: PACKAGE_KEYWORDS.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Custom term tables, mostly for tests.
    pub fn with_terms(recency_terms: Vec<String>, package_keywords: Vec<String>) -> Self {
        Self {
            recency_terms,
            package_keywords,
        }
    }

    /// The three augmentation rules, in order:
    /// 1. no local evidence at all;
    /// 2. the query asks for something recent;
    /// 3. the query names a package type the local results never mention.
    pub fn should_augment(&self, query: &str, fused: &FusedResults) -> bool {
        if fused.is_empty() {
            tracing::debug!("Augmenting: no local results");
            return true;
        }

        let query_lower = query.to_lowercase();

        if self
            .recency_terms
            .iter()
            .any(|term| query_lower.contains(term.as_str()))
        {
            tracing::debug!("Augmenting: recency intent in query");
            return true;
        }

        let corpus = fused.documents().join("\n").to_lowercase();
        for keyword in &self.package_keywords {
            if query_lower.contains(keyword.as_str()) && !corpus.contains(keyword.as_str()) {
                tracing::debug!("Augmenting: '{}' missing from local results", keyword);
                return true;
            }
        }

        false
    }
}

impl Default for AugmentationDecider {
    fn default() -> Self {
        Self::new()
    }
}
