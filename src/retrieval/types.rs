use std::collections::BTreeMap;

use crate::store::SearchHit;

/// Successful search output for one collection.
#[derive(Debug, Clone)]
pub struct CollectionHits {
    pub collection: String,
    pub hits: Vec<SearchHit>,
}

/// Why a requested collection produced no entry in the result map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The collection does not exist in the store.
    Absent,
    /// The search (or the store connection) failed.
    Failed(String),
}

/// A recorded skip for one requested collection.
#[derive(Debug, Clone)]
pub struct CollectionSkip {
    pub collection: String,
    pub reason: SkipReason,
}

impl CollectionSkip {
    pub fn absent(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            reason: SkipReason::Absent,
        }
    }

    pub fn failed(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            reason: SkipReason::Failed(message.into()),
        }
    }
}

/// Everything the executor learned for one query: successful results keyed
/// by collection name, plus an explicit record of what was skipped and why.
///
/// A collection that exists but matched nothing appears in `results` with
/// empty hits; only absent or failed collections land in `skipped`.
#[derive(Debug, Default)]
pub struct RetrievalOutcome {
    pub results: BTreeMap<String, CollectionHits>,
    pub skipped: Vec<CollectionSkip>,
}

impl RetrievalOutcome {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Successful hits in the caller's preferred collection order, for
    /// deterministic fusion input regardless of task completion order.
    pub fn hits_in_order<'a>(&'a self, order: &[String]) -> Vec<&'a CollectionHits> {
        let mut ordered: Vec<&CollectionHits> = order
            .iter()
            .filter_map(|name| self.results.get(name))
            .collect();

        // Results for collections missing from `order` still count.
        for (name, hits) in &self.results {
            if !order.contains(name) {
                ordered.push(hits);
            }
        }

        ordered
    }
}
