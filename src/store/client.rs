//! VectorStore trait — abstract interface for similarity-search backends.
//!
//! The retrieval pipeline consumes the store as an opaque per-collection
//! similarity search. The primary implementation is `SqliteVectorStore` in
//! the `sqlite` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("collection not found: {0}")]
    CollectionNotFound(String),
    #[error("store connection failed: {0}")]
    Connection(String),
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        StoreError::Backend(err.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::CollectionNotFound(_))
    }
}

/// One similarity-search match.
///
/// `distance` is non-negative; lower means a closer semantic match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub document: String,
    pub metadata: Value,
    pub distance: f32,
}

/// Read-only similarity search over named collections.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Names of the collections currently present in the store.
    async fn list_collections(&self) -> Result<Vec<String>, StoreError>;

    /// Return up to `limit` nearest neighbours of `query` in `collection`,
    /// ordered ascending by distance.
    async fn search(
        &self,
        collection: &str,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>, StoreError>;
}

/// Factory handing out store handles.
///
/// The store client is not assumed safe for concurrent use on one shared
/// handle, so every concurrent search task opens its own.
#[async_trait]
pub trait StoreOpener: Send + Sync {
    type Store: VectorStore + Send + Sync + 'static;

    async fn open(&self) -> Result<Self::Store, StoreError>;
}
