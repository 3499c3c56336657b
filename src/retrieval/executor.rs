//! Collection query executor — fan a query embedding out to every named
//! collection, tolerate partial failure, and fall back to a sequential
//! sweep when the concurrent pass comes back empty.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::store::{SearchHit, StoreError, StoreOpener, VectorStore};

use super::types::{CollectionHits, CollectionSkip, RetrievalOutcome};

pub const DEFAULT_RESULT_LIMIT: usize = 10;
const DEFAULT_MAX_PARALLEL: usize = 8;
const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs one similarity search per collection.
///
/// Each concurrent task opens its own store handle through the
/// [`StoreOpener`]; handles are never shared across tasks. Task pool size
/// is the collection count, capped at `max_parallel`.
pub struct CollectionQueryExecutor<O: StoreOpener> {
    opener: Arc<O>,
    max_parallel: usize,
    search_timeout: Duration,
}

impl<O: StoreOpener + 'static> CollectionQueryExecutor<O> {
    pub fn new(opener: Arc<O>) -> Self {
        Self {
            opener,
            max_parallel: DEFAULT_MAX_PARALLEL,
            search_timeout: DEFAULT_SEARCH_TIMEOUT,
        }
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    pub fn with_search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = timeout;
        self
    }

    /// Query every named collection for the `limit` nearest neighbours of
    /// `query`.
    ///
    /// Collections are de-duplicated preserving first occurrence. A `limit`
    /// of zero falls back to [`DEFAULT_RESULT_LIMIT`]. The concurrent
    /// strategy runs first; if it yields zero successful collections the
    /// sequential strategy re-opens the store once and sweeps the surviving
    /// names one at a time. Nothing here returns an error: failures degrade
    /// to recorded skips.
    pub async fn query_collections(
        &self,
        collections: &[String],
        query: &[f32],
        limit: usize,
    ) -> RetrievalOutcome {
        let limit = if limit == 0 {
            tracing::warn!("result limit 0 requested; using default {}", DEFAULT_RESULT_LIMIT);
            DEFAULT_RESULT_LIMIT
        } else {
            limit
        };

        let names = dedupe_preserving_order(collections);
        if names.is_empty() {
            return RetrievalOutcome::default();
        }

        let outcome = self.query_parallel(&names, query, limit).await;
        if !outcome.is_empty() {
            return outcome;
        }

        tracing::warn!(
            "Concurrent retrieval yielded no collections; falling back to sequential"
        );
        self.query_sequential(&names, query, limit).await
    }

    async fn query_parallel(
        &self,
        names: &[String],
        query: &[f32],
        limit: usize,
    ) -> RetrievalOutcome {
        let pool_size = self.max_parallel.min(names.len()).max(1);
        let semaphore = Arc::new(Semaphore::new(pool_size));
        let mut join_set = JoinSet::new();

        for name in names {
            let name = name.clone();
            let opener = Arc::clone(&self.opener);
            let semaphore = Arc::clone(&semaphore);
            let query = query.to_vec();
            let timeout = self.search_timeout;

            join_set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(closed) => {
                        return (name, Err(StoreError::Backend(closed.to_string())));
                    }
                };
                let result = search_one(opener.as_ref(), &name, &query, limit, timeout).await;
                (name, result)
            });
        }

        let mut outcome = RetrievalOutcome::default();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((name, Ok(hits))) => {
                    outcome.results.insert(
                        name.clone(),
                        CollectionHits {
                            collection: name,
                            hits,
                        },
                    );
                }
                Ok((name, Err(err))) if err.is_not_found() => {
                    tracing::info!("Collection '{}' not found; skipping", name);
                    outcome.skipped.push(CollectionSkip::absent(name));
                }
                Ok((name, Err(err))) => {
                    tracing::warn!("Query for collection '{}' failed: {}", name, err);
                    outcome
                        .skipped
                        .push(CollectionSkip::failed(name, err.to_string()));
                }
                Err(join_err) => {
                    tracing::error!("Collection query task panicked: {}", join_err);
                }
            }
        }
        outcome
    }

    /// One store handle, one collection at a time. Unknown collections are
    /// filtered out up front via `list_collections` and recorded as skips.
    async fn query_sequential(
        &self,
        names: &[String],
        query: &[f32],
        limit: usize,
    ) -> RetrievalOutcome {
        let mut outcome = RetrievalOutcome::default();

        let store = match self.opener.open().await {
            Ok(store) => store,
            Err(err) => {
                tracing::error!("Sequential fallback could not open store: {}", err);
                for name in names {
                    outcome
                        .skipped
                        .push(CollectionSkip::failed(name.clone(), err.to_string()));
                }
                return outcome;
            }
        };

        let available: HashSet<String> = match store.list_collections().await {
            Ok(list) => list.into_iter().collect(),
            Err(err) => {
                tracing::error!("Sequential fallback could not list collections: {}", err);
                for name in names {
                    outcome
                        .skipped
                        .push(CollectionSkip::failed(name.clone(), err.to_string()));
                }
                return outcome;
            }
        };

        for name in names {
            if !available.contains(name) {
                tracing::info!("Skipping unknown collection '{}'", name);
                outcome.skipped.push(CollectionSkip::absent(name.clone()));
                continue;
            }

            match tokio::time::timeout(self.search_timeout, store.search(name, query, limit)).await
            {
                Ok(Ok(hits)) => {
                    outcome.results.insert(
                        name.clone(),
                        CollectionHits {
                            collection: name.clone(),
                            hits,
                        },
                    );
                }
                Ok(Err(err)) => {
                    tracing::warn!("Sequential query for '{}' failed: {}", name, err);
                    outcome
                        .skipped
                        .push(CollectionSkip::failed(name.clone(), err.to_string()));
                }
                Err(_) => {
                    tracing::warn!("Sequential query for '{}' timed out", name);
                    outcome.skipped.push(CollectionSkip::failed(
                        name.clone(),
                        format!("search timed out after {:?}", self.search_timeout),
                    ));
                }
            }
        }

        outcome
    }
}

async fn search_one<O: StoreOpener>(
    opener: &O,
    collection: &str,
    query: &[f32],
    limit: usize,
    timeout: Duration,
) -> Result<Vec<SearchHit>, StoreError> {
    let store = opener.open().await?;
    match tokio::time::timeout(timeout, store.search(collection, query, limit)).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Backend(format!(
            "search timed out after {:?}",
            timeout
        ))),
    }
}

fn dedupe_preserving_order(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .filter(|name| seen.insert(name.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::types::SkipReason;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn hit(document: &str, distance: f32) -> SearchHit {
        SearchHit {
            document: document.to_string(),
            metadata: json!({"source": document}),
            distance,
        }
    }

    /// In-memory store: collections either answer with hits or fail.
    #[derive(Clone, Default)]
    struct MockStore {
        collections: Vec<String>,
        hits: HashMap<String, Vec<SearchHit>>,
        failing: Vec<String>,
    }

    impl MockStore {
        fn with_collection(mut self, name: &str, hits: Vec<SearchHit>) -> Self {
            self.collections.push(name.to_string());
            self.hits.insert(name.to_string(), hits);
            self
        }

        fn with_failing(mut self, name: &str) -> Self {
            self.collections.push(name.to_string());
            self.failing.push(name.to_string());
            self
        }
    }

    #[async_trait]
    impl VectorStore for MockStore {
        async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
            Ok(self.collections.clone())
        }

        async fn search(
            &self,
            collection: &str,
            _query: &[f32],
            limit: usize,
        ) -> Result<Vec<SearchHit>, StoreError> {
            if self.failing.iter().any(|name| name == collection) {
                return Err(StoreError::Backend("simulated transport failure".into()));
            }
            match self.hits.get(collection) {
                Some(hits) => {
                    let mut hits = hits.clone();
                    hits.truncate(limit);
                    Ok(hits)
                }
                None => Err(StoreError::CollectionNotFound(collection.to_string())),
            }
        }
    }

    #[derive(Clone)]
    enum OpenPlan {
        Fail(String),
        Store(MockStore),
    }

    /// Hands out scripted stores per open call, falling back to a default
    /// plan once the script runs dry. Counts opens so tests can prove the
    /// sequential strategy re-opened the store.
    struct MockOpener {
        script: Mutex<VecDeque<OpenPlan>>,
        fallback: OpenPlan,
        opens: AtomicUsize,
    }

    impl MockOpener {
        fn always(store: MockStore) -> Self {
            Self {
                script: Mutex::new(VecDeque::new()),
                fallback: OpenPlan::Store(store),
                opens: AtomicUsize::new(0),
            }
        }

        fn scripted(script: Vec<OpenPlan>, fallback: OpenPlan) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback,
                opens: AtomicUsize::new(0),
            }
        }

        fn open_count(&self) -> usize {
            self.opens.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StoreOpener for MockOpener {
        type Store = MockStore;

        async fn open(&self) -> Result<MockStore, StoreError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            let plan = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone());
            match plan {
                OpenPlan::Fail(message) => Err(StoreError::Connection(message)),
                OpenPlan::Store(store) => Ok(store),
            }
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn one_failing_collection_leaves_others_untouched() {
        let store = MockStore::default()
            .with_collection("jazz_packages", vec![hit("weekly", 0.2)])
            .with_failing("propakistani_packages")
            .with_collection("ocr_packages", vec![hit("monthly", 0.4)]);
        let opener = Arc::new(MockOpener::always(store));
        let executor = CollectionQueryExecutor::new(Arc::clone(&opener));

        let outcome = executor
            .query_collections(
                &names(&["jazz_packages", "propakistani_packages", "ocr_packages"]),
                &[1.0, 0.0],
                10,
            )
            .await;

        assert_eq!(outcome.results.len(), 2);
        assert!(outcome.results.contains_key("jazz_packages"));
        assert!(outcome.results.contains_key("ocr_packages"));
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].collection, "propakistani_packages");
        assert!(matches!(outcome.skipped[0].reason, SkipReason::Failed(_)));
    }

    #[tokio::test]
    async fn absent_collection_is_omitted_without_error() {
        let store = MockStore::default()
            .with_collection("jazz_packages", vec![hit("weekly", 0.2)])
            .with_collection("propakistani_packages", vec![hit("scraped", 0.3)]);
        let opener = Arc::new(MockOpener::always(store));
        let executor = CollectionQueryExecutor::new(opener);

        let outcome = executor
            .query_collections(
                &names(&["jazz_packages", "propakistani_packages", "ocr_packages"]),
                &[1.0],
                10,
            )
            .await;

        assert_eq!(outcome.results.len(), 2);
        assert!(!outcome.results.contains_key("ocr_packages"));
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].reason, SkipReason::Absent);
    }

    #[tokio::test]
    async fn empty_parallel_outcome_triggers_sequential_fallback() {
        // Three parallel opens hit a dead connection; the sequential
        // re-open finds a healthy store.
        let healthy = MockStore::default()
            .with_collection("jazz_packages", vec![hit("weekly", 0.1)])
            .with_collection("propakistani_packages", vec![hit("scraped", 0.2)])
            .with_collection("ocr_packages", vec![hit("ocr", 0.3)]);
        let opener = Arc::new(MockOpener::scripted(
            vec![
                OpenPlan::Fail("store offline".into()),
                OpenPlan::Fail("store offline".into()),
                OpenPlan::Fail("store offline".into()),
            ],
            OpenPlan::Store(healthy),
        ));
        let executor = CollectionQueryExecutor::new(Arc::clone(&opener));

        let outcome = executor
            .query_collections(
                &names(&["jazz_packages", "propakistani_packages", "ocr_packages"]),
                &[1.0],
                10,
            )
            .await;

        assert_eq!(outcome.results.len(), 3);
        // 3 parallel opens + 1 sequential re-open
        assert_eq!(opener.open_count(), 4);
    }

    #[tokio::test]
    async fn fallback_with_no_listed_collections_yields_empty_outcome() {
        // Parallel tasks all fail; the sequential pass reaches the store
        // but it lists zero collections.
        let opener = Arc::new(MockOpener::scripted(
            vec![
                OpenPlan::Fail("store offline".into()),
                OpenPlan::Fail("store offline".into()),
                OpenPlan::Fail("store offline".into()),
            ],
            OpenPlan::Store(MockStore::default()),
        ));
        let executor = CollectionQueryExecutor::new(opener);

        let outcome = executor
            .query_collections(
                &names(&["jazz_packages", "propakistani_packages", "ocr_packages"]),
                &[1.0],
                10,
            )
            .await;

        assert!(outcome.is_empty());
        assert_eq!(outcome.skipped.len(), 3);
        assert!(outcome
            .skipped
            .iter()
            .all(|skip| skip.reason == SkipReason::Absent));
    }

    #[tokio::test]
    async fn zero_match_success_does_not_trigger_fallback() {
        let store = MockStore::default().with_collection("jazz_packages", vec![]);
        let opener = Arc::new(MockOpener::always(store));
        let executor = CollectionQueryExecutor::new(Arc::clone(&opener));

        let outcome = executor
            .query_collections(&names(&["jazz_packages"]), &[1.0], 10)
            .await;

        assert_eq!(outcome.results.len(), 1);
        assert!(outcome.results["jazz_packages"].hits.is_empty());
        // One parallel open, no sequential re-open.
        assert_eq!(opener.open_count(), 1);
    }

    #[tokio::test]
    async fn duplicate_names_are_queried_once() {
        let store = MockStore::default().with_collection("jazz_packages", vec![hit("weekly", 0.2)]);
        let opener = Arc::new(MockOpener::always(store));
        let executor = CollectionQueryExecutor::new(Arc::clone(&opener));

        let outcome = executor
            .query_collections(
                &names(&["jazz_packages", "jazz_packages", "jazz_packages"]),
                &[1.0],
                10,
            )
            .await;

        assert_eq!(outcome.results.len(), 1);
        assert_eq!(opener.open_count(), 1);
    }

    #[tokio::test]
    async fn limit_is_forwarded_to_searches() {
        let store = MockStore::default().with_collection(
            "jazz_packages",
            vec![hit("a", 0.1), hit("b", 0.2), hit("c", 0.3)],
        );
        let opener = Arc::new(MockOpener::always(store));
        let executor = CollectionQueryExecutor::new(opener);

        let outcome = executor
            .query_collections(&names(&["jazz_packages"]), &[1.0], 2)
            .await;

        assert_eq!(outcome.results["jazz_packages"].hits.len(), 2);
    }
}
