use std::sync::Arc;

use crate::answer::{AnswerComposer, AnswerPipeline, PipelineSettings};
use crate::core::config::{AppPaths, ConfigService};
use crate::core::errors::ApiError;
use crate::embedding::{EmbeddingProvider, HttpEmbeddingProvider};
use crate::llm::{GroqProvider, LlmProvider};
use crate::retrieval::{AugmentationDecider, CollectionQueryExecutor};
use crate::store::SqliteStoreOpener;
use crate::websearch::{DuckDuckGoEngine, SearchEngine, WebSearchAdapter};

/// Global application state shared across all routes.
///
/// Every collaborator is constructed once here and passed by reference;
/// nothing relies on implicit module-level singletons.
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub store_opener: Arc<SqliteStoreOpener>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub pipeline: AnswerPipeline<SqliteStoreOpener>,
}

impl AppState {
    pub async fn initialize() -> Result<Arc<Self>, ApiError> {
        let paths = Arc::new(AppPaths::new());
        let config = ConfigService::new(paths.clone());

        let store_opener = Arc::new(SqliteStoreOpener::new(paths.store_path.clone()));

        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HttpEmbeddingProvider::new(
            config.embedding_base_url(),
            config.embedding_model(),
            config.embedding_timeout(),
        ));

        let engine: Arc<dyn SearchEngine> =
            Arc::new(DuckDuckGoEngine::new(config.web_timeout()));

        let llm: Arc<dyn LlmProvider> = Arc::new(GroqProvider::new(
            config.llm_base_url(),
            config.groq_api_key().unwrap_or_default(),
            config.llm_timeout(),
        ));

        let executor = CollectionQueryExecutor::new(Arc::clone(&store_opener))
            .with_max_parallel(config.max_parallel_queries())
            .with_search_timeout(config.search_timeout());

        let web = WebSearchAdapter::new(
            engine,
            config.official_site(),
            config.aggregator_site(),
            config.search_region(),
            config.search_recency(),
        );

        let composer = AnswerComposer::new(
            llm,
            config.llm_model(),
            config.llm_temperature(),
            config.llm_max_tokens(),
        );

        let pipeline = AnswerPipeline::new(
            PipelineSettings::from_config(&config),
            Arc::clone(&embedder),
            executor,
            AugmentationDecider::new(),
            web,
            composer,
        );

        Ok(Arc::new(AppState {
            paths,
            config,
            store_opener,
            embedder,
            pipeline,
        }))
    }
}
