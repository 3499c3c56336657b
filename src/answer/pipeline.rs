//! The request pipeline: embed → retrieve → fuse → decide → (web) → compose.

use std::sync::Arc;

use crate::core::config::ConfigService;
use crate::core::errors::ApiError;
use crate::embedding::EmbeddingProvider;
use crate::retrieval::{fuse, AugmentationDecider, CollectionQueryExecutor, FusedResults};
use crate::store::StoreOpener;
use crate::websearch::{format_web_results, WebSearchAdapter};

use super::composer::AnswerComposer;

pub const NO_RESULTS_MESSAGE: &str = "No relevant information found for your query.";

/// Per-request knobs resolved once from configuration.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub collections: Vec<String>,
    pub result_limit: usize,
    pub web_max_results: usize,
    /// Whether the LLM credential is available; checked before any network
    /// call is made on behalf of the request.
    pub credential_ok: bool,
}

impl PipelineSettings {
    pub fn from_config(config: &ConfigService) -> Self {
        Self {
            collections: config.collections(),
            result_limit: config.result_limit(),
            web_max_results: config.web_max_results(),
            credential_ok: config.groq_api_key().is_some(),
        }
    }
}

/// Answers one user query end to end.
///
/// All collaborators are explicit service objects handed in at
/// construction; the pipeline holds no global state.
pub struct AnswerPipeline<O: StoreOpener + 'static> {
    settings: PipelineSettings,
    embedder: Arc<dyn EmbeddingProvider>,
    executor: CollectionQueryExecutor<O>,
    decider: AugmentationDecider,
    web: WebSearchAdapter,
    composer: AnswerComposer,
}

impl<O: StoreOpener + 'static> AnswerPipeline<O> {
    pub fn new(
        settings: PipelineSettings,
        embedder: Arc<dyn EmbeddingProvider>,
        executor: CollectionQueryExecutor<O>,
        decider: AugmentationDecider,
        web: WebSearchAdapter,
        composer: AnswerComposer,
    ) -> Self {
        Self {
            settings,
            embedder,
            executor,
            decider,
            web,
            composer,
        }
    }

    /// Produce the answer for `query`.
    ///
    /// Only two outcomes are errors: a blank query and a missing
    /// credential. Every retrieval-side failure degrades — ultimately to
    /// the plain no-results message.
    pub async fn answer(&self, query: &str) -> Result<String, ApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ApiError::BadRequest("query must not be empty".to_string()));
        }
        if !self.settings.credential_ok {
            return Err(ApiError::Configuration(
                "GROQ_API_KEY is not set".to_string(),
            ));
        }

        let fused = self.retrieve(query).await;

        let augment = self.decider.should_augment(query, &fused);
        let web_results = if augment {
            self.web
                .search_packages(query, self.settings.web_max_results)
                .await
        } else {
            Vec::new()
        };

        if fused.is_empty() && web_results.is_empty() {
            tracing::info!("No local or online results for query");
            return Ok(NO_RESULTS_MESSAGE.to_string());
        }

        let web_section = if augment {
            Some(format_web_results(&web_results))
        } else {
            None
        };

        Ok(self
            .composer
            .answer(query, &fused, web_section.as_deref())
            .await)
    }

    async fn retrieve(&self, query: &str) -> FusedResults {
        let vector = match self.embedder.embed_one(query).await {
            Ok(vector) => vector,
            Err(err) => {
                tracing::warn!("Query embedding failed, skipping local retrieval: {}", err);
                return FusedResults::default();
            }
        };

        let outcome = self
            .executor
            .query_collections(
                &self.settings.collections,
                &vector,
                self.settings.result_limit,
            )
            .await;

        for skip in &outcome.skipped {
            tracing::debug!("Collection '{}' skipped: {:?}", skip.collection, skip.reason);
        }

        fuse(outcome.hits_in_order(&self.settings.collections))
    }
}
