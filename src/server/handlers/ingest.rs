use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::ingest::{ingest_sources, IngestSource};
use crate::state::AppState;
use crate::store::{StoreOpener, VectorStore};

/// (Re)run ingestion over every configured data source.
pub async fn run_ingestion(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let base_dir = &state.paths.package_data_dir;
    let sources: Vec<IngestSource> = state
        .config
        .ingest_sources()
        .iter()
        .filter_map(|value| IngestSource::from_value(value, base_dir))
        .collect();

    if sources.is_empty() {
        return Err(ApiError::Configuration(
            "no ingest sources configured".to_string(),
        ));
    }

    let store = state
        .store_opener
        .open()
        .await
        .map_err(ApiError::internal)?;
    let reports = ingest_sources(&store, &sources).await;

    Ok(Json(json!({ "sources": reports })))
}

/// List the collections currently present in the vector store.
pub async fn list_collections(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state
        .store_opener
        .open()
        .await
        .map_err(ApiError::internal)?;
    let collections = store
        .list_collections()
        .await
        .map_err(ApiError::internal)?;

    Ok(Json(json!({ "collections": collections })))
}
