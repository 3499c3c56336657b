//! Ingestion — load persisted (embeddings, texts) pairs into collections.
//!
//! Each data source persists two JSON files: an array of package texts and
//! an array of embedding vectors, index-aligned. Loading inserts them into
//! the named collection with `{text, source}` metadata. `embed_and_persist`
//! regenerates a pair from raw package records via the embedding provider.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::embedding::EmbeddingProvider;
use crate::store::SqliteVectorStore;

/// One configured data source.
#[derive(Debug, Clone)]
pub struct IngestSource {
    pub collection: String,
    pub embeddings_file: PathBuf,
    pub texts_file: PathBuf,
}

impl IngestSource {
    /// Parse a source entry from configuration; file names resolve
    /// relative to `base_dir`.
    pub fn from_value(value: &Value, base_dir: &Path) -> Option<Self> {
        let collection = value.get("collection")?.as_str()?.to_string();
        let embeddings_file = base_dir.join(value.get("embeddings_file")?.as_str()?);
        let texts_file = base_dir.join(value.get("texts_file")?.as_str()?);
        Some(Self {
            collection,
            embeddings_file,
            texts_file,
        })
    }
}

/// Outcome of ingesting one source.
#[derive(Debug, Serialize)]
pub struct SourceReport {
    pub collection: String,
    pub ingested: usize,
    pub error: Option<String>,
}

/// Ingest every source, tolerating per-source failures.
pub async fn ingest_sources(
    store: &SqliteVectorStore,
    sources: &[IngestSource],
) -> Vec<SourceReport> {
    let mut reports = Vec::with_capacity(sources.len());

    for source in sources {
        match ingest_source(store, source).await {
            Ok(count) => {
                tracing::info!(
                    "Ingested {} documents into collection '{}'",
                    count,
                    source.collection
                );
                reports.push(SourceReport {
                    collection: source.collection.clone(),
                    ingested: count,
                    error: None,
                });
            }
            Err(err) => {
                tracing::warn!("Error ingesting {}: {}", source.collection, err);
                reports.push(SourceReport {
                    collection: source.collection.clone(),
                    ingested: 0,
                    error: Some(err.to_string()),
                });
            }
        }
    }

    reports
}

/// Load one (embeddings, texts) pair into its collection.
pub async fn ingest_source(
    store: &SqliteVectorStore,
    source: &IngestSource,
) -> Result<usize, ApiError> {
    let texts = read_json_file(&source.texts_file)?;
    let texts: Vec<String> =
        serde_json::from_value(texts).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let embeddings = read_json_file(&source.embeddings_file)?;
    let embeddings: Vec<Vec<f32>> =
        serde_json::from_value(embeddings).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    if texts.len() != embeddings.len() {
        return Err(ApiError::BadRequest(format!(
            "{}: {} texts but {} embeddings",
            source.collection,
            texts.len(),
            embeddings.len()
        )));
    }

    let items = texts
        .into_iter()
        .zip(embeddings)
        .enumerate()
        .map(|(i, (text, embedding))| {
            let metadata = json!({"text": text, "source": source.collection});
            (
                format!("{}_{}", source.collection, i),
                text,
                metadata,
                embedding,
            )
        })
        .collect();

    store
        .insert_batch(&source.collection, items)
        .await
        .map_err(ApiError::internal)
}

/// Embed raw package records and persist the (embeddings, texts) pair.
///
/// `packages_file` holds an array of package objects with Name,
/// Description, Validity, Price and Activation Code fields.
pub async fn embed_and_persist(
    embedder: &dyn EmbeddingProvider,
    packages_file: &Path,
    texts_file: &Path,
    embeddings_file: &Path,
) -> Result<usize, ApiError> {
    let packages = read_json_file(packages_file)?;
    let packages = packages
        .as_array()
        .ok_or_else(|| ApiError::BadRequest("packages file must hold an array".to_string()))?;

    let texts: Vec<String> = packages.iter().map(package_to_text).collect();
    if texts.is_empty() {
        return Err(ApiError::BadRequest("no packages to embed".to_string()));
    }

    let embeddings = embedder.embed(&texts).await?;

    write_json_file(texts_file, &json!(texts))?;
    write_json_file(embeddings_file, &json!(embeddings))?;

    tracing::info!(
        "Embedded {} package texts into {}",
        texts.len(),
        embeddings_file.display()
    );
    Ok(texts.len())
}

/// Flatten one package record into the text that gets embedded.
fn package_to_text(package: &Value) -> String {
    let field = |key: &str| {
        package
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string()
    };

    format!(
        "{}. {} Validity: {}. Price: {}. Activation Code: {}",
        field("Name"),
        field("Description"),
        field("Validity"),
        field("Price"),
        field("Activation Code"),
    )
}

fn read_json_file(path: &Path) -> Result<Value, ApiError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| ApiError::NotFound(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&contents).map_err(|e| ApiError::BadRequest(e.to_string()))
}

fn write_json_file(path: &Path, value: &Value) -> Result<(), ApiError> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let contents =
        serde_json::to_string_pretty(value).map_err(ApiError::internal)?;
    fs::write(path, contents).map_err(ApiError::internal)
}
