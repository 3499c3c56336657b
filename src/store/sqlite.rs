//! SQLite-backed vector store.
//!
//! Stores package chunks per named collection in SQLite, with serialized
//! embeddings for brute-force cosine-distance search. No external server
//! required; one file holds every collection.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::client::{SearchHit, StoreError, StoreOpener, VectorStore};

/// SQLite-backed implementation of [`VectorStore`].
///
/// Collections are rows in a `collections` table; chunk text, metadata and
/// embedding blobs live in `package_chunks` keyed by collection name.
pub struct SqliteVectorStore {
    pool: SqlitePool,
    #[allow(dead_code)]
    db_path: PathBuf,
}

impl SqliteVectorStore {
    pub async fn with_path(db_path: PathBuf) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let store = Self { pool, db_path };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS package_chunks (
                chunk_id TEXT PRIMARY KEY,
                collection TEXT NOT NULL,
                document TEXT NOT NULL,
                metadata TEXT DEFAULT '{}',
                embedding BLOB,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_collection ON package_chunks(collection)")
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        Ok(())
    }

    /// Create the collection row if it does not exist yet.
    pub async fn create_collection(&self, name: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT OR IGNORE INTO collections (name) VALUES (?1)")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        Ok(())
    }

    /// Insert chunks into `collection` in one transaction. Existing chunk
    /// ids are replaced, so re-running ingestion refreshes the data.
    pub async fn insert_batch(
        &self,
        collection: &str,
        items: Vec<(String, String, Value, Vec<f32>)>,
    ) -> Result<usize, StoreError> {
        self.create_collection(collection).await?;
        if items.is_empty() {
            return Ok(0);
        }

        let count = items.len();
        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;

        for (chunk_id, document, metadata, embedding) in &items {
            let blob = serialize_embedding(embedding);
            let metadata_str = serde_json::to_string(metadata).unwrap_or_else(|_| "{}".to_string());

            sqlx::query(
                "INSERT OR REPLACE INTO package_chunks (chunk_id, collection, document, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(chunk_id)
            .bind(collection)
            .bind(document)
            .bind(&metadata_str)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::backend)?;
        }

        tx.commit().await.map_err(StoreError::backend)?;
        tracing::debug!("Inserted {} chunks into collection '{}'", count, collection);
        Ok(count)
    }

    /// Chunk count, optionally for a single collection.
    pub async fn count(&self, collection: Option<&str>) -> Result<usize, StoreError> {
        let count: i64 = if let Some(name) = collection {
            sqlx::query_scalar("SELECT COUNT(*) FROM package_chunks WHERE collection = ?1")
                .bind(name)
                .fetch_one(&self.pool)
                .await
                .map_err(StoreError::backend)?
        } else {
            sqlx::query_scalar("SELECT COUNT(*) FROM package_chunks")
                .fetch_one(&self.pool)
                .await
                .map_err(StoreError::backend)?
        };

        Ok(count as usize)
    }

    async fn collection_exists(&self, name: &str) -> Result<bool, StoreError> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM collections WHERE name = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        Ok(found.is_some())
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query("SELECT name FROM collections ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        Ok(rows.iter().map(|row| row.get("name")).collect())
    }

    async fn search(
        &self,
        collection: &str,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>, StoreError> {
        if !self.collection_exists(collection).await? {
            return Err(StoreError::CollectionNotFound(collection.to_string()));
        }

        let rows = sqlx::query(
            "SELECT document, metadata, embedding FROM package_chunks WHERE collection = ?1",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        let mut hits: Vec<SearchHit> = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                if embedding_bytes.is_empty() {
                    return None;
                }
                let stored = deserialize_embedding(&embedding_bytes);
                let distance = cosine_distance(query, &stored);

                let metadata_str: String = row.get("metadata");
                let metadata =
                    serde_json::from_str(&metadata_str).unwrap_or(Value::Object(Default::default()));

                Some(SearchHit {
                    document: row.get("document"),
                    metadata,
                    distance,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);

        Ok(hits)
    }
}

/// Factory opening a fresh pool per handle; concurrent search tasks never
/// share a handle.
#[derive(Clone)]
pub struct SqliteStoreOpener {
    db_path: PathBuf,
}

impl SqliteStoreOpener {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }
}

#[async_trait]
impl StoreOpener for SqliteStoreOpener {
    type Store = SqliteVectorStore;

    async fn open(&self) -> Result<SqliteVectorStore, StoreError> {
        SqliteVectorStore::with_path(self.db_path.clone()).await
    }
}

/// Serialize an embedding to little-endian f32 bytes.
fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine distance (1 - cosine similarity); lower = closer. Mismatched or
/// degenerate vectors score as maximally distant rather than erroring.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        1.0
    } else {
        (1.0 - dot / denom).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn test_store() -> SqliteVectorStore {
        let tmp = std::env::temp_dir().join(format!("jazzbot-store-test-{}.db", uuid::Uuid::new_v4()));
        SqliteVectorStore::with_path(tmp).await.unwrap()
    }

    #[tokio::test]
    async fn insert_and_search_orders_by_distance() {
        let store = test_store().await;

        store
            .insert_batch(
                "jazz_packages",
                vec![
                    (
                        "jazz_packages_0".to_string(),
                        "Weekly internet bundle".to_string(),
                        json!({"source": "jazz_packages"}),
                        vec![1.0, 0.0],
                    ),
                    (
                        "jazz_packages_1".to_string(),
                        "Monthly SMS bundle".to_string(),
                        json!({"source": "jazz_packages"}),
                        vec![0.0, 1.0],
                    ),
                ],
            )
            .await
            .unwrap();

        let hits = store.search("jazz_packages", &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document, "Weekly internet bundle");
        assert!(hits[0].distance < hits[1].distance);
        assert!(hits[0].distance < 0.01);
    }

    #[tokio::test]
    async fn search_limit_truncates() {
        let store = test_store().await;

        let items = (0..5)
            .map(|i| {
                (
                    format!("ocr_packages_{i}"),
                    format!("package {i}"),
                    json!({"source": "ocr_packages"}),
                    vec![1.0, i as f32 * 0.1],
                )
            })
            .collect();
        store.insert_batch("ocr_packages", items).await.unwrap();

        let hits = store.search("ocr_packages", &[1.0, 0.0], 3).await.unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[tokio::test]
    async fn missing_collection_is_not_found() {
        let store = test_store().await;
        let err = store.search("nope", &[1.0], 10).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn list_collections_reports_created() {
        let store = test_store().await;
        store.create_collection("propakistani_packages").await.unwrap();
        store.create_collection("jazz_packages").await.unwrap();

        let names = store.list_collections().await.unwrap();
        assert_eq!(names, vec!["jazz_packages", "propakistani_packages"]);
    }

    #[tokio::test]
    async fn reingest_replaces_existing_chunks() {
        let store = test_store().await;

        let item = |text: &str| {
            vec![(
                "jazz_packages_0".to_string(),
                text.to_string(),
                json!({"source": "jazz_packages"}),
                vec![1.0],
            )]
        };

        store.insert_batch("jazz_packages", item("old")).await.unwrap();
        store.insert_batch("jazz_packages", item("new")).await.unwrap();

        assert_eq!(store.count(Some("jazz_packages")).await.unwrap(), 1);
        let hits = store.search("jazz_packages", &[1.0], 10).await.unwrap();
        assert_eq!(hits[0].document, "new");
    }
}
