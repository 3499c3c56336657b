//! Data ingestion into the vector store.

mod loader;

pub use loader::{
    embed_and_persist, ingest_source, ingest_sources, IngestSource, SourceReport,
};
