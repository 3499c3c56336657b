pub mod answer;
pub mod core;
pub mod embedding;
pub mod ingest;
pub mod llm;
pub mod logging;
pub mod retrieval;
pub mod server;
pub mod state;
pub mod store;
pub mod websearch;
