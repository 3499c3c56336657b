//! Multi-collection retrieval pipeline.
//!
//! This module is the core of the backend:
//! - `CollectionQueryExecutor`: concurrent fan-out over named collections
//!   with a sequential fallback
//! - `fuse`: global distance-ranked merge of per-collection results
//! - `AugmentationDecider`: when to supplement local results with live
//!   web search

mod augment;
mod executor;
mod fusion;
mod types;

pub use augment::AugmentationDecider;
pub use executor::{CollectionQueryExecutor, DEFAULT_RESULT_LIMIT};
pub use fusion::{fuse, FusedLengthMismatch, FusedResults};
pub use types::{CollectionHits, CollectionSkip, RetrievalOutcome, SkipReason};
