//! Live web search for package information.

mod adapter;
mod engine;

pub use adapter::{format_web_results, WebResult, WebSearchAdapter};
pub use engine::{DuckDuckGoEngine, EngineHit, SearchEngine};
