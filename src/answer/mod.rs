//! Prompt composition and the end-to-end answer pipeline.

mod composer;
mod pipeline;

pub use composer::AnswerComposer;
pub use pipeline::{AnswerPipeline, PipelineSettings, NO_RESULTS_MESSAGE};
