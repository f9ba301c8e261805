//! The end-to-end pipeline: prompt in, generated code and security report out.

mod orchestrator;
mod response;
mod stage;

pub use orchestrator::{finalize_blob, Pipeline, EMPTY_BLOB_SENTINEL};
pub use response::{Decision, PipelineReport, PipelineResponse};
pub use stage::PipelineStage;
