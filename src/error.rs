//! Pipeline-level error taxonomy.
//!
//! Only failures that abort a run live here. Problems with the analysis tool
//! itself (missing binary, odd exit codes, unparseable output) are recorded
//! inside the [`AnalysisReport`](crate::analysis::AnalysisReport) instead.

use std::path::PathBuf;
use thiserror::Error;

use crate::blob::ManifestError;
use crate::collab::GenerationError;
use crate::pipeline::PipelineStage;

/// Errors that abort a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A manifest path escapes the project root. Raised before anything is written.
    #[error("path traversal rejected: {0}")]
    PathTraversalRejected(#[source] ManifestError),

    /// A manifest path is unusable without escaping the root, e.g. blank.
    #[error("invalid manifest path: {0}")]
    InvalidManifestPath(#[source] ManifestError),

    /// Writing a materialized file failed.
    #[error("materialization failed for {path:?}: {source}")]
    MaterializationFailure {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The temporary project root could not be created.
    #[error("cannot create project root under {dir:?}: {source}")]
    WorkDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("generation timed out after {0}s")]
    GenerationTimeout(u64),

    #[error("run cancelled during {stage}")]
    Cancelled { stage: PipelineStage },

    /// A blocking filesystem task panicked or was shut down.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<ManifestError> for PipelineError {
    fn from(err: ManifestError) -> Self {
        match err {
            ManifestError::Traversal(_) | ManifestError::Absolute(_) => {
                PipelineError::PathTraversalRejected(err)
            }
            ManifestError::Empty(_) => PipelineError::InvalidManifestPath(err),
        }
    }
}

impl PipelineError {
    /// Short machine-readable kind, used in logs and JSON error output.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::PathTraversalRejected(_) => "path_traversal_rejected",
            PipelineError::InvalidManifestPath(_) => "invalid_manifest_path",
            PipelineError::MaterializationFailure { .. } => "materialization_failure",
            PipelineError::WorkDir { .. } => "materialization_failure",
            PipelineError::Generation(_) => "generation_failure",
            PipelineError::GenerationTimeout(_) => "generation_timeout",
            PipelineError::Cancelled { .. } => "cancelled",
            PipelineError::Task(_) => "internal",
        }
    }
}
