//! The pipeline's output document.

use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisReport;

/// What the pipeline decided to hand back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// Generated code is returned as-is together with the report.
    #[serde(rename = "CODE_ONLY")]
    CodeOnly,
}

/// Report section of a [`PipelineResponse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub policy_version: String,
    pub prompt_after_enhancement: String,
    pub semgrep: AnalysisReport,
}

/// Result of one successful pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResponse {
    /// The generated blob, trimmed, exactly as analyzed.
    pub code: String,
    pub report: PipelineReport,
    pub decision: Decision,
}
