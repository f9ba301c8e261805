//! Pipeline stages.

use serde::{Deserialize, Serialize};

/// The linear states of one pipeline run. `Failed` is terminal and reachable
/// from every other stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Sanitizing,
    Enhancing,
    Generating,
    Materializing,
    Detecting,
    Selecting,
    Analyzing,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Sanitizing => "sanitizing",
            PipelineStage::Enhancing => "enhancing",
            PipelineStage::Generating => "generating",
            PipelineStage::Materializing => "materializing",
            PipelineStage::Detecting => "detecting",
            PipelineStage::Selecting => "selecting",
            PipelineStage::Analyzing => "analyzing",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        }
    }

    /// The stage that follows this one on the success path.
    pub fn next(&self) -> Option<PipelineStage> {
        match self {
            PipelineStage::Sanitizing => Some(PipelineStage::Enhancing),
            PipelineStage::Enhancing => Some(PipelineStage::Generating),
            PipelineStage::Generating => Some(PipelineStage::Materializing),
            PipelineStage::Materializing => Some(PipelineStage::Detecting),
            PipelineStage::Detecting => Some(PipelineStage::Selecting),
            PipelineStage::Selecting => Some(PipelineStage::Analyzing),
            PipelineStage::Analyzing => Some(PipelineStage::Done),
            PipelineStage::Done | PipelineStage::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed)
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
