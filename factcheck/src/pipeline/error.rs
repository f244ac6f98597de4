//! Error type for a fact-check run.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::AgentError;
use crate::post::InputError;
use crate::tool_source::ToolSourceError;
use crate::verdict::SchemaValidationError;

/// Pipeline step, used in errors and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Transcription,
    Research,
    Extraction,
    Verdict,
}

impl StageId {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::Transcription => "transcription",
            StageId::Research => "research",
            StageId::Extraction => "extraction",
            StageId::Verdict => "verdict",
        }
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why one post's analysis stopped. Extraction failures never appear here; that stage
/// recovers locally.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input error: {0}")]
    Input(#[from] InputError),
    #[error("{stage} model call failed: {source}")]
    Model {
        stage: StageId,
        #[source]
        source: AgentError,
    },
    #[error("search failed: {0}")]
    Search(#[from] ToolSourceError),
    #[error("{0}")]
    SchemaValidation(#[from] SchemaValidationError),
    #[error("fact check timed out after {0:?}")]
    Timeout(Duration),
}

impl PipelineError {
    /// Mapper for `map_err` on a model call made by `stage`.
    pub fn model(stage: StageId) -> impl FnOnce(AgentError) -> PipelineError {
        move |source| PipelineError::Model { stage, source }
    }

    /// Stage the error came from, when it is tied to one.
    pub fn stage(&self) -> Option<StageId> {
        match self {
            PipelineError::Input(_) => Some(StageId::Transcription),
            PipelineError::Model { stage, .. } => Some(*stage),
            PipelineError::Search(_) => Some(StageId::Research),
            PipelineError::SchemaValidation(_) => Some(StageId::Verdict),
            PipelineError::Timeout(_) => None,
        }
    }
}
