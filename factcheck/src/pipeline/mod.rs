//! Fact-check pipeline: typed stages composed by [`FactChecker`].
//!
//! Per post the stages run strictly in order:
//! transcription → research → extraction (optional) → verdict.
//!
//! # Main types
//!
//! - [`Stage`]: one step with typed input and output; each is testable on its own with mock
//!   backends.
//! - [`TranscriptionStage`], [`ResearchStage`], [`ExtractionStage`], [`VerdictStage`].
//! - [`FactChecker`]: runs the stages for one or many posts and aggregates tool usage.
//! - [`PipelineError`]: why a post's analysis stopped.

mod error;
mod extract;
mod orchestrator;
mod research;
mod transcribe;
mod verdict_step;

pub use error::{PipelineError, StageId};
pub use extract::{ExtractionStage, EXTRACTION_FAILED_NOTE};
pub use orchestrator::{
    BuildError, FactCheckOutcome, FactChecker, FactCheckerBuilder, ToolCountPolicy,
};
pub use research::{render_hits, ResearchOutput, ResearchStage};
pub use transcribe::{Transcription, TranscriptionStage};
pub use verdict_step::{build_verdict_prompt, VerdictInput, VerdictStage};

use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::post::PostReference;

/// One pipeline step.
///
/// **Interaction**: Implemented by the four stages; called through [`run_stage`] by
/// [`FactChecker`] so every step gets the same start/complete/error logging.
#[async_trait]
pub trait Stage: Send + Sync {
    type Input: Send + 'static;
    type Output: Send + 'static;

    fn id(&self) -> StageId;

    async fn run(&self, input: Self::Input) -> Result<Self::Output, PipelineError>;
}

/// Runs `stage` with tracing around it.
pub async fn run_stage<S: Stage>(
    stage: &S,
    post: &PostReference,
    input: S::Input,
) -> Result<S::Output, PipelineError> {
    let id = stage.id();
    let started = Instant::now();
    debug!(stage = %id, post = %post, "stage start");
    match stage.run(input).await {
        Ok(out) => {
            debug!(
                stage = %id,
                post = %post,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "stage complete"
            );
            Ok(out)
        }
        Err(e) => {
            warn!(
                stage = %id,
                post = %post,
                elapsed_ms = started.elapsed().as_millis() as u64,
                error = %e,
                "stage failed"
            );
            Err(e)
        }
    }
}
