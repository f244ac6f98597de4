//! Verdict: one schema-constrained model call over everything research gathered.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::agent::Agent;
use crate::llm::LlmClient;
use crate::message::Message;
use crate::state::ResearchContext;
use crate::verdict::{SourcePolicy, Verdict};

use super::{PipelineError, Stage, StageId};

/// Evidence handed to the verdict model.
#[derive(Debug, Clone, PartialEq)]
pub struct VerdictInput {
    pub transcription: String,
    pub narrative: String,
    pub context: ResearchContext,
}

/// Single user message for the verdict call.
///
/// The narrative section is omitted when research produced no text.
pub fn build_verdict_prompt(input: &VerdictInput) -> String {
    let mut prompt = format!("Post content to fact check:\n{}\n\n", input.transcription);
    if !input.narrative.trim().is_empty() {
        prompt.push_str(&format!("Research analysis:\n{}\n\n", input.narrative.trim()));
    }
    prompt.push_str(&format!(
        "Web search results:\n{}\n\n",
        input.context.render_search_results()
    ));
    prompt.push_str(&format!(
        "Extracted full content from sources:\n{}\n\n",
        input.context.render_extracted_content()
    ));
    prompt.push_str(
        "Please analyze whether this post is fake news or legitimate based on the search results and extracted content.",
    );
    prompt
}

pub struct VerdictStage {
    agent: Agent,
    source_policy: SourcePolicy,
}

impl VerdictStage {
    pub fn new(llm: Arc<dyn LlmClient>, instructions: impl Into<String>) -> Self {
        Self {
            agent: Agent::new("verdict_agent", llm, instructions)
                .with_output_schema(Verdict::output_schema()),
            source_policy: SourcePolicy::default(),
        }
    }

    pub fn with_source_policy(mut self, policy: SourcePolicy) -> Self {
        self.source_policy = policy;
        self
    }
}

#[async_trait]
impl Stage for VerdictStage {
    type Input = VerdictInput;
    type Output = Verdict;

    fn id(&self) -> StageId {
        StageId::Verdict
    }

    async fn run(&self, input: VerdictInput) -> Result<Verdict, PipelineError> {
        let prompt = build_verdict_prompt(&input);
        trace!(prompt = %prompt, "verdict prompt");
        let response = self
            .agent
            .invoke(&[Message::user(prompt)])
            .await
            .map_err(PipelineError::model(StageId::Verdict))?;

        let mut verdict = match &response.structured {
            Some(value) => Verdict::from_value(value)?,
            None => Verdict::from_text(&response.content)?,
        };
        let dropped = self.source_policy.apply(&mut verdict, &input.context);
        debug!(
            is_fake = verdict.is_fake,
            sources = verdict.sources.len(),
            dropped = dropped.len(),
            "verdict parsed"
        );
        Ok(verdict)
    }
}
