//! Research: a tool-calling loop over the web search capability.
//!
//! Each round the model either answers (the narrative) or requests searches. Requested
//! searches run in order; each becomes a [`ToolInvocationRecord`], its hits join the
//! [`ResearchContext`], and the rendered result goes back to the model as
//! `Tool <name> returned: ...`. After `max_tool_rounds` rounds with tool calls, one last call
//! with tools disabled produces the narrative.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::agent::Agent;
use crate::llm::LlmClient;
use crate::message::Message;
use crate::state::{ResearchContext, ToolCall, ToolInvocationRecord};
use crate::tool_source::{SearchHit, SearchQuery, SearchTool, ToolSourceError};

use super::{PipelineError, Stage, StageId, Transcription};

const PAYLOAD_PREVIEW_CHARS: usize = 300;

/// What research produced for one post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchOutput {
    pub transcription: Transcription,
    pub narrative: String,
    pub context: ResearchContext,
    pub invocations: Vec<ToolInvocationRecord>,
}

/// Hits as the JSON list a search tool returns (`[{"url", "title", "content"}]`).
pub fn render_hits(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No results found.".to_string();
    }
    let items: Vec<Value> = hits
        .iter()
        .map(|h| {
            serde_json::json!({
                "url": h.url,
                "title": h.title,
                "content": h.snippet,
            })
        })
        .collect();
    Value::Array(items).to_string()
}

/// Research step: model + search tool + round bound.
pub struct ResearchStage {
    agent: Agent,
    search: Arc<dyn SearchTool>,
    max_tool_rounds: usize,
}

/// Outcome of one requested call that did not fail the run.
struct Executed {
    record: ToolInvocationRecord,
    feedback: String,
}

impl ResearchStage {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        instructions: impl Into<String>,
        search: Arc<dyn SearchTool>,
    ) -> Self {
        let agent = Agent::new("research_agent", llm, instructions).with_tools(vec![search.spec()]);
        Self {
            agent,
            search,
            max_tool_rounds: crate::config::DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    /// Upper bound on rounds that execute tool calls (at least 1).
    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds.max(1);
        self
    }

    fn rejected(call: &ToolCall, arguments: Value, error: String) -> Executed {
        warn!(tool = %call.name, error = %error, "tool call rejected");
        Executed {
            feedback: format!("Error: {}", error),
            record: ToolInvocationRecord {
                call_id: call.id.clone(),
                tool: call.name.clone(),
                arguments,
                hits: vec![],
                error: Some(error),
            },
        }
    }

    /// Model mistakes are recorded and fed back; search failures end the run.
    async fn execute(&self, call: &ToolCall) -> Result<Executed, PipelineError> {
        let tool_name = self.search.spec().name;
        if call.name != tool_name {
            let args = serde_json::from_str(&call.arguments)
                .unwrap_or_else(|_| Value::Object(Default::default()));
            return Ok(Self::rejected(
                call,
                args,
                format!("unknown tool {} (available: {})", call.name, tool_name),
            ));
        }
        let arguments: Value = match serde_json::from_str(&call.arguments) {
            Ok(v) => v,
            Err(e) => {
                return Ok(Self::rejected(
                    call,
                    Value::Object(Default::default()),
                    format!("arguments are not valid JSON: {}", e),
                ))
            }
        };
        let query = match SearchQuery::from_arguments(&arguments) {
            Ok(q) => q,
            Err(ToolSourceError::InvalidInput(msg)) => {
                return Ok(Self::rejected(call, arguments, format!("invalid arguments: {}", msg)))
            }
            Err(e) => return Err(PipelineError::Search(e)),
        };

        let hits = self.search.search(&query).await?;
        debug!(tool = %call.name, query = %query.query, hits = hits.len(), "search executed");
        let feedback = render_hits(&hits);
        trace!(
            tool = %call.name,
            payload = %crate::tools::truncate_chars(&feedback, PAYLOAD_PREVIEW_CHARS).0,
            "search payload"
        );
        Ok(Executed {
            feedback,
            record: ToolInvocationRecord {
                call_id: call.id.clone(),
                tool: call.name.clone(),
                arguments,
                hits,
                error: None,
            },
        })
    }
}

#[async_trait]
impl Stage for ResearchStage {
    type Input = Transcription;
    type Output = ResearchOutput;

    fn id(&self) -> StageId {
        StageId::Research
    }

    async fn run(&self, transcription: Transcription) -> Result<ResearchOutput, PipelineError> {
        let mut conversation = vec![Message::user(transcription.text.clone())];
        let mut context = ResearchContext::new();
        let mut invocations = Vec::new();

        for round in 0..self.max_tool_rounds {
            let response = self
                .agent
                .invoke(&conversation)
                .await
                .map_err(PipelineError::model(StageId::Research))?;
            if response.tool_calls.is_empty() {
                return Ok(ResearchOutput {
                    transcription,
                    narrative: response.content,
                    context,
                    invocations,
                });
            }
            debug!(round, tool_calls = response.tool_calls.len(), "research round");
            if !response.content.trim().is_empty() {
                conversation.push(Message::assistant(response.content));
            }
            for call in &response.tool_calls {
                let executed = self.execute(call).await?;
                context.add_hits(&executed.record.hits);
                conversation.push(Message::user(format!(
                    "Tool {} returned: {}",
                    call.name, executed.feedback
                )));
                invocations.push(executed.record);
            }
        }

        debug!(
            rounds = self.max_tool_rounds,
            "tool round limit reached, requesting final answer"
        );
        let response = self
            .agent
            .invoke_without_tools(&conversation)
            .await
            .map_err(PipelineError::model(StageId::Research))?;
        if !response.tool_calls.is_empty() {
            warn!(
                ignored = response.tool_calls.len(),
                "model requested tools after the round limit"
            );
        }
        Ok(ResearchOutput {
            transcription,
            narrative: response.content,
            context,
            invocations,
        })
    }
}
