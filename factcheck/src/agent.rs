//! Agent: a model bound to its instructions, tools, and output schema.
//!
//! Each pipeline stage owns one [`Agent`]. The agent builds the [`LlmRequest`] for a
//! conversation so stages only decide *what* to say, not how the request is assembled.

use std::sync::Arc;

use crate::error::AgentError;
use crate::llm::{LlmClient, LlmRequest, LlmResponse, OutputSchema, ToolChoiceMode};
use crate::message::Message;
use crate::tool_source::ToolSpec;

/// Bound configuration `(model, instructions, tools, output schema)`.
///
/// **Interaction**: Used by the transcription, research and verdict stages; wraps any
/// [`LlmClient`] (`ChatOpenAI` in production, `MockLlm` in tests).
#[derive(Clone)]
pub struct Agent {
    name: String,
    llm: Arc<dyn LlmClient>,
    instructions: String,
    tools: Vec<ToolSpec>,
    output_schema: Option<OutputSchema>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("tools", &self.tools.iter().map(|t| &t.name).collect::<Vec<_>>())
            .field("output_schema", &self.output_schema.as_ref().map(|s| &s.name))
            .finish()
    }
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        llm: Arc<dyn LlmClient>,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            llm,
            instructions: instructions.into(),
            tools: vec![],
            output_schema: None,
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_output_schema(mut self, schema: OutputSchema) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn tools(&self) -> &[ToolSpec] {
        &self.tools
    }

    /// System message (when instructions are non-empty) followed by `conversation`.
    pub fn request(&self, conversation: &[Message]) -> LlmRequest {
        let mut messages = Vec::with_capacity(conversation.len() + 1);
        if !self.instructions.trim().is_empty() {
            messages.push(Message::system(self.instructions.clone()));
        }
        messages.extend(conversation.iter().cloned());
        let mut req = LlmRequest::new(messages).with_tools(self.tools.clone());
        if !self.tools.is_empty() {
            req = req.with_tool_choice(ToolChoiceMode::Auto);
        }
        if let Some(schema) = &self.output_schema {
            req = req.with_output_schema(schema.clone());
        }
        req
    }

    pub async fn invoke(&self, conversation: &[Message]) -> Result<LlmResponse, AgentError> {
        self.llm.invoke(&self.request(conversation)).await
    }

    /// Like [`Agent::invoke`] but the model may not call tools (final answer turn).
    pub async fn invoke_without_tools(
        &self,
        conversation: &[Message],
    ) -> Result<LlmResponse, AgentError> {
        let req = self.request(conversation).with_tool_choice(ToolChoiceMode::None);
        self.llm.invoke(&req).await
    }
}
