//! Model invocation capability.
//!
//! Every stage talks to a model through [`LlmClient`]; the request carries the messages plus
//! whatever the stage needs from the model: tools it may call, or a schema its output must
//! follow. Implementations: [`MockLlm`] (scripted, for tests) and [`ChatOpenAI`] (OpenAI
//! Chat Completions or any compatible endpoint).

mod mock;
mod openai;

pub use mock::{MockLlm, MockReply};
pub use openai::ChatOpenAI;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AgentError;
use crate::message::Message;
use crate::state::ToolCall;
use crate::tool_source::ToolSpec;

/// Tool choice mode for chat completions: when tools are present, controls whether
/// the model may choose (auto), must not use (none), or must use (required).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ToolChoiceMode {
    /// Model can pick between message or tool calls. Default when tools are present.
    #[default]
    Auto,
    /// Model will not call any tool.
    None,
    /// Model must call one or more tools.
    Required,
}

impl std::str::FromStr for ToolChoiceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "none" => Ok(Self::None),
            "required" => Ok(Self::Required),
            _ => Err(format!(
                "unknown tool_choice: {} (use auto, none, or required)",
                s
            )),
        }
    }
}

/// Fixed output shape the model must follow (JSON schema).
#[derive(Clone, Debug, PartialEq)]
pub struct OutputSchema {
    /// Schema name sent to the provider (e.g. `verdict`).
    pub name: String,
    pub description: Option<String>,
    pub schema: Value,
    /// Ask the provider for strict schema adherence when supported.
    pub strict: bool,
}

/// Token usage for one call (prompt + completion).
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LlmUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// One model call.
#[derive(Clone, Debug, Default)]
pub struct LlmRequest {
    pub messages: Vec<Message>,
    /// Tools the model may request; empty means plain-text mode.
    pub tools: Vec<ToolSpec>,
    /// Overrides the provider default when tools are present.
    pub tool_choice: Option<ToolChoiceMode>,
    /// When set, the model output must follow this schema.
    pub output_schema: Option<OutputSchema>,
}

impl LlmRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_tool_choice(mut self, mode: ToolChoiceMode) -> Self {
        self.tool_choice = Some(mode);
        self
    }

    pub fn with_output_schema(mut self, schema: OutputSchema) -> Self {
        self.output_schema = Some(schema);
        self
    }
}

/// Response from one call: assistant text, tool calls, and (schema mode) the parsed value.
#[derive(Clone, Debug, Default)]
pub struct LlmResponse {
    /// Assistant message content (plain text).
    pub content: String,
    /// Tool calls from this turn; empty means the model answered directly.
    pub tool_calls: Vec<ToolCall>,
    /// Structured value when the backend parsed schema-constrained output itself.
    /// When `None` in schema mode, callers parse `content`.
    pub structured: Option<Value>,
    pub usage: Option<LlmUsage>,
}

/// Model invocation capability: `invoke(request) -> response`.
///
/// Each call is independent; the implementation keeps no conversation state between calls.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn invoke(&self, request: &LlmRequest) -> Result<LlmResponse, AgentError>;
}
