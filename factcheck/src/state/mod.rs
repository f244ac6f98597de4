//! Data flowing between pipeline stages.
//!
//! # Main types
//!
//! - [`ToolCall`]: one tool invocation requested by the model; consumed by the research stage.
//! - [`ToolInvocationRecord`]: what actually happened for that call (hits or error); kept for
//!   reporting.
//! - [`ResearchContext`]: accumulated evidence (search snippets, extracted page excerpts), each
//!   tagged with its source URL; built by research and extraction, read by the verdict stage.
//! - [`ToolUsage`]: recorded vs. reported tool counts.

mod research_context;

pub use research_context::{
    normalize_url, ExcerptContent, ResearchContext, SourceExcerpt, SourceSnippet,
    EXTRACTION_UNAVAILABLE_MARKER,
};

use serde::{Deserialize, Serialize};

use crate::tool_source::SearchHit;

/// A single tool invocation produced by the model.
///
/// `arguments` is the raw JSON string from the provider; the research stage parses it when
/// calling the tool. `id` correlates the call with its result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: String,
    pub id: Option<String>,
}

/// Log entry for one tool call the model requested during research.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationRecord {
    /// Provider call id, when the backend supplies one.
    pub call_id: Option<String>,
    /// Tool name as requested by the model.
    pub tool: String,
    /// Parsed arguments (empty object when unparseable).
    pub arguments: serde_json::Value,
    /// Results returned by the tool; empty on error or when nothing matched.
    #[serde(default)]
    pub hits: Vec<SearchHit>,
    /// Set when the call was rejected (unknown tool, invalid arguments).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Tool usage counts exposed to callers.
///
/// `recorded` is always the number of [`ToolInvocationRecord`]s. `reported` may be raised to a
/// floor by [`ToolCountPolicy`](crate::pipeline::ToolCountPolicy); when that happens
/// `used_fallback_count` is true so the two numbers are never confused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolUsage {
    pub recorded: usize,
    pub reported: usize,
    pub used_fallback_count: bool,
}

impl ToolUsage {
    /// Usage where the reported count equals the recorded count.
    pub fn exact(recorded: usize) -> Self {
        Self {
            recorded,
            reported: recorded,
            used_fallback_count: false,
        }
    }
}
