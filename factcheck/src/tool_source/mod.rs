//! Tool capabilities used by the pipeline: web search and page content extraction.
//!
//! The research stage depends on [`SearchTool`] and the extraction stage on
//! [`ContentExtractor`] instead of a concrete provider. Implementations:
//! [`TavilyClient`](crate::tools::TavilyClient) (both), [`ExaSearch`](crate::tools::ExaSearch)
//! (search), and [`MockSearchTool`] / [`MockExtractor`] for tests.

mod mock;

pub use mock::{MockExtractor, MockSearchTool};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Default bound on results per search call.
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Tool specification offered to the model (name, description, JSON schema for arguments).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
}

/// Errors from calling a tool or extraction provider.
///
/// `NotFound` and `InvalidInput` describe model mistakes and are fed back to the model by the
/// research stage; `Transport` is a provider failure and aborts the run.
#[derive(Debug, Error)]
pub enum ToolSourceError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("invalid arguments: {0}")]
    InvalidInput(String),
    #[error("transport error: {0}")]
    Transport(String),
}

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub snippet: String,
}

impl SearchHit {
    pub fn new(url: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            snippet: snippet.into(),
        }
    }
}

/// Arguments of one search call, as requested by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    pub max_results: Option<usize>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: None,
        }
    }

    /// Parses `{"query": string, "max_results"?: integer}`.
    pub fn from_arguments(args: &Value) -> Result<Self, ToolSourceError> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| ToolSourceError::InvalidInput("missing query".to_string()))?;
        let max_results = args
            .get("max_results")
            .and_then(|v| v.as_u64())
            .map(|n| n as usize);
        Ok(Self {
            query: query.to_string(),
            max_results,
        })
    }

    /// Requested count clamped to `1..=cap`.
    pub fn effective_max_results(&self, cap: usize) -> usize {
        self.max_results.unwrap_or(cap).clamp(1, cap.max(1))
    }
}

/// Spec for a web search tool taking `query` and optional `max_results`.
pub fn web_search_spec(name: &str, description: &str) -> ToolSpec {
    ToolSpec {
        name: name.to_string(),
        description: Some(description.to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Search query." },
                "max_results": { "type": "integer", "description": "Maximum number of results." }
            },
            "required": ["query"]
        }),
    }
}

/// Search capability: `search(query) -> ordered hits`.
#[async_trait]
pub trait SearchTool: Send + Sync {
    /// Spec offered to the model; its `name` is what tool calls must use.
    fn spec(&self) -> ToolSpec;

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, ToolSourceError>;
}

/// Full page text for one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedPage {
    pub url: String,
    pub raw_content: String,
}

/// URL the extractor could not fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedExtraction {
    pub url: String,
    pub error: String,
}

/// Result of one extraction batch. URLs in neither list are treated as failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractResponse {
    pub pages: Vec<ExtractedPage>,
    #[serde(default)]
    pub failed: Vec<FailedExtraction>,
}

/// Content extraction capability: `extract(urls) -> url -> raw text`.
///
/// May fail per URL (reported in [`ExtractResponse::failed`]) or wholesale (`Err`).
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract(&self, urls: &[String]) -> Result<ExtractResponse, ToolSourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_source_error_display_all_variants() {
        let s = ToolSourceError::NotFound("x".into()).to_string();
        assert!(s.contains("not found"), "{}", s);
        let s = ToolSourceError::InvalidInput("bad".into()).to_string();
        assert!(s.contains("invalid"), "{}", s);
        let s = ToolSourceError::Transport("net".into()).to_string();
        assert!(s.contains("transport"), "{}", s);
    }

    #[test]
    fn search_query_parses_query_and_max_results() {
        let q = SearchQuery::from_arguments(&json!({"query": " moon landing ", "max_results": 3}))
            .unwrap();
        assert_eq!(q.query, "moon landing");
        assert_eq!(q.max_results, Some(3));
    }

    #[test]
    fn search_query_rejects_missing_or_blank_query() {
        assert!(matches!(
            SearchQuery::from_arguments(&json!({})),
            Err(ToolSourceError::InvalidInput(_))
        ));
        assert!(matches!(
            SearchQuery::from_arguments(&json!({"query": "   "})),
            Err(ToolSourceError::InvalidInput(_))
        ));
        assert!(matches!(
            SearchQuery::from_arguments(&json!({"query": 42})),
            Err(ToolSourceError::InvalidInput(_))
        ));
    }

    #[test]
    fn effective_max_results_is_clamped() {
        let mut q = SearchQuery::new("x");
        assert_eq!(q.effective_max_results(5), 5);
        q.max_results = Some(50);
        assert_eq!(q.effective_max_results(5), 5);
        q.max_results = Some(0);
        assert_eq!(q.effective_max_results(5), 1);
        q.max_results = Some(2);
        assert_eq!(q.effective_max_results(5), 2);
    }

    #[test]
    fn web_search_spec_requires_query() {
        let spec = web_search_spec("web_search", "Search the web.");
        assert_eq!(spec.name, "web_search");
        assert_eq!(spec.input_schema["required"], json!(["query"]));
    }
}
