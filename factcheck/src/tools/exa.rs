//! Exa web search adapter (`POST /search`).

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::tool_source::{
    web_search_spec, SearchHit, SearchQuery, SearchTool, ToolSourceError, ToolSpec,
    DEFAULT_MAX_RESULTS,
};

/// Tool name offered to the model for Exa search.
pub const TOOL_EXA_WEBSEARCH: &str = "websearch";

const EXA_SEARCH_URL: &str = "https://api.exa.ai/search";
const NUM_RESULTS_MAX: usize = 100;
const SNIPPET_MAX_CHARS: usize = 1500;

/// Request body: auto search type, page text plus highlights (LLM-selected snippets).
fn build_body(query: &str, num_results: usize) -> serde_json::Value {
    json!({
        "query": query,
        "numResults": num_results.min(NUM_RESULTS_MAX),
        "type": "auto",
        "contents": {
            "text": { "maxCharacters": 6000 },
            "highlights": { "maxCharacters": 2000 }
        }
    })
}

/// Snippet for one result: highlights when present, else summary, else truncated text.
fn snippet_of(r: &serde_json::Value) -> String {
    let highlights: Vec<&str> = r
        .get("highlights")
        .and_then(|h| h.as_array())
        .map(|a| {
            a.iter()
                .filter_map(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();
    if !highlights.is_empty() {
        return highlights.join(" ").replace('\n', " ");
    }
    let fallback = r
        .get("summary")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| r.get("text").and_then(|t| t.as_str()))
        .unwrap_or("");
    let (excerpt, cut) = super::truncate_chars(fallback, SNIPPET_MAX_CHARS);
    let excerpt = excerpt.replace('\n', " ");
    if cut {
        format!("{}...", excerpt)
    } else {
        excerpt
    }
}

fn parse_hits(value: &serde_json::Value) -> Vec<SearchHit> {
    value
        .get("results")
        .and_then(|r| r.as_array())
        .map(|v| v.as_slice())
        .unwrap_or(&[])
        .iter()
        .map(|r| SearchHit {
            url: r.get("url").and_then(|u| u.as_str()).unwrap_or("").to_string(),
            title: r
                .get("title")
                .and_then(|t| t.as_str())
                .filter(|t| !t.is_empty())
                .map(String::from),
            snippet: snippet_of(r),
        })
        .collect()
}

/// Web search via Exa (real-time web search).
pub struct ExaSearch {
    client: reqwest::Client,
    api_key: String,
    url: String,
    max_results: usize,
}

impl ExaSearch {
    /// Client for the public API; endpoint can be overridden with `EXA_SEARCH_URL`.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            url: std::env::var("EXA_SEARCH_URL").unwrap_or_else(|_| EXA_SEARCH_URL.to_string()),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    /// Full search endpoint URL (e.g. a local mock server + `/search`).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }
}

#[async_trait]
impl SearchTool for ExaSearch {
    fn spec(&self) -> ToolSpec {
        web_search_spec(
            TOOL_EXA_WEBSEARCH,
            "Search the web using Exa. Use for current events and up-to-date information.",
        )
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, ToolSourceError> {
        let num_results = query.effective_max_results(self.max_results);
        debug!(query = %query.query, num_results, "Exa search");
        let res = self
            .client
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .json(&build_body(&query.query, num_results))
            .send()
            .await
            .map_err(|e| ToolSourceError::Transport(e.to_string()))?;
        let res = super::error_for_status("Exa", res).await?;
        let out: serde_json::Value = res
            .json()
            .await
            .map_err(|e| ToolSourceError::Transport(e.to_string()))?;
        let mut hits = parse_hits(&out);
        hits.truncate(num_results);
        Ok(hits)
    }
}
