//! Tavily adapter: web search (`/search`) and page extraction (`/extract`).
//!
//! One client serves both capabilities, so the research and extraction stages can share a
//! key and HTTP connection pool.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::tool_source::{
    web_search_spec, ContentExtractor, ExtractResponse, ExtractedPage, FailedExtraction,
    SearchHit, SearchQuery, SearchTool, ToolSourceError, ToolSpec, DEFAULT_MAX_RESULTS,
};

/// Tool name offered to the model for Tavily search.
pub const TOOL_TAVILY_SEARCH: &str = "tavily_search_results_json";

const TAVILY_BASE_URL: &str = "https://api.tavily.com";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ExtractApiResponse {
    #[serde(default)]
    results: Vec<ExtractResult>,
    #[serde(default)]
    failed_results: Vec<ExtractFailure>,
}

#[derive(Debug, Deserialize)]
struct ExtractResult {
    url: String,
    #[serde(default)]
    raw_content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExtractFailure {
    url: String,
    #[serde(default)]
    error: Option<String>,
}

/// Tavily search + extract client.
pub struct TavilyClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    max_results: usize,
    search_depth: String,
}

impl TavilyClient {
    /// Client for the public API; base URL can be overridden with `TAVILY_BASE_URL`.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: std::env::var("TAVILY_BASE_URL")
                .unwrap_or_else(|_| TAVILY_BASE_URL.to_string()),
            max_results: DEFAULT_MAX_RESULTS,
            search_depth: "advanced".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Cap on results per search (default 5).
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    /// Reuse a configured client (timeouts, proxies).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    async fn post(
        &self,
        endpoint: &str,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, ToolSourceError> {
        let res = self
            .client
            .post(format!("{}/{}", self.base_url, endpoint))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolSourceError::Transport(e.to_string()))?;
        super::error_for_status("Tavily", res).await
    }
}

#[async_trait]
impl SearchTool for TavilyClient {
    fn spec(&self) -> ToolSpec {
        web_search_spec(
            TOOL_TAVILY_SEARCH,
            "A search engine optimized for comprehensive, accurate, and trusted results. \
             Useful for answering questions about current events. Input should be a search query.",
        )
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, ToolSourceError> {
        let max_results = query.effective_max_results(self.max_results);
        let body = json!({
            "query": query.query,
            "max_results": max_results,
            "search_depth": self.search_depth,
            "include_answer": false,
            "include_raw_content": false,
        });
        debug!(query = %query.query, max_results, "Tavily search");
        let res = self.post("search", body).await?;
        let parsed: SearchResponse = res
            .json()
            .await
            .map_err(|e| ToolSourceError::Transport(e.to_string()))?;
        Ok(parsed
            .results
            .into_iter()
            .take(max_results)
            .map(|r| SearchHit {
                url: r.url,
                title: r.title.filter(|t| !t.is_empty()),
                snippet: r.content,
            })
            .collect())
    }
}

#[async_trait]
impl ContentExtractor for TavilyClient {
    async fn extract(&self, urls: &[String]) -> Result<ExtractResponse, ToolSourceError> {
        debug!(url_count = urls.len(), "Tavily extract");
        let res = self.post("extract", json!({ "urls": urls })).await?;
        let parsed: ExtractApiResponse = res
            .json()
            .await
            .map_err(|e| ToolSourceError::Transport(e.to_string()))?;

        let mut out = ExtractResponse::default();
        for r in parsed.results {
            match r.raw_content {
                Some(text) if !text.is_empty() => out.pages.push(ExtractedPage {
                    url: r.url,
                    raw_content: text,
                }),
                _ => out.failed.push(FailedExtraction {
                    url: r.url,
                    error: "empty content".to_string(),
                }),
            }
        }
        out.failed.extend(parsed.failed_results.into_iter().map(|f| FailedExtraction {
            url: f.url,
            error: f.error.unwrap_or_else(|| "unknown error".to_string()),
        }));
        Ok(out)
    }
}
