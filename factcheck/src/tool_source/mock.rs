//! Deterministic search and extraction backends for tests and offline runs.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{
    web_search_spec, ContentExtractor, ExtractResponse, ExtractedPage, FailedExtraction,
    SearchHit, SearchQuery, SearchTool, ToolSourceError, ToolSpec,
};

/// Mock search tool: fixed hits per query (or a default set), optional transport failure.
///
/// Records every query it receives so tests can assert on the arguments the model chose.
pub struct MockSearchTool {
    name: String,
    by_query: HashMap<String, Vec<SearchHit>>,
    default_hits: Vec<SearchHit>,
    fail_with: Option<String>,
    queries: Mutex<Vec<SearchQuery>>,
}

impl Default for MockSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSearchTool {
    /// Tool named `web_search` that returns no hits.
    pub fn new() -> Self {
        Self {
            name: "web_search".to_string(),
            by_query: HashMap::new(),
            default_hits: vec![],
            fail_with: None,
            queries: Mutex::new(vec![]),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Hits returned for queries without a specific entry.
    pub fn with_default_hits(mut self, hits: Vec<SearchHit>) -> Self {
        self.default_hits = hits;
        self
    }

    /// Hits returned for one exact query string.
    pub fn with_hits_for(mut self, query: impl Into<String>, hits: Vec<SearchHit>) -> Self {
        self.by_query.insert(query.into(), hits);
        self
    }

    /// Every call fails with `ToolSourceError::Transport(message)`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }

    /// Queries received so far, in call order.
    pub fn queries(&self) -> Vec<SearchQuery> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SearchTool for MockSearchTool {
    fn spec(&self) -> ToolSpec {
        web_search_spec(&self.name, "Search the web for evidence about a claim.")
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, ToolSourceError> {
        if let Ok(mut q) = self.queries.lock() {
            q.push(query.clone());
        }
        if let Some(msg) = &self.fail_with {
            return Err(ToolSourceError::Transport(msg.clone()));
        }
        let hits = self
            .by_query
            .get(&query.query)
            .unwrap_or(&self.default_hits);
        let limit = query.max_results.unwrap_or(hits.len());
        Ok(hits.iter().take(limit).cloned().collect())
    }
}

/// Mock extractor: fixed page text per URL; selected URLs fail, or the whole batch fails.
pub struct MockExtractor {
    pages: HashMap<String, String>,
    failing_urls: HashSet<String>,
    fail_all: Option<String>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl Default for MockExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExtractor {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            failing_urls: HashSet::new(),
            fail_all: None,
            calls: Mutex::new(vec![]),
        }
    }

    pub fn with_page(mut self, url: impl Into<String>, content: impl Into<String>) -> Self {
        self.pages.insert(url.into(), content.into());
        self
    }

    /// Reports `url` in `failed`.
    pub fn with_failure(mut self, url: impl Into<String>) -> Self {
        self.failing_urls.insert(url.into());
        self
    }

    /// Every batch fails with `ToolSourceError::Transport(message)`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.fail_all = Some(message.into());
        self
    }

    /// URL batches received so far.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ContentExtractor for MockExtractor {
    async fn extract(&self, urls: &[String]) -> Result<ExtractResponse, ToolSourceError> {
        if let Ok(mut c) = self.calls.lock() {
            c.push(urls.to_vec());
        }
        if let Some(msg) = &self.fail_all {
            return Err(ToolSourceError::Transport(msg.clone()));
        }
        let mut out = ExtractResponse::default();
        for url in urls {
            if self.failing_urls.contains(url) {
                out.failed.push(FailedExtraction {
                    url: url.clone(),
                    error: "mock extraction failure".to_string(),
                });
            } else if let Some(content) = self.pages.get(url) {
                out.pages.push(ExtractedPage {
                    url: url.clone(),
                    raw_content: content.clone(),
                });
            }
        }
        Ok(out)
    }
}
