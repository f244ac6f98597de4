//! Research context: evidence gathered for one post.
//!
//! Search hits are appended by the research stage in the order tools returned them; page
//! excerpts are appended by the extraction stage. Both keep their source URL so the verdict
//! stage (and source filtering) can refer back to them.

use serde::{Deserialize, Serialize};

use crate::tool_source::SearchHit;

/// Search result kept in the context (`url`, `title`, `snippet`).
pub type SourceSnippet = SearchHit;

/// Marker rendered in place of page content that could not be extracted.
pub const EXTRACTION_UNAVAILABLE_MARKER: &str = "[extraction unavailable]";

/// Content of one extracted page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum ExcerptContent {
    /// Page text, already cut to the extraction budget.
    Text(String),
    /// Extraction failed or the extractor skipped this URL.
    Unavailable,
}

/// Page excerpt tagged with its source URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceExcerpt {
    pub url: String,
    pub content: ExcerptContent,
    /// True when the page was longer than the budget and got cut.
    #[serde(default)]
    pub truncated: bool,
}

impl SourceExcerpt {
    pub fn unavailable(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content: ExcerptContent::Unavailable,
            truncated: false,
        }
    }
}

/// Accumulated evidence for the verdict stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchContext {
    pub snippets: Vec<SourceSnippet>,
    pub excerpts: Vec<SourceExcerpt>,
    /// Set when extraction failed as a whole.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_note: Option<String>,
}

/// Comparison form of a URL: surrounding whitespace and one trailing `/` removed.
pub fn normalize_url(url: &str) -> &str {
    let t = url.trim();
    t.strip_suffix('/').unwrap_or(t)
}

impl ResearchContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_hits(&mut self, hits: &[SearchHit]) {
        self.snippets.extend(hits.iter().cloned());
    }

    pub fn push_excerpt(&mut self, excerpt: SourceExcerpt) {
        self.excerpts.push(excerpt);
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty() && self.excerpts.is_empty()
    }

    /// Distinct URLs in first-seen order: search hits first, then excerpts.
    pub fn urls(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        let candidates = self
            .snippets
            .iter()
            .map(|h| h.url.as_str())
            .chain(self.excerpts.iter().map(|e| e.url.as_str()));
        for url in candidates {
            if url.trim().is_empty() {
                continue;
            }
            if !seen.iter().any(|s| normalize_url(s) == normalize_url(url)) {
                seen.push(url.trim().to_string());
            }
        }
        seen
    }

    /// Whether `url` appears anywhere in the context (normalized comparison).
    pub fn contains_url(&self, url: &str) -> bool {
        let needle = normalize_url(url);
        !needle.is_empty()
            && self
                .snippets
                .iter()
                .map(|h| h.url.as_str())
                .chain(self.excerpts.iter().map(|e| e.url.as_str()))
                .any(|u| normalize_url(u) == needle)
    }

    /// Search hits as `Source: <url>\nSnippet: <text>` blocks separated by blank lines.
    pub fn render_search_results(&self) -> String {
        if self.snippets.is_empty() {
            return "No search results.".to_string();
        }
        self.snippets
            .iter()
            .map(|h| {
                let url = if h.url.is_empty() { "N/A" } else { &h.url };
                let snippet = if h.snippet.is_empty() { "N/A" } else { &h.snippet };
                format!("Source: {}\nSnippet: {}", url, snippet)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Extracted pages as `--- Full Content from <url> ---` blocks.
    pub fn render_extracted_content(&self) -> String {
        let mut out = String::new();
        for e in &self.excerpts {
            let body = match &e.content {
                ExcerptContent::Text(t) => t.as_str(),
                ExcerptContent::Unavailable => EXTRACTION_UNAVAILABLE_MARKER,
            };
            out.push_str(&format!("\n--- Full Content from {} ---\n{}\n", e.url, body));
        }
        if let Some(note) = &self.extraction_note {
            out.push_str(&format!("\n{}\n", note));
        }
        if out.is_empty() {
            "No extracted content.".to_string()
        } else {
            out
        }
    }
}
