//! Extraction: fuller page text for the first few URLs research surfaced.
//!
//! Never fails the run. URLs the extractor could not fetch become
//! [`ExcerptContent::Unavailable`](crate::state::ExcerptContent::Unavailable); a failed batch
//! marks every URL unavailable and adds [`EXTRACTION_FAILED_NOTE`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::{DEFAULT_EXTRACT_MAX_CHARS, DEFAULT_EXTRACT_MAX_URLS};
use crate::state::{normalize_url, ExcerptContent, ResearchContext, SourceExcerpt};
use crate::tool_source::{ContentExtractor, ExtractResponse};
use crate::tools::truncate_chars;

use super::{PipelineError, Stage, StageId};

/// Note rendered into the verdict prompt when the extractor failed as a whole.
pub const EXTRACTION_FAILED_NOTE: &str = "Unable to extract full content from URLs.";

pub struct ExtractionStage {
    extractor: Arc<dyn ContentExtractor>,
    max_urls: usize,
    max_chars: usize,
}

impl ExtractionStage {
    pub fn new(extractor: Arc<dyn ContentExtractor>) -> Self {
        Self {
            extractor,
            max_urls: DEFAULT_EXTRACT_MAX_URLS,
            max_chars: DEFAULT_EXTRACT_MAX_CHARS,
        }
    }

    pub fn with_budget(mut self, max_urls: usize, max_chars: usize) -> Self {
        self.max_urls = max_urls;
        self.max_chars = max_chars;
        self
    }

    fn excerpt_for(&self, url: &str, response: &ExtractResponse) -> SourceExcerpt {
        let page = response
            .pages
            .iter()
            .find(|p| normalize_url(&p.url) == normalize_url(url));
        match page {
            Some(p) => {
                let (text, truncated) = truncate_chars(&p.raw_content, self.max_chars);
                SourceExcerpt {
                    url: url.to_string(),
                    content: ExcerptContent::Text(text),
                    truncated,
                }
            }
            None => {
                let reason = response
                    .failed
                    .iter()
                    .find(|f| normalize_url(&f.url) == normalize_url(url))
                    .map(|f| f.error.as_str())
                    .unwrap_or("not returned by extractor");
                warn!(url = %url, reason = %reason, "page extraction unavailable");
                SourceExcerpt::unavailable(url)
            }
        }
    }
}

#[async_trait]
impl Stage for ExtractionStage {
    type Input = ResearchContext;
    type Output = ResearchContext;

    fn id(&self) -> StageId {
        StageId::Extraction
    }

    async fn run(&self, mut context: ResearchContext) -> Result<ResearchContext, PipelineError> {
        let urls: Vec<String> = context.urls().into_iter().take(self.max_urls).collect();
        if urls.is_empty() {
            debug!("no urls to extract");
            return Ok(context);
        }
        match self.extractor.extract(&urls).await {
            Ok(response) => {
                for url in &urls {
                    let excerpt = self.excerpt_for(url, &response);
                    context.push_excerpt(excerpt);
                }
                debug!(
                    urls = urls.len(),
                    extracted = response.pages.len(),
                    "extraction complete"
                );
            }
            Err(e) => {
                warn!(error = %e, urls = urls.len(), "extraction failed, continuing without page content");
                for url in &urls {
                    context.push_excerpt(SourceExcerpt::unavailable(url.clone()));
                }
                context.extraction_note = Some(EXTRACTION_FAILED_NOTE.to_string());
            }
        }
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::EXTRACTION_UNAVAILABLE_MARKER;
    use crate::tool_source::{MockExtractor, SearchHit};

    fn context_with(urls: &[&str]) -> ResearchContext {
        let mut ctx = ResearchContext::new();
        let hits: Vec<SearchHit> = urls.iter().map(|u| SearchHit::new(*u, "snippet")).collect();
        ctx.add_hits(&hits);
        ctx
    }

    #[tokio::test]
    async fn long_pages_are_cut_to_budget() {
        let long = "é".repeat(50);
        let extractor = Arc::new(MockExtractor::new().with_page("https://a.example", long));
        let stage = ExtractionStage::new(extractor).with_budget(3, 20);

        let ctx = stage.run(context_with(&["https://a.example"])).await.unwrap();

        assert_eq!(ctx.excerpts.len(), 1);
        assert_eq!(ctx.excerpts[0].url, "https://a.example");
        assert!(ctx.excerpts[0].truncated);
        match &ctx.excerpts[0].content {
            ExcerptContent::Text(t) => assert_eq!(t.chars().count(), 20),
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn only_first_urls_are_requested_once() {
        let extractor = Arc::new(MockExtractor::new());
        let stage = ExtractionStage::new(extractor.clone()).with_budget(2, 100);

        stage
            .run(context_with(&["https://a.example", "https://a.example/", "https://b.example", "https://c.example"]))
            .await
            .unwrap();

        assert_eq!(
            extractor.calls(),
            vec![vec!["https://a.example".to_string(), "https://b.example".to_string()]]
        );
    }

    #[tokio::test]
    async fn partial_failure_marks_only_failed_urls() {
        let extractor = Arc::new(
            MockExtractor::new()
                .with_page("https://a.example", "full text")
                .with_failure("https://b.example"),
        );
        let stage = ExtractionStage::new(extractor);

        let ctx = stage
            .run(context_with(&["https://a.example", "https://b.example", "https://c.example"]))
            .await
            .unwrap();

        assert_eq!(ctx.excerpts[0].content, ExcerptContent::Text("full text".into()));
        assert_eq!(ctx.excerpts[1], SourceExcerpt::unavailable("https://b.example"));
        assert_eq!(ctx.excerpts[2], SourceExcerpt::unavailable("https://c.example"));
        assert!(ctx.extraction_note.is_none());
        assert!(ctx.render_extracted_content().contains(EXTRACTION_UNAVAILABLE_MARKER));
    }

    #[tokio::test]
    async fn wholesale_failure_is_recovered_with_note() {
        let extractor = Arc::new(MockExtractor::new().failing("timeout"));
        let stage = ExtractionStage::new(extractor);

        let ctx = stage.run(context_with(&["https://a.example"])).await.unwrap();

        assert_eq!(ctx.excerpts, vec![SourceExcerpt::unavailable("https://a.example")]);
        assert_eq!(ctx.extraction_note.as_deref(), Some(EXTRACTION_FAILED_NOTE));
        assert!(ctx.render_extracted_content().contains(EXTRACTION_FAILED_NOTE));
    }

    #[tokio::test]
    async fn empty_context_skips_extractor() {
        let extractor = Arc::new(MockExtractor::new());
        let stage = ExtractionStage::new(extractor.clone());

        let ctx = stage.run(ResearchContext::new()).await.unwrap();

        assert!(ctx.excerpts.is_empty());
        assert!(extractor.calls().is_empty());
    }
}
