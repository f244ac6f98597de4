//! Orchestrator: runs the stages for one post, or several posts in sequence.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Settings;
use crate::llm::LlmClient;
use crate::post::{MissingImagePolicy, PostReference};
use crate::prompts::{default_from_embedded, FactcheckPrompts};
use crate::state::{ToolInvocationRecord, ToolUsage};
use crate::tool_source::{ContentExtractor, SearchTool};
use crate::verdict::{SourcePolicy, Verdict};

use super::{
    run_stage, ExtractionStage, PipelineError, ResearchOutput, ResearchStage, StageId,
    TranscriptionStage, VerdictInput, VerdictStage,
};

/// How the reported search count relates to the recorded invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolCountPolicy {
    /// Report exactly what was recorded.
    #[default]
    Exact,
    /// Report at least `n` when nothing was recorded, flagging the fallback.
    ReportAtLeast(usize),
}

impl ToolCountPolicy {
    /// `0` means [`ToolCountPolicy::Exact`].
    pub fn from_floor(n: usize) -> Self {
        if n == 0 {
            ToolCountPolicy::Exact
        } else {
            ToolCountPolicy::ReportAtLeast(n)
        }
    }

    pub fn apply(self, recorded: usize) -> ToolUsage {
        match self {
            ToolCountPolicy::ReportAtLeast(floor) if recorded == 0 && floor > 0 => ToolUsage {
                recorded,
                reported: floor,
                used_fallback_count: true,
            },
            _ => ToolUsage::exact(recorded),
        }
    }
}

/// Result of a completed fact check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactCheckOutcome {
    pub post: PostReference,
    pub transcription: String,
    pub narrative: String,
    pub verdict: Verdict,
    pub invocations: Vec<ToolInvocationRecord>,
    pub tool_usage: ToolUsage,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("no model backend for the {0} stage; call llm() or the per-stage setter")]
    MissingLlm(StageId),
    #[error("no search tool configured")]
    MissingSearch,
}

/// Runs transcription, research, optional extraction and verdict for each post.
///
/// Holds only immutable configuration and shared backends, so one checker can serve
/// concurrent callers.
pub struct FactChecker {
    transcription: TranscriptionStage,
    research: ResearchStage,
    extraction: Option<ExtractionStage>,
    verdict: VerdictStage,
    tool_count: ToolCountPolicy,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for FactChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactChecker")
            .field("extraction", &self.extraction.is_some())
            .field("tool_count", &self.tool_count)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl FactChecker {
    pub fn builder() -> FactCheckerBuilder {
        FactCheckerBuilder::default()
    }

    /// Whole-run timeout applied by [`FactChecker::check_post`], if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Analyzes one post. Uses the configured timeout when one is set.
    pub async fn check_post(&self, post: &PostReference) -> Result<FactCheckOutcome, PipelineError> {
        match self.timeout {
            Some(limit) => self.check_post_with_timeout(post, limit).await,
            None => self.run(post).await,
        }
    }

    /// Analyzes one post, abandoning the in-flight stage after `limit`.
    pub async fn check_post_with_timeout(
        &self,
        post: &PostReference,
        limit: Duration,
    ) -> Result<FactCheckOutcome, PipelineError> {
        match tokio::time::timeout(limit, self.run(post)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(post = %post, timeout = ?limit, "fact check timed out");
                Err(PipelineError::Timeout(limit))
            }
        }
    }

    /// Analyzes posts one after another; a failed post does not stop the rest.
    pub async fn check_posts(
        &self,
        posts: &[PostReference],
    ) -> Vec<Result<FactCheckOutcome, PipelineError>> {
        let mut results = Vec::with_capacity(posts.len());
        for post in posts {
            let result = self.check_post(post).await;
            if let Err(e) = &result {
                warn!(post = %post, error = %e, "fact check failed");
            }
            results.push(result);
        }
        results
    }

    async fn run(&self, post: &PostReference) -> Result<FactCheckOutcome, PipelineError> {
        let transcription = run_stage(&self.transcription, post, post.clone()).await?;
        let ResearchOutput {
            transcription,
            narrative,
            context,
            invocations,
        } = run_stage(&self.research, post, transcription).await?;
        let context = match &self.extraction {
            Some(stage) => run_stage(stage, post, context).await?,
            None => context,
        };
        let verdict = run_stage(
            &self.verdict,
            post,
            VerdictInput {
                transcription: transcription.text.clone(),
                narrative: narrative.clone(),
                context,
            },
        )
        .await?;

        let tool_usage = self.tool_count.apply(invocations.len());
        info!(
            post = %post,
            is_fake = verdict.is_fake,
            sources = verdict.sources.len(),
            searches_recorded = tool_usage.recorded,
            searches_reported = tool_usage.reported,
            fallback = tool_usage.used_fallback_count,
            "fact check complete"
        );
        Ok(FactCheckOutcome {
            post: post.clone(),
            transcription: transcription.text,
            narrative,
            verdict,
            invocations,
            tool_usage,
        })
    }
}

/// Builder for [`FactChecker`].
///
/// `llm` backs every model stage; `ocr_llm`, `research_llm` and `verdict_llm` replace it
/// per stage. The verdict stage falls back to the research model before the shared one.
/// Extraction runs only when an extractor is set and extraction is enabled.
pub struct FactCheckerBuilder {
    llm: Option<Arc<dyn LlmClient>>,
    ocr_llm: Option<Arc<dyn LlmClient>>,
    research_llm: Option<Arc<dyn LlmClient>>,
    verdict_llm: Option<Arc<dyn LlmClient>>,
    search: Option<Arc<dyn SearchTool>>,
    extractor: Option<Arc<dyn ContentExtractor>>,
    extraction_enabled: bool,
    prompts: FactcheckPrompts,
    missing_image: MissingImagePolicy,
    source_policy: SourcePolicy,
    tool_count: ToolCountPolicy,
    max_tool_rounds: usize,
    extraction_budget: (usize, usize),
    timeout: Option<Duration>,
}

impl Default for FactCheckerBuilder {
    fn default() -> Self {
        Self {
            llm: None,
            ocr_llm: None,
            research_llm: None,
            verdict_llm: None,
            search: None,
            extractor: None,
            extraction_enabled: true,
            prompts: default_from_embedded(),
            missing_image: MissingImagePolicy::default(),
            source_policy: SourcePolicy::default(),
            tool_count: ToolCountPolicy::default(),
            max_tool_rounds: crate::config::DEFAULT_MAX_TOOL_ROUNDS,
            extraction_budget: (
                crate::config::DEFAULT_EXTRACT_MAX_URLS,
                crate::config::DEFAULT_EXTRACT_MAX_CHARS,
            ),
            timeout: None,
        }
    }
}

impl FactCheckerBuilder {
    pub fn llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn ocr_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.ocr_llm = Some(llm);
        self
    }

    pub fn research_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.research_llm = Some(llm);
        self
    }

    pub fn verdict_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.verdict_llm = Some(llm);
        self
    }

    pub fn search(mut self, search: Arc<dyn SearchTool>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn ContentExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn prompts(mut self, prompts: FactcheckPrompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn missing_image_policy(mut self, policy: MissingImagePolicy) -> Self {
        self.missing_image = policy;
        self
    }

    pub fn source_policy(mut self, policy: SourcePolicy) -> Self {
        self.source_policy = policy;
        self
    }

    pub fn tool_count_policy(mut self, policy: ToolCountPolicy) -> Self {
        self.tool_count = policy;
        self
    }

    pub fn max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn extraction_budget(mut self, max_urls: usize, max_chars: usize) -> Self {
        self.extraction_budget = (max_urls, max_chars);
        self
    }

    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    /// Copies pipeline options from resolved settings. Backends are left untouched.
    pub fn settings(mut self, settings: &Settings) -> Self {
        self.extraction_enabled = settings.extraction_active();
        self.extraction_budget = (settings.extract.max_urls, settings.extract.max_chars);
        self.max_tool_rounds = settings.max_tool_rounds;
        self.missing_image = settings.missing_image;
        self.source_policy = settings.source_policy;
        self.tool_count = settings.tool_count;
        self.timeout = Some(settings.timeout);
        self
    }

    pub fn build(self) -> Result<FactChecker, BuildError> {
        let ocr_llm = self
            .ocr_llm
            .or_else(|| self.llm.clone())
            .ok_or(BuildError::MissingLlm(StageId::Transcription))?;
        let research_llm = self
            .research_llm
            .or_else(|| self.llm.clone())
            .ok_or(BuildError::MissingLlm(StageId::Research))?;
        let verdict_llm = self
            .verdict_llm
            .unwrap_or_else(|| research_llm.clone());
        let search = self.search.ok_or(BuildError::MissingSearch)?;

        let transcription = TranscriptionStage::new(
            ocr_llm,
            self.prompts.ocr_instructions(),
            self.prompts.transcription_directive(),
        )
        .with_missing_image_policy(self.missing_image);
        let research = ResearchStage::new(research_llm, self.prompts.research_instructions(), search)
            .with_max_tool_rounds(self.max_tool_rounds);
        let (max_urls, max_chars) = self.extraction_budget;
        let extraction = self
            .extractor
            .filter(|_| self.extraction_enabled)
            .map(|e| ExtractionStage::new(e).with_budget(max_urls, max_chars));
        let verdict = VerdictStage::new(verdict_llm, self.prompts.verdict_instructions())
            .with_source_policy(self.source_policy);

        Ok(FactChecker {
            transcription,
            research,
            extraction,
            verdict,
            tool_count: self.tool_count,
            timeout: self.timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchProvider;
    use crate::llm::{MockLlm, MockReply};
    use crate::tool_source::{MockExtractor, MockSearchTool};
    use serde_json::json;

    fn verdict_reply() -> MockReply {
        MockReply::Structured(json!({
            "fake_news": false,
            "reasoning": "Nothing contradicts it.",
            "relevant_sources": []
        }))
    }

    #[test]
    fn tool_count_policy_applies_floor_only_when_nothing_recorded() {
        assert_eq!(ToolCountPolicy::Exact.apply(0), ToolUsage::exact(0));
        assert_eq!(
            ToolCountPolicy::ReportAtLeast(1).apply(0),
            ToolUsage {
                recorded: 0,
                reported: 1,
                used_fallback_count: true
            }
        );
        assert_eq!(ToolCountPolicy::ReportAtLeast(1).apply(2), ToolUsage::exact(2));
        assert_eq!(ToolCountPolicy::from_floor(0), ToolCountPolicy::Exact);
        assert_eq!(ToolCountPolicy::from_floor(3), ToolCountPolicy::ReportAtLeast(3));
    }

    #[test]
    fn build_requires_model_and_search() {
        let err = FactChecker::builder()
            .search(Arc::new(MockSearchTool::new()))
            .build()
            .unwrap_err();
        assert_eq!(err, BuildError::MissingLlm(StageId::Transcription));

        let err = FactChecker::builder()
            .llm(Arc::new(MockLlm::with_no_tool_calls("x")))
            .build()
            .unwrap_err();
        assert_eq!(err, BuildError::MissingSearch);
    }

    #[test]
    fn settings_disable_extraction_for_exa() {
        let mut settings = Settings::default();
        settings.search_provider = SearchProvider::Exa;
        let checker = FactChecker::builder()
            .llm(Arc::new(MockLlm::with_no_tool_calls("x")))
            .search(Arc::new(MockSearchTool::new()))
            .extractor(Arc::new(MockExtractor::new()))
            .settings(&settings)
            .build()
            .unwrap();
        assert!(checker.extraction.is_none());
        assert_eq!(checker.timeout(), Some(settings.timeout));
    }

    #[test]
    fn checker_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FactChecker>();
    }

    #[tokio::test]
    async fn per_stage_models_are_used() {
        let ocr = Arc::new(MockLlm::with_no_tool_calls("Local bakery wins award"));
        let research = Arc::new(MockLlm::with_no_tool_calls("Plausible local news."));
        let verdict = Arc::new(MockLlm::fixed(verdict_reply()));
        let checker = FactChecker::builder()
            .ocr_llm(ocr.clone())
            .research_llm(research.clone())
            .verdict_llm(verdict.clone())
            .search(Arc::new(MockSearchTool::new()))
            .build()
            .unwrap();

        let outcome = checker
            .check_post(&PostReference::new("https://cdn.example/real_post.png"))
            .await
            .unwrap();

        assert_eq!(outcome.transcription, "Local bakery wins award");
        assert_eq!(outcome.narrative, "Plausible local news.");
        assert!(!outcome.verdict.is_fake);
        assert_eq!((ocr.call_count(), research.call_count(), verdict.call_count()), (1, 1, 1));
        assert!(verdict.requests()[0].output_schema.is_some());
    }
}
