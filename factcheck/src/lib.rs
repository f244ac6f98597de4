//! # factcheck
//!
//! Fact-check social media posts with language models. Each post is an image (local file or
//! `http(s)` URL) and goes through four steps, strictly in order:
//!
//! 1. **Transcription**: a vision model reads the post ([`pipeline::TranscriptionStage`]).
//! 2. **Research**: a model calls a web search tool as often as it needs, within a bounded
//!    number of rounds ([`pipeline::ResearchStage`]).
//! 3. **Extraction** (optional): fuller page text for the first few URLs found
//!    ([`pipeline::ExtractionStage`]). Failures here never abort the run.
//! 4. **Verdict**: one schema-constrained call producing a validated [`Verdict`]
//!    ([`pipeline::VerdictStage`]).
//!
//! [`FactChecker`] wires the stages to backends and returns a [`FactCheckOutcome`] per post.
//!
//! ## Main modules
//!
//! - [`llm`]: [`LlmClient`] trait, [`MockLlm`], [`ChatOpenAI`].
//! - [`tool_source`]: [`SearchTool`] and [`ContentExtractor`] capabilities with mocks.
//! - [`tools`]: HTTP adapters ([`TavilyClient`], [`ExaSearch`]).
//! - [`pipeline`]: stages, [`FactChecker`], [`PipelineError`].
//! - [`verdict`]: [`Verdict`], schema validation, [`SourcePolicy`].
//! - [`config`]: [`Settings`] resolved from defaults, the XDG config file and env.
//! - [`prompts`]: stage instructions from embedded or on-disk YAML.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use factcheck::{FactChecker, MockLlm, MockSearchTool, PostReference};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let checker = FactChecker::builder()
//!     .llm(Arc::new(MockLlm::with_no_tool_calls("Local bakery wins award")))
//!     .search(Arc::new(MockSearchTool::new()))
//!     .build()?;
//! let outcome = checker.check_post(&PostReference::new("real_post.png")).await?;
//! println!("fake: {}", outcome.verdict.is_fake);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod message;
pub mod pipeline;
pub mod post;
pub mod prompts;
pub mod state;
pub mod tool_source;
pub mod tools;
pub mod verdict;

pub use agent::Agent;
pub use config::{SearchProvider, Settings, SettingsError};
pub use error::AgentError;
pub use llm::{ChatOpenAI, LlmClient, LlmRequest, LlmResponse, MockLlm, MockReply, ToolChoiceMode};
pub use message::{ImageInput, Message};
pub use pipeline::{
    BuildError, FactCheckOutcome, FactChecker, FactCheckerBuilder, PipelineError, StageId,
    ToolCountPolicy,
};
pub use post::{InputError, MissingImagePolicy, PostReference};
pub use prompts::FactcheckPrompts;
pub use state::{ResearchContext, ToolCall, ToolInvocationRecord, ToolUsage};
pub use tool_source::{
    ContentExtractor, MockExtractor, MockSearchTool, SearchHit, SearchQuery, SearchTool,
    ToolSourceError, ToolSpec,
};
pub use tools::{ExaSearch, TavilyClient};
pub use verdict::{SchemaValidationError, SourcePolicy, Verdict};
