//! Live run against OpenAI and Tavily.
//!
//! Loads `OPENAI_API_KEY` and `TAVILY_API_KEY` from `.env` or environment. Run with:
//!
//! ```bash
//! cargo test -p factcheck --test live_pipeline -- --ignored
//! ```

mod init_logging;

use std::sync::Arc;
use std::time::Duration;

use factcheck::config::{OPENAI_API_KEY, TAVILY_API_KEY};
use factcheck::{ChatOpenAI, FactChecker, PostReference, SourcePolicy, TavilyClient};

const SAMPLE_POST_URL: &str =
    "https://upload.wikimedia.org/wikipedia/commons/4/47/PNG_transparency_demonstration_1.png";

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires OPENAI_API_KEY, TAVILY_API_KEY and network; run with: cargo test -p factcheck --test live_pipeline -- --ignored"]
async fn live_check_returns_verdict_with_known_sources() {
    dotenv::dotenv().ok();
    let tavily_key = std::env::var(TAVILY_API_KEY).expect("TAVILY_API_KEY must be set");
    std::env::var(OPENAI_API_KEY).expect("OPENAI_API_KEY must be set");

    let tavily = Arc::new(TavilyClient::new(tavily_key));
    let checker = FactChecker::builder()
        .ocr_llm(Arc::new(ChatOpenAI::new("gpt-4o-mini").with_temperature(0.0)))
        .research_llm(Arc::new(ChatOpenAI::new("gpt-4o").with_temperature(0.0)))
        .search(tavily.clone())
        .extractor(tavily)
        .source_policy(SourcePolicy::RestrictToContext)
        .timeout(Duration::from_secs(180))
        .build()
        .expect("build checker");

    let outcome = checker
        .check_post(&PostReference::new(SAMPLE_POST_URL))
        .await
        .expect("live fact check");

    assert!(!outcome.verdict.reasoning.is_empty());
    assert_eq!(outcome.tool_usage.recorded, outcome.invocations.len());
}
