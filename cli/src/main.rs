//! factcheck CLI: analyze one or more social media post images.
//!
//! Each post is a local image path or an `http(s)` image URL. Posts are analyzed one after
//! another; a failed post is reported and the next one still runs.

use std::path::PathBuf;

use clap::Parser;
use factcheck::{MissingImagePolicy, PostReference, SearchProvider};
use factcheck_cli::{
    failure_json, format_failure, format_header, format_outcome, json_record, outcome_json,
    prepare_checker, Overrides,
};

#[derive(Parser, Debug)]
#[command(name = "factcheck")]
#[command(about = "Fact-check social media posts: transcribe, research, verdict")]
struct Args {
    /// Post images: local paths or http(s) URLs
    #[arg(required = true, value_name = "POST")]
    posts: Vec<String>,

    /// Search provider (tavily or exa)
    #[arg(long, value_name = "PROVIDER")]
    search: Option<SearchProvider>,

    /// Skip full-page extraction of search results
    #[arg(long)]
    no_extract: bool,

    /// Whole-run timeout per post, in seconds
    #[arg(long, value_name = "N")]
    timeout_secs: Option<u64>,

    /// Maximum research rounds that execute tool calls
    #[arg(long, value_name = "N")]
    max_tool_rounds: Option<usize>,

    /// What to do when a local image is missing: fail or placeholder
    #[arg(long, value_name = "POLICY")]
    missing_image: Option<MissingImagePolicy>,

    /// Drop verdict sources that research never surfaced
    #[arg(long)]
    restrict_sources: bool,

    /// Report at least N searches when none were recorded (flagged as a fallback)
    #[arg(long, value_name = "N")]
    report_at_least: Option<usize>,

    /// Directory containing factcheck.yaml (default: FACTCHECK_PROMPTS_DIR or ./prompts)
    #[arg(long, value_name = "DIR")]
    prompts_dir: Option<PathBuf>,

    /// One JSON object per post instead of the text report
    #[arg(long)]
    json: bool,

    /// With --json, pretty-print (multi-line)
    #[arg(long)]
    pretty: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            search: self.search,
            no_extract: self.no_extract,
            timeout_secs: self.timeout_secs,
            max_tool_rounds: self.max_tool_rounds,
            missing_image: self.missing_image,
            restrict_sources: self.restrict_sources,
            report_at_least: self.report_at_least,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    config::load_and_apply("factcheck", None::<&std::path::Path>).ok();
    let log_guard = config::init_tracing().map_err(|e| e.to_string())?;

    let args = Args::parse();

    let checker = match prepare_checker(
        &args.overrides(),
        args.prompts_dir.as_deref(),
        |k| std::env::var(k).ok(),
    ) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("factcheck: {}", e);
            drop(log_guard);
            std::process::exit(2);
        }
    };

    let mut failed = 0usize;
    for raw in &args.posts {
        let post = PostReference::new(raw.as_str());
        if !args.json {
            println!("{}", format_header(&post));
        }
        let result = checker.check_post(&post).await;
        match (&result, args.json) {
            (Ok(outcome), true) => println!("{}", json_record(&outcome_json(outcome), args.pretty)?),
            (Ok(outcome), false) => println!("{}", format_outcome(outcome)),
            (Err(e), true) => println!("{}", json_record(&failure_json(&post, e), args.pretty)?),
            (Err(e), false) => println!("{}", format_failure(e)),
        }
        if let Err(e) = &result {
            tracing::warn!(post = %post, error = %e, "post analysis failed");
            failed += 1;
        }
    }

    if failed > 0 {
        eprintln!("factcheck: {} of {} posts failed", failed, args.posts.len());
        drop(log_guard);
        std::process::exit(1);
    }
    Ok(())
}
