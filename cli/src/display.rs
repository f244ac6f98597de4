//! Report formatting for stdout: the text report and the `--json` records.

use factcheck::{FactCheckOutcome, PipelineError, PostReference};
use serde_json::{json, Value};

/// Width of the `=` / `-` rules around each report.
const RULE_WIDTH: usize = 80;

pub fn banner() -> String {
    "=".repeat(RULE_WIDTH)
}

/// Title block printed before each post.
pub fn format_header(post: &PostReference) -> String {
    format!(
        "{rule}\nSOCIAL MEDIA FACT CHECKER\n{rule}\n\nAnalyzing {post}...\n{dash}",
        rule = banner(),
        post = post,
        dash = "-".repeat(RULE_WIDTH)
    )
}

/// `Tools Used` line; says so when the count is a fallback rather than recorded searches.
pub fn format_tool_usage(outcome: &FactCheckOutcome) -> String {
    let usage = &outcome.tool_usage;
    let mut line = format!("Tools Used: {} web searches performed", usage.reported);
    if usage.used_fallback_count {
        line.push_str(" (no searches recorded; fallback count)");
    }
    line
}

/// Verdict, reasoning, numbered sources and tool usage.
pub fn format_outcome(outcome: &FactCheckOutcome) -> String {
    let verdict = &outcome.verdict;
    let mut lines = vec![
        String::new(),
        "Analysis Complete".to_string(),
        String::new(),
        format!(
            "Verdict: {}",
            if verdict.is_fake {
                "FAKE NEWS"
            } else {
                "LEGITIMATE"
            }
        ),
        String::new(),
        "Reasoning:".to_string(),
        verdict.reasoning.clone(),
        String::new(),
        format!("Relevant Sources ({}):", verdict.sources.len()),
    ];
    for (i, source) in verdict.sources.iter().enumerate() {
        lines.push(format!("  {}. {}", i + 1, source));
    }
    lines.push(String::new());
    lines.push(format_tool_usage(outcome));
    lines.push(String::new());
    lines.push(banner());
    lines.join("\n")
}

pub fn format_failure(error: &PipelineError) -> String {
    format!("\nError: {}\n{}", error, banner())
}

/// `{"post", "verdict", "tool_usage", "invocations"}` for one analyzed post.
pub fn outcome_json(outcome: &FactCheckOutcome) -> Value {
    json!({
        "post": outcome.post,
        "verdict": outcome.verdict,
        "tool_usage": outcome.tool_usage,
        "invocations": outcome.invocations,
    })
}

/// `{"post", "error"}` for a post whose analysis failed.
pub fn failure_json(post: &PostReference, error: &PipelineError) -> Value {
    let mut out = json!({
        "post": post,
        "error": error.to_string(),
    });
    if let Some(stage) = error.stage() {
        out["stage"] = json!(stage);
    }
    out
}

/// One JSON record; compact (one line) unless `pretty`.
pub fn json_record(value: &Value, pretty: bool) -> Result<String, serde_json::Error> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factcheck::{ToolUsage, Verdict};

    fn outcome(is_fake: bool, sources: &[&str], usage: ToolUsage) -> FactCheckOutcome {
        FactCheckOutcome {
            post: PostReference::new("fake_post.png"),
            transcription: "Vaccines contain microchips".into(),
            narrative: "Debunked.".into(),
            verdict: Verdict {
                is_fake,
                reasoning: "Health agencies deny it.".into(),
                sources: sources.iter().map(|s| s.to_string()).collect(),
            },
            invocations: vec![],
            tool_usage: usage,
        }
    }

    #[test]
    fn header_names_the_post() {
        let h = format_header(&PostReference::new("real_post.png"));
        assert!(h.starts_with(&"=".repeat(80)));
        assert!(h.contains("SOCIAL MEDIA FACT CHECKER"));
        assert!(h.contains("Analyzing real_post.png..."));
    }

    #[test]
    fn outcome_lists_sources_numbered() {
        let text = format_outcome(&outcome(
            true,
            &["https://a.example", "https://b.example"],
            ToolUsage::exact(2),
        ));
        assert!(text.contains("Verdict: FAKE NEWS"));
        assert!(text.contains("Reasoning:\nHealth agencies deny it."));
        assert!(text.contains("Relevant Sources (2):\n  1. https://a.example\n  2. https://b.example"));
        assert!(text.contains("Tools Used: 2 web searches performed"));
        assert!(!text.contains("fallback"));
    }

    #[test]
    fn fallback_count_is_labelled() {
        let usage = ToolUsage {
            recorded: 0,
            reported: 1,
            used_fallback_count: true,
        };
        let text = format_outcome(&outcome(false, &[], usage));
        assert!(text.contains("Verdict: LEGITIMATE"));
        assert!(text.contains("Relevant Sources (0):"));
        assert!(text.contains(
            "Tools Used: 1 web searches performed (no searches recorded; fallback count)"
        ));
    }

    #[test]
    fn json_records_use_wire_names() {
        let v = outcome_json(&outcome(true, &["https://a.example"], ToolUsage::exact(1)));
        assert_eq!(v["post"], "fake_post.png");
        assert_eq!(v["verdict"]["fake_news"], true);
        assert_eq!(v["verdict"]["relevant_sources"][0], "https://a.example");
        assert_eq!(v["tool_usage"]["reported"], 1);
        assert!(v["invocations"].as_array().map(|a| a.is_empty()).unwrap_or(false));

        let line = json_record(&v, false).unwrap();
        assert!(!line.contains('\n'));
    }

    #[test]
    fn failure_json_carries_error_and_stage() {
        let err = PipelineError::Timeout(std::time::Duration::from_secs(3));
        let v = failure_json(&PostReference::new("p.png"), &err);
        assert_eq!(v["error"], "fact check timed out after 3s");
        assert!(v.get("stage").is_none());
        assert!(format_failure(&err).contains("Error: fact check timed out after 3s"));
    }
}
