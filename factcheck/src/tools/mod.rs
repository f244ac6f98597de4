//! HTTP adapters for the search and extraction capabilities.

pub mod exa;
pub mod tavily;

pub use exa::{ExaSearch, TOOL_EXA_WEBSEARCH};
pub use tavily::{TavilyClient, TOOL_TAVILY_SEARCH};

/// First `max_chars` characters of `s` (never splits a char); the flag is true when cut.
pub fn truncate_chars(s: &str, max_chars: usize) -> (String, bool) {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (s[..byte_idx].to_string(), true),
        None => (s.to_string(), false),
    }
}

/// Maps a non-success HTTP response to `ToolSourceError::Transport` with status and body.
async fn error_for_status(
    provider: &str,
    res: reqwest::Response,
) -> Result<reqwest::Response, crate::tool_source::ToolSourceError> {
    if res.status().is_success() {
        return Ok(res);
    }
    let status = res.status();
    let body = res.text().await.unwrap_or_default();
    Err(crate::tool_source::ToolSourceError::Transport(format!(
        "{} API error {}: {}",
        provider, status, body
    )))
}
