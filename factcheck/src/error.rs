//! Model invocation error types.
//!
//! Returned by [`LlmClient::invoke`](crate::llm::LlmClient::invoke). Stage-level failures
//! wrap this in [`PipelineError`](crate::pipeline::PipelineError).

use thiserror::Error;

/// Failure of one model call.
///
/// Backends map transport, auth, quota and request-building failures to
/// `ExecutionFailed`; a response that arrived but cannot be used (no choices,
/// exhausted mock script) is `InvalidResponse`.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The call itself failed (network, API error, request build).
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// The provider answered, but with nothing usable.
    #[error("invalid model response: {0}")]
    InvalidResponse(String),
}
