//! Mock LLM for tests and examples.
//!
//! Replays a script of replies, one per `invoke()`, and records every request it receives.
//! A fixed mock returns the same reply forever.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AgentError;
use crate::llm::{LlmClient, LlmRequest, LlmResponse};
use crate::state::ToolCall;

/// One scripted reply.
#[derive(Clone, Debug)]
pub enum MockReply {
    /// Plain assistant text, no tool calls.
    Text(String),
    /// Assistant text plus tool calls.
    ToolCalls { content: String, calls: Vec<ToolCall> },
    /// Schema-mode reply: the backend hands back this value as `structured`.
    Structured(Value),
    /// The call fails with `AgentError::ExecutionFailed`.
    Error(String),
}

impl MockReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    /// Tool-call reply for `web_search` with one call per query (ids `call-1`, `call-2`, ...).
    pub fn search_calls(tool: &str, queries: &[&str]) -> Self {
        let calls = queries
            .iter()
            .enumerate()
            .map(|(i, q)| ToolCall {
                name: tool.to_string(),
                arguments: serde_json::json!({ "query": q }).to_string(),
                id: Some(format!("call-{}", i + 1)),
            })
            .collect();
        Self::ToolCalls {
            content: String::new(),
            calls,
        }
    }

    fn into_response(self) -> Result<LlmResponse, AgentError> {
        match self {
            MockReply::Text(content) => Ok(LlmResponse {
                content,
                ..Default::default()
            }),
            MockReply::ToolCalls { content, calls } => Ok(LlmResponse {
                content,
                tool_calls: calls,
                ..Default::default()
            }),
            MockReply::Structured(value) => Ok(LlmResponse {
                content: value.to_string(),
                structured: Some(value),
                ..Default::default()
            }),
            MockReply::Error(msg) => Err(AgentError::ExecutionFailed(msg)),
        }
    }
}

/// Mock LLM: scripted replies in order, or one fixed reply.
///
/// **Interaction**: Implements `LlmClient`; stands in for `ChatOpenAI` in every stage test.
pub struct MockLlm {
    script: Mutex<VecDeque<MockReply>>,
    fixed: Option<MockReply>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlm {
    /// Replies returned in order; once exhausted, `invoke()` fails with `InvalidResponse`.
    pub fn scripted(replies: Vec<MockReply>) -> Self {
        Self {
            script: Mutex::new(replies.into()),
            fixed: None,
            requests: Mutex::new(vec![]),
        }
    }

    /// Always returns `reply`.
    pub fn fixed(reply: MockReply) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fixed: Some(reply),
            requests: Mutex::new(vec![]),
        }
    }

    /// Always returns `content` and no tool calls.
    pub fn with_no_tool_calls(content: impl Into<String>) -> Self {
        Self::fixed(MockReply::Text(content.into()))
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn invoke(&self, request: &LlmRequest) -> Result<LlmResponse, AgentError> {
        if let Ok(mut r) = self.requests.lock() {
            r.push(request.clone());
        }
        let next = match &self.fixed {
            Some(reply) => Some(reply.clone()),
            None => self
                .script
                .lock()
                .map_err(|_| AgentError::ExecutionFailed("mock script lock poisoned".into()))?
                .pop_front(),
        };
        next.ok_or_else(|| AgentError::InvalidResponse("mock script exhausted".to_string()))?
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[tokio::test]
    async fn scripted_replies_are_returned_in_order_then_exhausted() {
        let llm = MockLlm::scripted(vec![
            MockReply::search_calls("web_search", &["a", "b"]),
            MockReply::text("done"),
        ]);
        let req = LlmRequest::new(vec![Message::user("hi")]);

        let first = llm.invoke(&req).await.unwrap();
        assert_eq!(first.tool_calls.len(), 2);
        assert_eq!(first.tool_calls[1].id.as_deref(), Some("call-2"));
        assert_eq!(first.tool_calls[0].arguments, r#"{"query":"a"}"#);

        let second = llm.invoke(&req).await.unwrap();
        assert_eq!(second.content, "done");
        assert!(second.tool_calls.is_empty());

        let err = llm.invoke(&req).await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidResponse(_)));
        assert_eq!(llm.call_count(), 3);
    }

    #[tokio::test]
    async fn fixed_reply_repeats() {
        let llm = MockLlm::with_no_tool_calls("same");
        let req = LlmRequest::default();
        for _ in 0..3 {
            assert_eq!(llm.invoke(&req).await.unwrap().content, "same");
        }
    }

    #[tokio::test]
    async fn structured_reply_sets_value_and_content() {
        let v = serde_json::json!({"fake_news": false});
        let llm = MockLlm::fixed(MockReply::Structured(v.clone()));
        let resp = llm.invoke(&LlmRequest::default()).await.unwrap();
        assert_eq!(resp.structured, Some(v));
        assert_eq!(resp.content, r#"{"fake_news":false}"#);
    }

    #[tokio::test]
    async fn error_reply_fails_the_call() {
        let llm = MockLlm::fixed(MockReply::Error("401 unauthorized".into()));
        let err = llm.invoke(&LlmRequest::default()).await.unwrap_err();
        assert!(err.to_string().contains("401 unauthorized"));
    }
}
