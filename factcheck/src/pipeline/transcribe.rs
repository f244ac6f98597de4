//! Transcription: one vision-model call that turns the post image into text.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::agent::Agent;
use crate::llm::LlmClient;
use crate::message::Message;
use crate::post::{load_post, MissingImagePolicy, PostContent, PostReference};

use super::{PipelineError, Stage, StageId};

/// Text read from one post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcription {
    pub post: PostReference,
    pub text: String,
}

/// Sends the directive plus the image (or the unavailable-image placeholder) exactly once.
pub struct TranscriptionStage {
    agent: Agent,
    directive: String,
    missing_image: MissingImagePolicy,
}

impl TranscriptionStage {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        instructions: impl Into<String>,
        directive: impl Into<String>,
    ) -> Self {
        Self {
            agent: Agent::new("ocr_agent", llm, instructions),
            directive: directive.into(),
            missing_image: MissingImagePolicy::default(),
        }
    }

    pub fn with_missing_image_policy(mut self, policy: MissingImagePolicy) -> Self {
        self.missing_image = policy;
        self
    }

    fn prompt(&self, content: PostContent) -> Message {
        match content {
            PostContent::Image(image) => Message::user_with_image(self.directive.clone(), image),
            PostContent::Placeholder(text) => {
                Message::user(format!("{}\n{}", self.directive, text))
            }
        }
    }
}

#[async_trait]
impl Stage for TranscriptionStage {
    type Input = PostReference;
    type Output = Transcription;

    fn id(&self) -> StageId {
        StageId::Transcription
    }

    async fn run(&self, post: PostReference) -> Result<Transcription, PipelineError> {
        let content = load_post(&post, self.missing_image).await?;
        let response = self
            .agent
            .invoke(&[self.prompt(content)])
            .await
            .map_err(PipelineError::model(StageId::Transcription))?;
        let text = response.content.trim().to_string();
        trace!(post = %post, text = %text, "transcription");
        Ok(Transcription { post, text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLlm, MockReply};
    use crate::message::ImageInput;
    use crate::post::IMAGE_UNAVAILABLE_PLACEHOLDER;

    #[tokio::test]
    async fn remote_image_is_sent_with_directive() {
        let llm = Arc::new(MockLlm::fixed(MockReply::text("  Local bakery wins award \n")));
        let stage = TranscriptionStage::new(llm.clone(), "You are an OCR expert.", "Summarize the following post:");

        let out = stage
            .run(PostReference::new("https://cdn.example/real_post.png"))
            .await
            .unwrap();

        assert_eq!(out.text, "Local bakery wins award");
        let reqs = llm.requests();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].messages[0], Message::system("You are an OCR expert."));
        assert_eq!(
            reqs[0].messages[1],
            Message::user_with_image(
                "Summarize the following post:",
                ImageInput::Url("https://cdn.example/real_post.png".into())
            )
        );
        assert!(reqs[0].tools.is_empty());
    }

    #[tokio::test]
    async fn missing_image_fails_before_model_call() {
        let llm = Arc::new(MockLlm::with_no_tool_calls("unused"));
        let stage = TranscriptionStage::new(llm.clone(), "", "Summarize the following post:");

        let err = stage
            .run(PostReference::new("/no/such/post.png"))
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Input(_)));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn placeholder_policy_sends_text_instead_of_image() {
        let llm = Arc::new(MockLlm::with_no_tool_calls("nothing to read"));
        let stage = TranscriptionStage::new(llm.clone(), "", "Summarize the following post:")
            .with_missing_image_policy(MissingImagePolicy::Placeholder);

        let out = stage.run(PostReference::new("/no/such/post.png")).await.unwrap();

        assert_eq!(out.text, "nothing to read");
        let sent = &llm.requests()[0].messages[0];
        assert_eq!(
            sent,
            &Message::user(format!(
                "Summarize the following post:\n{}",
                IMAGE_UNAVAILABLE_PLACEHOLDER
            ))
        );
    }

    #[tokio::test]
    async fn model_failure_is_tagged_with_stage() {
        let llm = Arc::new(MockLlm::fixed(MockReply::Error("unauthorized".into())));
        let stage = TranscriptionStage::new(llm, "", "d");
        let err = stage
            .run(PostReference::new("https://cdn.example/p.png"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Model {
                stage: StageId::Transcription,
                ..
            }
        ));
    }
}
