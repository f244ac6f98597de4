//! Message types sent to a model.
//!
//! Roles: System (instructions, first in the list), User, Assistant. A user turn may carry
//! one image next to its text; that is how the transcription step sends a post screenshot.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

/// Image attached to a user message.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ImageInput {
    /// Remote image; the provider fetches it.
    Url(String),
    /// Image bytes read locally; sent inline as a data URL.
    Inline { mime_type: String, data: Vec<u8> },
}

impl ImageInput {
    /// URL form accepted by OpenAI-compatible vision models: the remote URL as-is, or
    /// `data:<mime>;base64,<payload>` for inline bytes.
    pub fn to_url(&self) -> String {
        match self {
            ImageInput::Url(u) => u.clone(),
            ImageInput::Inline { mime_type, data } => {
                format!("data:{};base64,{}", mime_type, BASE64.encode(data))
            }
        }
    }
}

/// A single message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Message {
    /// System prompt; typically placed first in the message list.
    System(String),
    /// User input.
    User(String),
    /// User input with an attached image (multimodal prompt).
    UserWithImage { text: String, image: ImageInput },
    /// Model reply.
    Assistant(String),
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System(content.into())
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User(content.into())
    }

    pub fn user_with_image(text: impl Into<String>, image: ImageInput) -> Self {
        Self::UserWithImage {
            text: text.into(),
            image,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant(content.into())
    }

    /// Text of the message regardless of role (image omitted).
    pub fn text(&self) -> &str {
        match self {
            Message::System(s) | Message::User(s) | Message::Assistant(s) => s,
            Message::UserWithImage { text, .. } => text,
        }
    }
}
