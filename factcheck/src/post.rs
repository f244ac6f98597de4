//! Post references and image loading for the transcription stage.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::message::ImageInput;

/// Text sent instead of the image when the post cannot be read and
/// [`MissingImagePolicy::Placeholder`] is active.
pub const IMAGE_UNAVAILABLE_PLACEHOLDER: &str = "[Image content unavailable: File not found]";

/// Identifies one post to analyze: a local image path or an `http(s)` image URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostReference(String);

impl PostReference {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for `http://` and `https://` URIs; those are handed to the model as URLs.
    pub fn is_remote(&self) -> bool {
        let lower = self.0.to_ascii_lowercase();
        lower.starts_with("http://") || lower.starts_with("https://")
    }
}

impl std::fmt::Display for PostReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PostReference {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<PathBuf> for PostReference {
    fn from(p: PathBuf) -> Self {
        Self::new(p.display().to_string())
    }
}

/// What to do when a local post image is missing or unreadable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingImagePolicy {
    /// Fail before any model call.
    #[default]
    FailFast,
    /// Send [`IMAGE_UNAVAILABLE_PLACEHOLDER`] instead of the image and continue.
    Placeholder,
}

impl std::str::FromStr for MissingImagePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail" | "fail-fast" | "fail_fast" => Ok(Self::FailFast),
            "placeholder" => Ok(Self::Placeholder),
            _ => Err(format!(
                "unknown missing-image policy: {} (use fail or placeholder)",
                s
            )),
        }
    }
}

/// The referenced post cannot be used.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("post image not found: {0}")]
    NotFound(PathBuf),
    #[error("post image unreadable: {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("post image is empty: {0}")]
    Empty(PathBuf),
}

/// Image (or placeholder text) to send to the transcription model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostContent {
    Image(ImageInput),
    Placeholder(String),
}

/// MIME type from the file extension; unknown extensions are sent as PNG.
pub fn mime_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}

async fn read_local(path: &Path) -> Result<ImageInput, InputError> {
    let data = tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            InputError::NotFound(path.to_path_buf())
        } else {
            InputError::Unreadable {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    if data.is_empty() {
        return Err(InputError::Empty(path.to_path_buf()));
    }
    Ok(ImageInput::Inline {
        mime_type: mime_type_for(path).to_string(),
        data,
    })
}

/// Resolves a post into model input. Remote posts are never fetched here.
pub async fn load_post(
    post: &PostReference,
    policy: MissingImagePolicy,
) -> Result<PostContent, InputError> {
    if post.is_remote() {
        return Ok(PostContent::Image(ImageInput::Url(post.as_str().to_string())));
    }
    match read_local(Path::new(post.as_str())).await {
        Ok(image) => Ok(PostContent::Image(image)),
        Err(e) => match policy {
            MissingImagePolicy::FailFast => Err(e),
            MissingImagePolicy::Placeholder => {
                warn!(post = %post, error = %e, "post image unavailable, using placeholder");
                Ok(PostContent::Placeholder(
                    IMAGE_UNAVAILABLE_PLACEHOLDER.to_string(),
                ))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_detection_is_case_insensitive() {
        assert!(PostReference::new("HTTPS://x.example/a.png").is_remote());
        assert!(PostReference::new("http://x.example/a.png").is_remote());
        assert!(!PostReference::new("./fake_post.png").is_remote());
    }

    #[test]
    fn mime_type_from_extension() {
        assert_eq!(mime_type_for(Path::new("a.PNG")), "image/png");
        assert_eq!(mime_type_for(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("a.jpg")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("a.webp")), "image/webp");
        assert_eq!(mime_type_for(Path::new("a")), "image/png");
    }

    #[test]
    fn missing_image_policy_parses() {
        assert_eq!("fail".parse::<MissingImagePolicy>().unwrap(), MissingImagePolicy::FailFast);
        assert_eq!(
            "Placeholder".parse::<MissingImagePolicy>().unwrap(),
            MissingImagePolicy::Placeholder
        );
        assert!("skip".parse::<MissingImagePolicy>().is_err());
    }

    #[tokio::test]
    async fn local_image_is_read_inline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("real_post.png");
        std::fs::write(&path, b"\x89PNG").unwrap();

        let content = load_post(&PostReference::from(path), MissingImagePolicy::FailFast)
            .await
            .unwrap();
        assert_eq!(
            content,
            PostContent::Image(ImageInput::Inline {
                mime_type: "image/png".into(),
                data: b"\x89PNG".to_vec()
            })
        );
    }

    #[tokio::test]
    async fn missing_image_fails_fast_by_default() {
        let err = load_post(
            &PostReference::new("/definitely/not/here.png"),
            MissingImagePolicy::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, InputError::NotFound(_)));
    }

    #[tokio::test]
    async fn missing_image_becomes_placeholder_when_configured() {
        let content = load_post(
            &PostReference::new("/definitely/not/here.png"),
            MissingImagePolicy::Placeholder,
        )
        .await
        .unwrap();
        assert_eq!(
            content,
            PostContent::Placeholder(IMAGE_UNAVAILABLE_PLACEHOLDER.to_string())
        );
    }

    #[tokio::test]
    async fn empty_file_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.png");
        std::fs::write(&path, b"").unwrap();
        let err = load_post(&PostReference::from(path), MissingImagePolicy::FailFast)
            .await
            .unwrap_err();
        assert!(matches!(err, InputError::Empty(_)));
    }

    #[tokio::test]
    async fn remote_post_is_passed_as_url() {
        let content = load_post(
            &PostReference::new("https://cdn.example/post.png"),
            MissingImagePolicy::FailFast,
        )
        .await
        .unwrap();
        assert_eq!(
            content,
            PostContent::Image(ImageInput::Url("https://cdn.example/post.png".into()))
        );
    }
}
