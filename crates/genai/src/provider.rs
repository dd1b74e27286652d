//! The provider abstraction the rest of the system talks to.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::GenAiError;

/// A generated (or conditioning) image as base64 plus its mime type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub data_base64: String,
    pub mime_type: String,
}

impl GeneratedImage {
    /// Render as a `data:` URL for multimodal chat requests.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data_base64)
    }
}

/// Speaker of a chat turn, in the provider's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message of chat history sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Remote generation operations.
///
/// Implemented by [`crate::GenAiClient`] for the real provider and by fakes in
/// tests.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generate an image for `prompt`, optionally conditioned on `base_image`.
    async fn generate_image(
        &self,
        prompt: &str,
        base_image: Option<&GeneratedImage>,
    ) -> Result<GeneratedImage, GenAiError>;

    /// Produce the assistant's reply to a chronological chat history.
    async fn chat_complete(&self, history: &[ChatTurn]) -> Result<String, GenAiError>;
}
