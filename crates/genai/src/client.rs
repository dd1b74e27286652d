//! HTTP client for an OpenAI-compatible generation provider.
//!
//! Plain prompts go to `/images/generations` (or `/chat/completions` in
//! [`ImageMode::Chat`]); refinements always go to `/chat/completions` with the
//! base image attached as a `data:` URL. Responses are normalized through
//! [`crate::extract`].

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{json, Value};

use crate::config::{GenAiConfig, ImageMode};
use crate::error::GenAiError;
use crate::extract::{self, ImageRef};
use crate::provider::{ChatRole, ChatTurn, GeneratedImage, GenerationProvider};

/// Mime type assumed when neither the provider nor the bytes say otherwise.
const FALLBACK_MIME_TYPE: &str = "image/png";

/// HTTP implementation of [`GenerationProvider`].
pub struct GenAiClient {
    client: reqwest::Client,
    config: GenAiConfig,
}

impl GenAiClient {
    /// Build a client whose every request is bounded by `config.timeout`.
    pub fn new(config: GenAiConfig) -> Result<Self, GenAiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    // ---- private helpers ----

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, GenAiError> {
        let url = format!("{}{path}", self.config.api_url);
        tracing::debug!(url = %url, "Calling generation provider");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| GenAiError::Malformed(e.to_string()))
    }

    /// Ensure the response has a success status code, turning the error
    /// body into a short message otherwise.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, GenAiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenAiError::Api {
                status: status.as_u16(),
                message: extract::provider_error_message(&body),
            });
        }
        Ok(response)
    }

    /// Resolve an extracted reference into base64 bytes plus mime type.
    async fn materialize(&self, found: ImageRef) -> Result<GeneratedImage, GenAiError> {
        match found {
            ImageRef::Inline { data, mime_type } => decode_inline(&data, mime_type),
            ImageRef::Remote { url } => {
                tracing::debug!(url = %url, "Fetching generated image");
                let response = self.client.get(&url).send().await?;
                let response = Self::ensure_success(response).await?;

                let header_mime = response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.split(';').next())
                    .map(|v| v.trim().to_string())
                    .filter(|v| v.starts_with("image/"));

                let bytes = response.bytes().await?;
                if bytes.is_empty() {
                    return Err(GenAiError::Empty("image URL returned no bytes".into()));
                }
                let mime_type = header_mime
                    .or_else(|| sniff_mime(&bytes))
                    .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string());

                Ok(GeneratedImage {
                    data_base64: STANDARD.encode(&bytes),
                    mime_type,
                })
            }
        }
    }
}

#[async_trait]
impl GenerationProvider for GenAiClient {
    async fn generate_image(
        &self,
        prompt: &str,
        base_image: Option<&GeneratedImage>,
    ) -> Result<GeneratedImage, GenAiError> {
        let use_chat = base_image.is_some() || self.config.image_mode == ImageMode::Chat;
        let body = if use_chat {
            chat_image_request(&self.config.image_model, prompt, base_image)
        } else {
            images_request(&self.config.image_model, prompt)
        };
        let path = if use_chat {
            "/chat/completions"
        } else {
            "/images/generations"
        };

        let response = self.post_json(path, &body).await?;
        let (strategy, found) = extract::extract_image(&response).ok_or_else(|| {
            match extract::extract_text(&response) {
                Some(text) => {
                    GenAiError::Empty(format!("no image in response; provider said: {text}"))
                }
                None => missing_content(&response, "no image in response"),
            }
        })?;
        tracing::debug!(strategy = ?strategy, "Image extracted from provider response");

        self.materialize(found).await
    }

    async fn chat_complete(&self, history: &[ChatTurn]) -> Result<String, GenAiError> {
        let body = chat_request(
            &self.config.chat_model,
            self.config.system_prompt.as_deref(),
            history,
        );
        let response = self.post_json("/chat/completions", &body).await?;
        extract::extract_text(&response)
            .ok_or_else(|| missing_content(&response, "no text in chat response"))
    }
}

/// Error for a 2xx body that yielded nothing usable. Bodies carrying an
/// `error` field keep the provider's own message.
fn missing_content(response: &Value, reason: &str) -> GenAiError {
    match response.get("error") {
        Some(error) if !error.is_null() => GenAiError::Api {
            status: 200,
            message: extract::provider_error_message(&response.to_string()),
        },
        _ => GenAiError::Empty(reason.to_string()),
    }
}

/// Validate an inline base64 payload and settle its mime type.
fn decode_inline(data: &str, mime_type: Option<String>) -> Result<GeneratedImage, GenAiError> {
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD
        .decode(&compact)
        .map_err(|e| GenAiError::Malformed(format!("image payload is not valid base64: {e}")))?;
    if bytes.is_empty() {
        return Err(GenAiError::Empty("image payload is empty".into()));
    }
    let mime_type = mime_type
        .filter(|m| m.starts_with("image/"))
        .or_else(|| sniff_mime(&bytes))
        .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string());
    Ok(GeneratedImage {
        data_base64: compact,
        mime_type,
    })
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

fn images_request(model: &str, prompt: &str) -> Value {
    json!({
        "model": model,
        "prompt": prompt,
        "n": 1,
    })
}

fn chat_image_request(model: &str, prompt: &str, base_image: Option<&GeneratedImage>) -> Value {
    let mut content = vec![json!({ "type": "text", "text": prompt })];
    if let Some(image) = base_image {
        content.push(json!({
            "type": "image_url",
            "image_url": { "url": image.to_data_url() },
        }));
    }
    json!({
        "model": model,
        "modalities": ["image", "text"],
        "messages": [{ "role": "user", "content": content }],
    })
}

fn chat_request(model: &str, system_prompt: Option<&str>, history: &[ChatTurn]) -> Value {
    let system = system_prompt.map(|s| ChatTurn {
        role: ChatRole::System,
        content: s.to_string(),
    });
    let messages: Vec<&ChatTurn> = system.iter().chain(history.iter()).collect();
    json!({
        "model": model,
        "messages": messages,
    })
}

// ---------------------------------------------------------------------------
// Mime sniffing
// ---------------------------------------------------------------------------

fn sniff_mime(bytes: &[u8]) -> Option<String> {
    image::guess_format(bytes)
        .ok()
        .map(|format| format.to_mime_type().to_string())
}
