//! Response-shape normalization.
//!
//! Providers put generated images (and chat text) in different places. Each
//! known location is a tagged strategy; [`extract_image`] and
//! [`extract_text`] try them in a fixed order and return the first hit, so
//! every shape can be tested on its own.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Where an image payload was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// Base64 bytes carried in the response; mime type when the provider said.
    Inline {
        data: String,
        mime_type: Option<String>,
    },
    /// A URL that must be fetched with a follow-up request.
    Remote { url: String },
}

// ---------------------------------------------------------------------------
// Image strategies
// ---------------------------------------------------------------------------

/// Known locations of an image in a provider response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStrategy {
    /// `{"data": [{"b64_json": ..} | {"url": ..}]}` (images endpoint).
    DataArray,
    /// `choices[0].message.images[]` (multimodal chat with an images list).
    MessageImages,
    /// `choices[0].message.content[]` typed parts.
    MessageContentParts,
    /// `choices[0].message.content` as a string with a data URL or link.
    MessageContentString,
    /// `candidates[0].content.parts[].inlineData` (Gemini-style).
    CandidateParts,
}

/// Order in which image strategies are tried.
pub const IMAGE_STRATEGIES: [ImageStrategy; 5] = [
    ImageStrategy::DataArray,
    ImageStrategy::MessageImages,
    ImageStrategy::MessageContentParts,
    ImageStrategy::MessageContentString,
    ImageStrategy::CandidateParts,
];

impl ImageStrategy {
    /// Apply this strategy alone.
    pub fn extract(self, body: &Value) -> Option<ImageRef> {
        match self {
            ImageStrategy::DataArray => body
                .get("data")?
                .as_array()?
                .iter()
                .find_map(|item| {
                    non_empty_str(item.get("b64_json"))
                        .map(|data| ImageRef::Inline {
                            data: data.to_string(),
                            mime_type: None,
                        })
                        .or_else(|| non_empty_str(item.get("url")).and_then(image_ref_from_url))
                }),
            ImageStrategy::MessageImages => first_message(body)?
                .get("images")?
                .as_array()?
                .iter()
                .find_map(|item| match item {
                    Value::String(url) => image_ref_from_url(url),
                    other => image_ref_from_part(other),
                }),
            ImageStrategy::MessageContentParts => first_message(body)?
                .get("content")?
                .as_array()?
                .iter()
                .filter(|part| !is_text_part(part))
                .find_map(image_ref_from_part),
            ImageStrategy::MessageContentString => {
                let content = first_message(body)?.get("content")?.as_str()?;
                image_ref_from_text(content)
            }
            ImageStrategy::CandidateParts => candidate_parts(body)?
                .iter()
                .find_map(|part| inline_data(part)),
        }
    }
}

/// Try every image strategy in order; returns the first match and which
/// strategy found it.
pub fn extract_image(body: &Value) -> Option<(ImageStrategy, ImageRef)> {
    IMAGE_STRATEGIES
        .iter()
        .find_map(|strategy| strategy.extract(body).map(|found| (*strategy, found)))
}

// ---------------------------------------------------------------------------
// Text strategies
// ---------------------------------------------------------------------------

/// Known locations of assistant text in a provider response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStrategy {
    /// `choices[0].message.content` as a plain string.
    MessageString,
    /// `choices[0].message.content[]` parts of type `text` / `output_text`.
    MessageTextParts,
    /// `candidates[0].content.parts[].text`.
    CandidateText,
    /// Top-level `output_text`.
    OutputText,
}

/// Order in which text strategies are tried.
pub const TEXT_STRATEGIES: [TextStrategy; 4] = [
    TextStrategy::MessageString,
    TextStrategy::MessageTextParts,
    TextStrategy::CandidateText,
    TextStrategy::OutputText,
];

impl TextStrategy {
    /// Apply this strategy alone. Blank text counts as no match.
    pub fn extract(self, body: &Value) -> Option<String> {
        let text = match self {
            TextStrategy::MessageString => first_message(body)?
                .get("content")?
                .as_str()
                .map(str::to_string),
            TextStrategy::MessageTextParts => join_texts(
                first_message(body)?
                    .get("content")?
                    .as_array()?
                    .iter()
                    .filter(|part| is_text_part(part)),
            ),
            TextStrategy::CandidateText => join_texts(candidate_parts(body)?.iter()),
            TextStrategy::OutputText => body.get("output_text")?.as_str().map(str::to_string),
        }?;
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

/// Try every text strategy in order.
pub fn extract_text(body: &Value) -> Option<String> {
    TEXT_STRATEGIES.iter().find_map(|strategy| strategy.extract(body))
}

// ---------------------------------------------------------------------------
// Provider error messages
// ---------------------------------------------------------------------------

const MAX_ERROR_MESSAGE_LENGTH: usize = 300;

/// Pull a human-readable message out of a provider error body.
///
/// Looks at `error.message`, `error` (string), `message` and `detail`, then
/// falls back to the raw body, truncated.
pub fn provider_error_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        let candidates = [
            json.pointer("/error/message"),
            json.get("error"),
            json.get("message"),
            json.get("detail"),
        ];
        if let Some(msg) = candidates.into_iter().find_map(non_empty_str) {
            return truncate(msg);
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "empty response body".to_string()
    } else {
        truncate(trimmed)
    }
}

fn truncate(s: &str) -> String {
    s.chars().take(MAX_ERROR_MESSAGE_LENGTH).collect()
}

// ---------------------------------------------------------------------------
// Shape helpers
// ---------------------------------------------------------------------------

static DATA_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"data:image/[A-Za-z0-9.+-]+;base64,[A-Za-z0-9+/=]+").expect("valid regex")
});

static MARKDOWN_IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\((\S+?)\)").expect("valid regex"));

static IMAGE_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s)"'<>]+\.(?:png|jpe?g|webp|gif)(?:\?[^\s)"'<>]*)?"#)
        .expect("valid regex")
});

fn first_message(body: &Value) -> Option<&Value> {
    body.pointer("/choices/0/message")
}

fn candidate_parts(body: &Value) -> Option<&Vec<Value>> {
    body.pointer("/candidates/0/content/parts")?.as_array()
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value?.as_str().map(str::trim).filter(|s| !s.is_empty())
}

fn is_text_part(part: &Value) -> bool {
    matches!(
        part.get("type").and_then(Value::as_str),
        Some("text") | Some("output_text")
    )
}

fn join_texts<'a>(parts: impl Iterator<Item = &'a Value>) -> Option<String> {
    let texts: Vec<&str> = parts
        .filter_map(|part| non_empty_str(part.get("text")))
        .collect();
    (!texts.is_empty()).then(|| texts.join("\n"))
}

/// `inline_data` / `inlineData` objects with `data` and a mime type.
fn inline_data(part: &Value) -> Option<ImageRef> {
    let inline = part.get("inline_data").or_else(|| part.get("inlineData"))?;
    let data = non_empty_str(inline.get("data"))?;
    let mime_type = non_empty_str(inline.get("mime_type"))
        .or_else(|| non_empty_str(inline.get("mimeType")))
        .map(str::to_string);
    Some(ImageRef::Inline {
        data: data.to_string(),
        mime_type,
    })
}

/// Interpret one typed content part (or an `images[]` object).
fn image_ref_from_part(part: &Value) -> Option<ImageRef> {
    if let Some(image_url) = part.get("image_url") {
        let url = match image_url {
            Value::String(s) => Some(s.as_str()),
            other => non_empty_str(other.get("url")),
        };
        if let Some(found) = url.and_then(image_ref_from_url) {
            return Some(found);
        }
    }

    if let Some(found) = inline_data(part) {
        return Some(found);
    }

    let mime_type = non_empty_str(part.get("mime_type"))
        .or_else(|| non_empty_str(part.get("mimeType")))
        .map(str::to_string);
    for key in ["b64_json", "image_base64", "data"] {
        if let Some(data) = non_empty_str(part.get(key)) {
            if data.starts_with("data:") {
                return parse_data_url(data);
            }
            return Some(ImageRef::Inline {
                data: data.to_string(),
                mime_type,
            });
        }
    }

    non_empty_str(part.get("url")).and_then(image_ref_from_url)
}

/// Find an image reference embedded in free text.
fn image_ref_from_text(text: &str) -> Option<ImageRef> {
    if let Some(m) = DATA_URL_RE.find(text) {
        return parse_data_url(m.as_str());
    }
    if let Some(url) = MARKDOWN_IMAGE_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| image_ref_from_url(m.as_str()))
    {
        return Some(url);
    }
    IMAGE_LINK_RE.find(text).map(|m| ImageRef::Remote {
        url: m.as_str().to_string(),
    })
}

/// Classify a URL: `data:` URLs are inline, http(s) URLs are remote.
pub fn image_ref_from_url(url: &str) -> Option<ImageRef> {
    let url = url.trim();
    if url.starts_with("data:") {
        parse_data_url(url)
    } else if url.starts_with("https://") || url.starts_with("http://") {
        Some(ImageRef::Remote {
            url: url.to_string(),
        })
    } else {
        None
    }
}

/// Parse `data:<mime>;base64,<payload>`.
fn parse_data_url(url: &str) -> Option<ImageRef> {
    let rest = url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    if !header.split(';').any(|p| p == "base64") || payload.is_empty() {
        return None;
    }
    let mime_type = header
        .split(';')
        .next()
        .filter(|m| !m.is_empty())
        .map(str::to_string);
    Some(ImageRef::Inline {
        data: payload.to_string(),
        mime_type,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
