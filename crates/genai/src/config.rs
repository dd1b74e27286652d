use std::time::Duration;

/// Which endpoint serves plain (unconditioned) image generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMode {
    /// `POST /images/generations` with `{model, prompt}`.
    Images,
    /// `POST /chat/completions` with `modalities: ["image", "text"]`.
    Chat,
}

impl ImageMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "images" => Some(ImageMode::Images),
            "chat" => Some(ImageMode::Chat),
            _ => None,
        }
    }
}

/// Remote provider configuration.
#[derive(Debug, Clone)]
pub struct GenAiConfig {
    /// Base URL without trailing slash, e.g. `https://api.openai.com/v1`.
    pub api_url: String,
    pub api_key: String,
    pub image_model: String,
    pub chat_model: String,
    pub image_mode: ImageMode,
    /// Upper bound for every remote call, follow-up image fetches included.
    pub timeout: Duration,
    /// Optional system message prepended to every chat request.
    pub system_prompt: Option<String>,
}

const DEFAULT_API_URL: &str = "https://api.openai.com/v1";
const DEFAULT_IMAGE_MODEL: &str = "gpt-image-1";
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 90;

impl GenAiConfig {
    /// Load provider configuration from environment variables.
    ///
    /// | Env Var               | Required | Default                     |
    /// |-----------------------|----------|-----------------------------|
    /// | `GENAI_API_KEY`       | **yes**  | --                          |
    /// | `GENAI_API_URL`       | no       | `https://api.openai.com/v1` |
    /// | `GENAI_IMAGE_MODEL`   | no       | `gpt-image-1`               |
    /// | `GENAI_CHAT_MODEL`    | no       | `gpt-4o-mini`               |
    /// | `GENAI_IMAGE_MODE`    | no       | `images`                    |
    /// | `GENAI_TIMEOUT_SECS`  | no       | `90`                        |
    /// | `GENAI_SYSTEM_PROMPT` | no       | unset                       |
    ///
    /// # Panics
    ///
    /// Panics if `GENAI_API_KEY` is missing or any value fails to parse.
    pub fn from_env() -> Self {
        let api_key =
            std::env::var("GENAI_API_KEY").expect("GENAI_API_KEY must be set in the environment");
        assert!(!api_key.is_empty(), "GENAI_API_KEY must not be empty");

        let api_url = std::env::var("GENAI_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.into())
            .trim_end_matches('/')
            .to_string();

        let image_model =
            std::env::var("GENAI_IMAGE_MODEL").unwrap_or_else(|_| DEFAULT_IMAGE_MODEL.into());
        let chat_model =
            std::env::var("GENAI_CHAT_MODEL").unwrap_or_else(|_| DEFAULT_CHAT_MODEL.into());

        let image_mode = std::env::var("GENAI_IMAGE_MODE")
            .map(|v| ImageMode::parse(&v).expect("GENAI_IMAGE_MODE must be 'images' or 'chat'"))
            .unwrap_or(ImageMode::Images);

        let timeout_secs: u64 = std::env::var("GENAI_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECS.to_string())
            .parse()
            .expect("GENAI_TIMEOUT_SECS must be a valid u64");

        let system_prompt = std::env::var("GENAI_SYSTEM_PROMPT")
            .ok()
            .filter(|s| !s.trim().is_empty());

        Self {
            api_url,
            api_key,
            image_model,
            chat_model,
            image_mode,
            timeout: Duration::from_secs(timeout_secs),
            system_prompt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_mode_parsing_is_case_insensitive() {
        assert_eq!(ImageMode::parse("images"), Some(ImageMode::Images));
        assert_eq!(ImageMode::parse(" Chat "), Some(ImageMode::Chat));
        assert_eq!(ImageMode::parse("video"), None);
    }
}
