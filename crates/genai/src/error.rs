/// Errors from the remote generation provider.
///
/// Every variant renders a short message suitable for showing to a user; the
/// API layer maps all of them to 502.
#[derive(Debug, thiserror::Error)]
pub enum GenAiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("Generation request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status, or a 2xx body holding only an
    /// `error` object.
    #[error("Generation provider error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the provider's error body.
        message: String,
    },

    /// The response body was not what any extraction strategy understands.
    #[error("Malformed provider response: {0}")]
    Malformed(String),

    /// The response parsed but contained no image or text.
    #[error("Provider returned no content: {0}")]
    Empty(String),
}
