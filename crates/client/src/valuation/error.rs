//! Inference provider error types.

use std::sync::Arc;

/// Errors from a chat-completions call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// No API key configured.
    #[error("missing API key: BIDSCOUT_OPENAI_API_KEY not set")]
    MissingApiKey,

    /// Authentication failed (invalid API key).
    #[error("authentication failed: invalid API key")]
    AuthError,

    /// Rate limited by the provider.
    #[error("rate limited: too many requests")]
    RateLimited,

    /// Other non-2xx response.
    #[error("HTTP error: {status}")]
    HttpError { status: u16, body: String },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// A 2xx body that is not a completion envelope.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { ProviderError::Timeout } else { ProviderError::Network(Arc::new(err)) }
    }
}

impl From<ProviderError> for bidscout_core::Error {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::MissingApiKey => bidscout_core::Error::Config(err.to_string()),
            other => bidscout_core::Error::ProviderCallFailed(other.to_string()),
        }
    }
}
