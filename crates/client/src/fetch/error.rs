//! Fetch error types.

use std::sync::Arc;

/// Errors from a source fetch.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// URL could not be normalized.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Non-2xx response.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// Request timeout.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response body exceeds the configured limit.
    #[error("response too large: {size} bytes exceeds {limit}")]
    TooLarge { size: usize, limit: usize },

    /// Every attempt under the retry policy failed.
    #[error("failed to fetch {url} after {attempts} attempts: {last}")]
    Exhausted { url: String, attempts: u32, last: Box<FetchError> },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            let url = err.url().map(|u| u.to_string()).unwrap_or_default();
            FetchError::Timeout(url)
        } else {
            FetchError::Network(Arc::new(err))
        }
    }
}

impl From<FetchError> for bidscout_core::Error {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::InvalidUrl(msg) => bidscout_core::Error::InvalidUrl(msg),
            other => bidscout_core::Error::FetchExhausted(other.to_string()),
        }
    }
}
