//! URL normalization and rate-limit keys for source requests.

use url::Url;

/// Error type for URL normalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Normalize a source URL before it is requested.
///
/// Trims whitespace, requires `http`/`https`, and drops the fragment
/// (listing pages are linked with `#anchor` suffixes that never reach the server).
pub fn canonicalize(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Key under which requests to `url` are rate limited: its host, so every
/// page of one site shares a budget. URLs without a host use the full URL.
pub fn rate_key(url: &Url) -> String {
    match url.host_str() {
        Some(host) => host.to_ascii_lowercase(),
        None => url.as_str().to_string(),
    }
}
