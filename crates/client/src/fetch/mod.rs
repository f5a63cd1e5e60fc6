//! Rate-limited, retrying HTTP fetch for source pages.
//!
//! ### Request pipeline
//! - Canonicalize the URL (http/https only, fragment dropped)
//! - Wait for the per-host rate limiter (default 2s between requests)
//! - GET through the transport under the retry policy (default 3 attempts,
//!   linear 1s backoff)
//!
//! ### Transport limits
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)
//! - Non-2xx responses are errors

pub mod error;
pub mod limiter;
pub mod retry;
pub mod url;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bidscout_core::AppConfig;
use reqwest::{Client, Url};

pub use error::FetchError;
pub use limiter::RateLimiter;
pub use retry::{Backoff, RetryExhausted, RetryPolicy, retry};
pub use url::{UrlError, canonicalize, rate_key};

/// One outbound GET returning the response body as text.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<String, FetchError>;
}

/// Configuration for the fetch pipeline.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "bidscout/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Minimum interval between requests to the same host (default: 2s)
    pub min_request_interval: Duration,

    pub retry: RetryPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "bidscout/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
            min_request_interval: Duration::from_millis(2000),
            retry: RetryPolicy::default(),
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: 5,
            min_request_interval: config.min_request_interval(),
            retry: RetryPolicy::linear(config.max_fetch_attempts, config.retry_base_delay()),
        }
    }
}

/// Production transport over reqwest.
pub struct ReqwestTransport {
    http: Client,
    max_bytes: usize,
}

impl ReqwestTransport {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()?;

        Ok(Self { http, max_bytes: config.max_bytes })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<String, FetchError> {
        let start = Instant::now();

        let response = self
            .http
            .get(url.as_str())
            .header("Accept", "text/html,application/json;q=0.9,*/*;q=0.8")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url: url.to_string(), status: status.as_u16() });
        }

        if let Some(len) = response.content_length()
            && len as usize > self.max_bytes
        {
            return Err(FetchError::TooLarge { size: len as usize, limit: self.max_bytes });
        }

        let body = response.text().await?;
        if body.len() > self.max_bytes {
            return Err(FetchError::TooLarge { size: body.len(), limit: self.max_bytes });
        }

        tracing::debug!(
            url = %url,
            status = status.as_u16(),
            bytes = body.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "fetched"
        );

        Ok(body)
    }
}

/// Fetcher that spaces requests per host and retries transient failures.
#[derive(Clone)]
pub struct RateLimitedFetcher {
    transport: Arc<dyn HttpTransport>,
    limiter: Arc<RateLimiter>,
    policy: RetryPolicy,
}

impl RateLimitedFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, min_request_interval: Duration, policy: RetryPolicy) -> Self {
        Self { transport, limiter: Arc::new(RateLimiter::new(min_request_interval)), policy }
    }

    /// Build the production fetcher over [`ReqwestTransport`].
    pub fn from_config(config: &FetchConfig) -> Result<Self, FetchError> {
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::new(Arc::new(transport), config.min_request_interval, config.retry))
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch `url_str` as text.
    ///
    /// The rate limiter is consulted once per call; retries run under the
    /// policy's backoff.
    pub async fn fetch(&self, url_str: &str) -> Result<String, FetchError> {
        let url = canonicalize(url_str).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        self.limiter.acquire(&rate_key(&url)).await;

        let transport = &self.transport;
        let target = &url;
        retry(&self.policy, url.as_str(), |_| async move { transport.get(target).await })
            .await
            .map_err(|exhausted| FetchError::Exhausted {
                url: url.to_string(),
                attempts: exhausted.attempts,
                last: Box::new(exhausted.last),
            })
    }
}
