//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (BIDSCOUT_*)
//! 2. TOML config file (if BIDSCOUT_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (BIDSCOUT_*)
/// 2. TOML config file (if BIDSCOUT_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// OpenAI API key for valuation requests.
    ///
    /// Set via BIDSCOUT_OPENAI_API_KEY environment variable.
    /// Required only when a valuation misses both cache tiers.
    #[serde(default)]
    pub openai_api_key: Option<String>,

    /// Base URL of the chat-completions API.
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    /// Vision-capable model used for valuations.
    #[serde(default = "default_model")]
    pub model: String,

    /// Path to the SQLite database backing the shared cache tier.
    ///
    /// Set via BIDSCOUT_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Whether the shared cache tier is used at all.
    #[serde(default = "default_true")]
    pub shared_cache_enabled: bool,

    /// User-Agent string for outbound HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to read per source response.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Auction listing page.
    #[serde(default = "default_listing_url")]
    pub listing_url: String,

    /// Base URL used to resolve relative links on the source site.
    #[serde(default = "default_site_base_url")]
    pub site_base_url: String,

    /// Base URL of the live-bidding items API.
    #[serde(default = "default_items_api_base_url")]
    pub items_api_base_url: String,

    /// Minimum interval between two requests to the same source, in milliseconds.
    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,

    /// Attempts per fetch before giving up.
    #[serde(default = "default_max_fetch_attempts")]
    pub max_fetch_attempts: u32,

    /// Linear backoff base, in milliseconds (`attempt * base`).
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Scheduled aggregation interval, in seconds.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Valuation cache TTL, in seconds.
    #[serde(default = "default_valuation_ttl_secs")]
    pub valuation_ttl_secs: u64,

    /// How long a degraded shared tier is skipped before it is retried.
    #[serde(default = "default_shared_retry_interval_secs")]
    pub shared_retry_interval_secs: u64,
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_model() -> String {
    "gpt-4o".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./bidscout-cache.sqlite")
}

fn default_user_agent() -> String {
    "bidscout/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_listing_url() -> String {
    "https://www.dickensheet.com/#auctions-start".into()
}

fn default_site_base_url() -> String {
    "https://www.dickensheet.com".into()
}

fn default_items_api_base_url() -> String {
    "https://bid.dickensheet.com/api".into()
}

fn default_min_request_interval_ms() -> u64 {
    2_000
}

fn default_max_fetch_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1_000
}

fn default_refresh_interval_secs() -> u64 {
    600
}

fn default_valuation_ttl_secs() -> u64 {
    600
}

fn default_shared_retry_interval_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: default_openai_base_url(),
            model: default_model(),
            db_path: default_db_path(),
            shared_cache_enabled: true,
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            listing_url: default_listing_url(),
            site_base_url: default_site_base_url(),
            items_api_base_url: default_items_api_base_url(),
            min_request_interval_ms: default_min_request_interval_ms(),
            max_fetch_attempts: default_max_fetch_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            refresh_interval_secs: default_refresh_interval_secs(),
            valuation_ttl_secs: default_valuation_ttl_secs(),
            shared_retry_interval_secs: default_shared_retry_interval_secs(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn valuation_ttl(&self) -> Duration {
        Duration::from_secs(self.valuation_ttl_secs)
    }

    pub fn shared_retry_interval(&self) -> Duration {
        Duration::from_secs(self.shared_retry_interval_secs)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `BIDSCOUT_`
    /// 2. TOML file from `BIDSCOUT_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("BIDSCOUT_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("BIDSCOUT_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Check if the OpenAI API key is available (for deferred validation).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the key is not set or blank.
    pub fn require_openai_api_key(&self) -> Result<&str, ConfigError> {
        self.openai_api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::Missing {
                field: "openai_api_key".into(),
                hint: "Set BIDSCOUT_OPENAI_API_KEY environment variable".into(),
            })
    }
}
