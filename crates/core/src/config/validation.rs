//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

/// Upper bound for `valuation_ttl_secs`: 30 days.
const MAX_VALUATION_TTL_SECS: u64 = 30 * 24 * 60 * 60;

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `max_fetch_attempts` is 0 or exceeds 10
    /// - `refresh_interval_secs` is below 60 seconds
    /// - `valuation_ttl_secs` is 0 or exceeds 30 days
    /// - `user_agent`, `model` or any source URL is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.max_fetch_attempts == 0 {
            return Err(invalid("max_fetch_attempts", "must be at least 1"));
        }
        if self.max_fetch_attempts > 10 {
            return Err(invalid("max_fetch_attempts", "must not exceed 10"));
        }

        if self.refresh_interval_secs < 60 {
            return Err(invalid("refresh_interval_secs", "must be at least 60 seconds"));
        }

        if self.valuation_ttl_secs == 0 {
            return Err(invalid("valuation_ttl_secs", "must be greater than 0"));
        }
        if self.valuation_ttl_secs > MAX_VALUATION_TTL_SECS {
            return Err(invalid("valuation_ttl_secs", "must not exceed 30 days (2592000s)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }
        if self.model.is_empty() {
            return Err(invalid("model", "must not be empty"));
        }

        for (field, value) in [
            ("listing_url", &self.listing_url),
            ("site_base_url", &self.site_base_url),
            ("items_api_base_url", &self.items_api_base_url),
            ("openai_base_url", &self.openai_base_url),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(field, "must not be empty"));
            }
        }

        if self.min_request_interval_ms == 0 {
            tracing::warn!("min_request_interval_ms is 0; source requests will not be rate limited");
        }

        Ok(())
    }
}
