//! Unified error types for bidscout.
//!
//! Client-side errors (fetch, parse, provider) convert into these so the
//! server can map every failure to a single MCP error code table.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the bidscout services.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty item name).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Network retries exhausted for a source page.
    #[error("FETCH_EXHAUSTED: {0}")]
    FetchExhausted(String),

    /// Markup or JSON the parser cannot traverse.
    #[error("PARSE_UNAVAILABLE: {0}")]
    ParseUnavailable(String),

    /// Items API returned neither an array nor an `items` array.
    #[error("UNEXPECTED_FORMAT: {0}")]
    UnexpectedFormat(String),

    /// The listing stage failed, so no snapshot was published.
    #[error("AGGREGATION_FAILED: {0}")]
    AggregationFailed(String),

    /// The inference provider could not be reached or returned an error status.
    #[error("PROVIDER_CALL_FAILED: {0}")]
    ProviderCallFailed(String),

    /// Shared cache tier unreachable.
    #[error("CACHE_TIER_UNAVAILABLE: {0}")]
    CacheTierUnavailable(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Required configuration is missing.
    #[error("CONFIG_ERROR: {0}")]
    Config(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<crate::config::ConfigError> for Error {
    fn from(err: crate::config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::FetchExhausted(msg) => (-32000, msg.clone()),
            Error::ParseUnavailable(msg) => (-32001, msg.clone()),
            Error::UnexpectedFormat(msg) => (-32001, msg.clone()),
            Error::AggregationFailed(msg) => (-32003, msg.clone()),
            Error::ProviderCallFailed(msg) => (-32004, msg.clone()),
            Error::CacheTierUnavailable(msg) => (-32002, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::InvalidUrl(msg) => (-32005, msg.clone()),
            Error::Config(msg) => (-32006, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::ProviderCallFailed("status 500".to_string());
        assert!(err.to_string().starts_with("PROVIDER_CALL_FAILED"));
        assert!(err.to_string().contains("status 500"));
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::InvalidInput("item_name cannot be empty".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32602);

        let mcp_err: McpError = Error::ProviderCallFailed("timeout".into()).into();
        assert_eq!(mcp_err.code.0, -32004);
    }

    #[test]
    fn test_config_error_conversion() {
        let err: Error = crate::config::ConfigError::Missing { field: "openai_api_key".into(), hint: "set it".into() }.into();
        assert!(matches!(err, Error::Config(msg) if msg.contains("openai_api_key")));
    }
}
