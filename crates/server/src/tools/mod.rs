//! MCP tool implementations.
//!
//! This module contains all tools exposed by the bidscout server.

pub mod auctions;
pub mod metrics;
pub mod valuation;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

pub use auctions::ListItemsParams;
pub use valuation::{EstimateBatchParams, EstimateValueParams};

/// Serialize a tool output as the pretty-printed JSON text of a successful result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| bidscout_core::Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
