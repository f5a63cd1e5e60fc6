//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::auctions::{health_impl, list_auctions_impl, list_items_impl, refresh_impl};
use crate::tools::metrics::{get_metrics_impl, reset_metrics_impl};
use crate::tools::valuation::{estimate_value_impl, estimate_values_batch_impl};
use crate::tools::{EstimateBatchParams, EstimateValueParams, ListItemsParams};

use bidscout_client::{Aggregator, ValuationService};
use bidscout_core::Metrics;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for bidscout.
#[derive(Clone)]
pub struct BidScoutServer {
    tool_router: ToolRouter<Self>,
    aggregator: Aggregator,
    valuation: ValuationService,
    metrics: Arc<Metrics>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl BidScoutServer {
    /// Create a new server handler over the shared aggregator and valuation service.
    pub fn new(aggregator: Aggregator, valuation: ValuationService) -> Self {
        let metrics = Arc::clone(valuation.metrics());
        Self { tool_router: Self::tool_router(), aggregator, valuation, metrics }
    }

    #[tool(description = "List every auction in the current snapshot with its details, location and item ids.")]
    async fn list_auctions(&self) -> Result<CallToolResult, McpError> {
        list_auctions_impl(self.aggregator.store()).await
    }

    #[tool(description = "List items in the current snapshot. Pass auction_id to return a single auction's items.")]
    async fn list_items(&self, params: Parameters<ListItemsParams>) -> Result<CallToolResult, McpError> {
        list_items_impl(self.aggregator.store(), params.0).await
    }

    /// Refresh the snapshot now.
    ///
    /// Joins the scheduled run if one is already in progress.
    #[tool(description = "Re-aggregate auctions and items from the source site now. Returns the run summary.")]
    async fn refresh_auctions(&self) -> Result<CallToolResult, McpError> {
        refresh_impl(&self.aggregator).await
    }

    #[tool(description = "Report auction and item counts, last aggregation time and shared cache status.")]
    async fn health(&self) -> Result<CallToolResult, McpError> {
        health_impl(&self.aggregator, self.valuation.shared_status()).await
    }

    #[tool(description = "Report cache hit/miss counters, provider calls and estimated inference cost in USD.")]
    async fn get_metrics(&self) -> Result<CallToolResult, McpError> {
        get_metrics_impl(&self.metrics).await
    }

    #[tool(description = "Reset all usage counters and the cost total. Returns the zeroed metrics.")]
    async fn reset_metrics(&self) -> Result<CallToolResult, McpError> {
        reset_metrics_impl(&self.metrics).await
    }

    /// Estimate resale value of one item.
    ///
    /// Results are cached by a fingerprint of name, description and images.
    #[tool(
        description = "Estimate the resale value of an item from its name, description and optional image links. Returns valueRange, context, demand and specialConsiderations."
    )]
    async fn estimate_value(&self, params: Parameters<EstimateValueParams>) -> Result<CallToolResult, McpError> {
        estimate_value_impl(&self.valuation, params.0).await
    }

    #[tool(description = "Estimate several items in order. Every item is validated before any estimate is made.")]
    async fn estimate_values_batch(&self, params: Parameters<EstimateBatchParams>) -> Result<CallToolResult, McpError> {
        estimate_values_batch_impl(&self.valuation, params.0).await
    }
}

impl ServerHandler for BidScoutServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "bidscout".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Auction listings aggregated from the source site, plus AI resale estimates for their items.".into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
