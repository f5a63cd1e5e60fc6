//! Usage and cost counters.

use bidscout_core::{Metrics, MetricsSnapshot};
use rmcp::{ErrorData as McpError, model::CallToolResult};

use super::json_result;

pub(crate) fn reset_and_snapshot(metrics: &Metrics) -> MetricsSnapshot {
    let before = metrics.snapshot();
    metrics.reset();
    tracing::info!(
        api_calls = before.provider.api_calls,
        estimated_cost_usd = before.provider.estimated_cost_usd,
        "metrics reset"
    );
    metrics.snapshot()
}

pub async fn get_metrics_impl(metrics: &Metrics) -> Result<CallToolResult, McpError> {
    json_result(&metrics.snapshot())
}

pub async fn reset_metrics_impl(metrics: &Metrics) -> Result<CallToolResult, McpError> {
    json_result(&reset_and_snapshot(metrics))
}
