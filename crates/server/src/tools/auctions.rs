//! Snapshot read tools and the manual refresh trigger.

use bidscout_client::{Aggregator, RunPhase, RunSummary, TierStatus};
use bidscout_core::{AuctionRecord, Health, ItemRecord, SnapshotStore};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Parameters for the list_items tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListItemsParams {
    /// Only return items of this auction.
    #[serde(default, alias = "auctionId")]
    pub auction_id: Option<String>,
}

/// Output from the list_auctions tool.
#[derive(Debug, Clone, Serialize)]
pub struct AuctionsOutput {
    pub auctions: Vec<AuctionRecord>,
}

/// Output from the list_items tool.
#[derive(Debug, Clone, Serialize)]
pub struct ItemsOutput {
    pub items: Vec<ItemRecord>,
}

/// Output from the health tool.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthOutput {
    pub status: &'static str,
    #[serde(flatten)]
    pub counts: Health,
    pub aggregation_phase: RunPhase,
    /// Absent when no shared cache tier is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_cache: Option<TierStatus>,
}

pub(crate) fn items_output(store: &SnapshotStore, params: &ListItemsParams) -> ItemsOutput {
    let filter = params.auction_id.as_deref().map(str::trim).filter(|id| !id.is_empty());
    ItemsOutput { items: store.items(filter) }
}

pub(crate) fn health_output(aggregator: &Aggregator, shared_cache: Option<TierStatus>) -> HealthOutput {
    HealthOutput {
        status: "ok",
        counts: aggregator.store().health(),
        aggregation_phase: aggregator.phase(),
        shared_cache,
    }
}

pub async fn list_auctions_impl(store: &SnapshotStore) -> Result<CallToolResult, McpError> {
    json_result(&AuctionsOutput { auctions: store.auctions() })
}

pub async fn list_items_impl(store: &SnapshotStore, params: ListItemsParams) -> Result<CallToolResult, McpError> {
    json_result(&items_output(store, &params))
}

/// Run an aggregation (or join the one in progress) and report its summary.
pub async fn refresh_impl(aggregator: &Aggregator) -> Result<CallToolResult, McpError> {
    let summary: RunSummary = aggregator.run().await.map_err(bidscout_core::Error::from)?;
    json_result(&summary)
}

pub async fn health_impl(aggregator: &Aggregator, shared_cache: Option<TierStatus>) -> Result<CallToolResult, McpError> {
    json_result(&health_output(aggregator, shared_cache))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{LISTING_URL, StaticTransport, aggregator};

    #[tokio::test]
    async fn test_list_items_filter() {
        let transport = StaticTransport::with_auctions(&[("1", 2), ("2", 3)]);
        let aggregator = aggregator(transport);
        aggregator.run().await.unwrap();

        let all = items_output(aggregator.store(), &ListItemsParams::default());
        assert_eq!(all.items.len(), 5);

        let params = ListItemsParams { auction_id: Some("2".into()) };
        let filtered = items_output(aggregator.store(), &params);
        assert_eq!(filtered.items.len(), 3);
        assert!(filtered.items.iter().all(|item| item.auction_id == "2"));

        let blank = ListItemsParams { auction_id: Some("  ".into()) };
        assert_eq!(items_output(aggregator.store(), &blank).items.len(), 5);
    }

    #[test]
    fn test_list_items_params_accept_camel_case() {
        let params: ListItemsParams = serde_json::from_str(r#"{"auctionId": "139759"}"#).unwrap();
        assert_eq!(params.auction_id.as_deref(), Some("139759"));
    }

    #[tokio::test]
    async fn test_health_before_and_after_refresh() {
        let aggregator = aggregator(StaticTransport::with_auctions(&[("1", 4)]));

        let before = health_output(&aggregator, None);
        assert_eq!(before.counts.auctions, 0);
        assert!(before.counts.last_aggregation_time.is_none());

        assert!(refresh_impl(&aggregator).await.is_ok());

        let after = health_output(&aggregator, Some(TierStatus::Available));
        assert_eq!(after.counts.auctions, 1);
        assert_eq!(after.counts.items, 4);
        assert_eq!(after.aggregation_phase, RunPhase::Idle);

        let json = serde_json::to_value(&after).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["items"], 4);
        assert!(json.get("lastAggregationTime").is_some());
        assert_eq!(json["sharedCache"], "available");
    }

    #[tokio::test]
    async fn test_refresh_reports_listing_failure() {
        let transport = StaticTransport::default();
        transport.fail(LISTING_URL);
        let aggregator = aggregator(transport);

        assert!(refresh_impl(&aggregator).await.is_err());
        assert_eq!(aggregator.phase(), RunPhase::Failed);
    }

    #[tokio::test]
    async fn test_list_auctions() {
        let aggregator = aggregator(StaticTransport::with_auctions(&[("7", 1)]));
        aggregator.run().await.unwrap();
        assert!(list_auctions_impl(aggregator.store()).await.is_ok());
        assert!(list_items_impl(aggregator.store(), ListItemsParams::default()).await.is_ok());
    }
}
