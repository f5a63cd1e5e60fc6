//! Published auction/item state.
//!
//! The store holds one immutable [`Snapshot`] behind an `Arc`. Publishing
//! swaps the whole `Arc`, so a reader that called [`SnapshotStore::current`]
//! keeps a complete auctions/items pair even while a newer run publishes.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{AuctionRecord, ItemRecord};

/// A complete, internally consistent auctions/items pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub auctions: Vec<AuctionRecord>,
    pub items: Vec<ItemRecord>,
    /// `None` until the first successful aggregation.
    pub published_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn new(auctions: Vec<AuctionRecord>, items: Vec<ItemRecord>, published_at: DateTime<Utc>) -> Self {
        Self { auctions, items, published_at: Some(published_at) }
    }

    /// Every `itemIds` entry resolves to an item whose `auctionId` is the
    /// parent, and `items_count` agrees with `itemIds`.
    pub fn is_consistent(&self) -> bool {
        let owners: HashMap<&str, &str> = self
            .items
            .iter()
            .map(|item| (item.id.as_str(), item.auction_id.as_str()))
            .collect();

        self.auctions.iter().all(|auction| {
            auction.items_count == auction.item_ids.len()
                && auction
                    .item_ids
                    .iter()
                    .all(|id| owners.get(id.as_str()).is_some_and(|owner| *owner == auction.id))
        })
    }
}

/// Counts served by the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub auctions: usize,
    pub items: usize,
    pub last_aggregation_time: Option<DateTime<Utc>>,
}

/// Owner of the published snapshot. Single writer (the aggregator), many readers.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the published snapshot wholesale.
    pub fn publish(&self, snapshot: Snapshot) {
        let next = Arc::new(snapshot);
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = next;
    }

    /// The snapshot as of this call.
    pub fn current(&self) -> Arc<Snapshot> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*current)
    }

    pub fn auctions(&self) -> Vec<AuctionRecord> {
        self.current().auctions.clone()
    }

    /// Items, optionally restricted to one auction.
    pub fn items(&self, auction_id: Option<&str>) -> Vec<ItemRecord> {
        let snapshot = self.current();
        match auction_id {
            Some(id) => snapshot
                .items
                .iter()
                .filter(|item| item.auction_id == id)
                .cloned()
                .collect(),
            None => snapshot.items.clone(),
        }
    }

    pub fn health(&self) -> Health {
        let snapshot = self.current();
        Health {
            auctions: snapshot.auctions.len(),
            items: snapshot.items.len(),
            last_aggregation_time: snapshot.published_at,
        }
    }
}
