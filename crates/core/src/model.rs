//! Canonical record shapes served by the read API.
//!
//! Auctions and items are produced wholesale by one aggregation run and
//! replaced wholesale by the next. Field names on the wire follow the source
//! site's shape (`snake_case`), except for the two reference fields
//! `itemIds` and `auctionId`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An image reference attached to an auction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ImageDescriptor {
    pub url: String,
}

/// Postal location of an auction, with optional coordinates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Location {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

/// A normalized auction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct AuctionRecord {
    pub id: String,
    pub title: String,
    /// Inner HTML of the description block.
    pub description: String,
    pub company_name: String,
    pub starts_at: Option<DateTime<Utc>>,
    pub scheduled_end_time: Option<DateTime<Utc>>,
    pub inspection_details: String,
    pub removal_details: String,
    pub buyer_responsibilities: String,
    pub status: String,
    pub online_only: bool,
    pub offline_only: bool,
    pub timezone: String,
    pub items_count: usize,
    pub coord_first_name: String,
    pub coord_last_name: String,
    pub coord_email: String,
    pub coord_phone: String,
    pub location: Option<Location>,
    pub featured_images: Vec<ImageDescriptor>,
    /// Detail page the record was scraped from.
    pub source: String,
    #[serde(rename = "itemIds")]
    pub item_ids: Vec<String>,
}

/// A normalized auction lot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ItemRecord {
    pub id: String,
    #[serde(rename = "auctionId")]
    pub auction_id: String,
    pub name: String,
    pub description: String,
    pub start_amount: Option<f64>,
    /// Bidding state exactly as the items API reported it.
    pub api_bidding_state: serde_json::Value,
    pub images: Vec<serde_json::Value>,
}

/// Identity of an item to be valued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValuationRequest {
    pub item_name: String,
    pub item_description: String,
    #[serde(default)]
    pub image_links: Vec<String>,
}

impl ValuationRequest {
    pub fn new(item_name: impl Into<String>, item_description: impl Into<String>, image_links: Vec<String>) -> Self {
        Self { item_name: item_name.into(), item_description: item_description.into(), image_links }
    }
}

/// Value estimate returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValuationResult {
    /// USD range such as `"$120–$140 USD"`, or `"Unknown"`.
    #[serde(default)]
    pub value_range: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub demand: String,
    #[serde(default)]
    pub special_considerations: String,
}

impl ValuationResult {
    /// Placeholder served when the provider answered with something other than
    /// the expected JSON object.
    pub fn unavailable() -> Self {
        Self {
            value_range: "Unable to generate estimate".into(),
            context: "The AI service returned an invalid response. This might be due to API limitations or the \
                      complexity of the item."
                .into(),
            demand: "Unknown".into(),
            special_considerations: "Please try again later or with more specific item details.".into(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        self.value_range == "Unable to generate estimate"
    }
}

/// Payload stored in the shared cache tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedValuation {
    pub result: ValuationResult,
    pub created_at: DateTime<Utc>,
}
