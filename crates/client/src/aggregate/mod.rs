//! Aggregation runs: listing page, then per auction its detail page and items,
//! normalized and published as one snapshot.
//!
//! ### Run phases
//! `Idle -> ListingFetch -> (DetailFetch -> ItemsFetch -> Normalize)* -> Publish -> Idle`,
//! or `-> Failed` when the listing page cannot be fetched or parsed.
//!
//! Auctions are processed one after another. One that fails is logged and
//! left out; the rest of the run still publishes. A failed listing stage
//! publishes nothing, so readers keep the previous snapshot.

use std::sync::{Arc, Mutex, PoisonError};

use bidscout_core::{AppConfig, AuctionRecord, ItemRecord, Snapshot, SnapshotStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use url::Url;

use crate::fetch::{FetchError, RateLimitedFetcher};
use crate::flight::{FlightRole, SingleFlight};
use crate::parse::{self, AuctionDetails, AuctionListing, ItemFields, ParseError};

/// Where the source site lives.
#[derive(Debug, Clone)]
pub struct SiteEndpoints {
    pub listing_url: String,
    /// Base for resolving relative links on listing and detail pages.
    pub site_base: Url,
    /// Items API base; items live at `{base}/auctions/{id}/items`.
    pub items_api_base: String,
}

impl SiteEndpoints {
    pub fn new(listing_url: &str, site_base_url: &str, items_api_base: &str) -> Result<Self, bidscout_core::Error> {
        let site_base = Url::parse(site_base_url)
            .map_err(|e| bidscout_core::Error::InvalidUrl(format!("site base {site_base_url}: {e}")))?;
        Ok(Self {
            listing_url: listing_url.to_string(),
            site_base,
            items_api_base: items_api_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, bidscout_core::Error> {
        Self::new(&config.listing_url, &config.site_base_url, &config.items_api_base_url)
    }

    pub fn items_url(&self, auction_id: &str) -> String {
        format!("{}/auctions/{}/items", self.items_api_base, auction_id)
    }
}

/// Stage an aggregation run is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    ListingFetch,
    DetailFetch,
    ItemsFetch,
    Normalize,
    Publish,
    Failed,
}

/// An auction left out of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedAuction {
    pub id: String,
    pub reason: String,
}

/// Outcome of a run that published.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub auctions: usize,
    pub items: usize,
    pub skipped: Vec<SkippedAuction>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// A run that could not publish.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AggregateError {
    #[error("listing fetch failed: {0}")]
    Listing(FetchError),

    #[error("listing parse failed: {0}")]
    ListingParse(ParseError),
}

impl From<AggregateError> for bidscout_core::Error {
    fn from(err: AggregateError) -> Self {
        bidscout_core::Error::AggregationFailed(err.to_string())
    }
}

type RunOutcome = Result<RunSummary, AggregateError>;

struct Inner {
    fetcher: RateLimitedFetcher,
    endpoints: SiteEndpoints,
    store: Arc<SnapshotStore>,
    flight: SingleFlight<(), RunOutcome>,
    last_run: Mutex<Option<RunSummary>>,
    phase: Mutex<RunPhase>,
}

/// Sole writer of the snapshot store.
#[derive(Clone)]
pub struct Aggregator {
    inner: Arc<Inner>,
}

impl Aggregator {
    pub fn new(fetcher: RateLimitedFetcher, endpoints: SiteEndpoints, store: Arc<SnapshotStore>) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher,
                endpoints,
                store,
                flight: SingleFlight::new(),
                last_run: Mutex::new(None),
                phase: Mutex::new(RunPhase::Idle),
            }),
        }
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.inner.store
    }

    /// Run an aggregation, or join the one already in progress.
    pub async fn run(&self) -> Result<RunSummary, AggregateError> {
        let inner = Arc::clone(&self.inner);
        let (outcome, role) = self.inner.flight.run((), move || async move { inner.execute().await }).await;
        if role == FlightRole::Joined {
            tracing::debug!("joined in-progress aggregation run");
        }
        outcome
    }

    /// Summary of the most recent run that published.
    pub fn last_run(&self) -> Option<RunSummary> {
        self.inner.last_run.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn phase(&self) -> RunPhase {
        *self.inner.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Inner {
    fn set_phase(&self, phase: RunPhase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
    }

    async fn execute(&self) -> RunOutcome {
        let started_at = Utc::now();

        let listing = match self.fetch_listing().await {
            Ok(listing) => listing,
            Err(e) => {
                self.set_phase(RunPhase::Failed);
                tracing::error!(url = %self.endpoints.listing_url, error = %e, "aggregation failed, keeping previous snapshot");
                return Err(e);
            }
        };

        tracing::info!(auctions = listing.len(), "fetched auction list");

        let mut auctions = Vec::with_capacity(listing.len());
        let mut items = Vec::new();
        let mut skipped = Vec::new();

        for entry in &listing {
            match self.collect(entry).await {
                Ok((auction, auction_items)) => {
                    auctions.push(auction);
                    items.extend(auction_items);
                }
                Err(e) => {
                    tracing::warn!(auction_id = %entry.id, error = %e, "skipping auction");
                    skipped.push(SkippedAuction { id: entry.id.clone(), reason: e.to_string() });
                }
            }
        }

        self.set_phase(RunPhase::Publish);
        let finished_at = Utc::now();
        let summary = RunSummary { auctions: auctions.len(), items: items.len(), skipped, started_at, finished_at };
        self.store.publish(Snapshot::new(auctions, items, finished_at));

        *self.last_run.lock().unwrap_or_else(PoisonError::into_inner) = Some(summary.clone());
        self.set_phase(RunPhase::Idle);

        tracing::info!(
            auctions = summary.auctions,
            items = summary.items,
            skipped = summary.skipped.len(),
            "aggregation complete"
        );
        Ok(summary)
    }

    async fn fetch_listing(&self) -> Result<Vec<AuctionListing>, AggregateError> {
        self.set_phase(RunPhase::ListingFetch);
        let html = self.fetcher.fetch(&self.endpoints.listing_url).await.map_err(AggregateError::Listing)?;
        parse::parse_auction_list(&html, &self.endpoints.site_base).map_err(AggregateError::ListingParse)
    }

    async fn collect(&self, entry: &AuctionListing) -> Result<(AuctionRecord, Vec<ItemRecord>), bidscout_core::Error> {
        self.set_phase(RunPhase::DetailFetch);
        tracing::debug!(auction_id = %entry.id, url = %entry.details_url, "fetching details");
        let html = self.fetcher.fetch(&entry.details_url).await?;
        let details = parse::parse_auction_details(&html, &self.endpoints.site_base)?;

        self.set_phase(RunPhase::ItemsFetch);
        let body = self.fetcher.fetch(&self.endpoints.items_url(&entry.id)).await?;
        let fields = parse::parse_items_response(&body)?;

        self.set_phase(RunPhase::Normalize);
        Ok(normalize(entry, details, fields))
    }
}

/// Build the auction record and its items from one source response each.
///
/// `items_count` and `itemIds` come from the same item list that becomes the
/// item records, so they always agree.
pub fn normalize(
    entry: &AuctionListing,
    details: AuctionDetails,
    fields: Vec<ItemFields>,
) -> (AuctionRecord, Vec<ItemRecord>) {
    let items: Vec<ItemRecord> = fields
        .into_iter()
        .map(|f| ItemRecord {
            id: f.id,
            auction_id: entry.id.clone(),
            name: f.name,
            description: f.description,
            start_amount: f.start_amount,
            api_bidding_state: f.api_bidding_state,
            images: f.images,
        })
        .collect();

    let title = if details.title.is_empty() { entry.title.clone() } else { details.title };

    let auction = AuctionRecord {
        id: entry.id.clone(),
        title,
        description: details.description,
        company_name: details.company_name,
        starts_at: details.starts_at,
        scheduled_end_time: details.scheduled_end_time,
        inspection_details: details.inspection_details,
        removal_details: details.removal_details,
        buyer_responsibilities: details.buyer_responsibilities,
        status: details.status,
        online_only: details.online_only,
        offline_only: details.offline_only,
        timezone: details.timezone,
        items_count: items.len(),
        coord_first_name: details.contact.first_name,
        coord_last_name: details.contact.last_name,
        coord_email: details.contact.email,
        coord_phone: details.contact.phone,
        location: details.location,
        featured_images: details.featured_images,
        source: entry.details_url.clone(),
        item_ids: items.iter().map(|item| item.id.clone()).collect(),
    };

    (auction, items)
}
