//! Client code for bidscout.
//!
//! This crate provides the rate-limited fetch pipeline, the auction site
//! parsers, the aggregator that publishes snapshots, and the valuation
//! service with its inference provider.

pub mod aggregate;
pub mod fetch;
pub mod flight;
pub mod parse;
pub mod valuation;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregate::{AggregateError, Aggregator, RunPhase, RunSummary, SiteEndpoints, SkippedAuction};
pub use fetch::{FetchConfig, FetchError, HttpTransport, RateLimitedFetcher, ReqwestTransport, RetryPolicy};
pub use valuation::{
    InferenceBackend, OpenAiBackend, OpenAiConfig, ProviderError, SharedCache, TierStatus, ValuationConfig,
    ValuationService,
};
