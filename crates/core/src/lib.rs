//! Core types and shared functionality for bidscout.
//!
//! This crate provides:
//! - The auction/item data model and the published snapshot store
//! - The shared valuation cache tier with SQLite backend
//! - Process-wide usage and cost metrics
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod model;
pub mod snapshot;

pub use cache::CacheDb;
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use metrics::{Metrics, MetricsSnapshot};
pub use model::{
    AuctionRecord, CachedValuation, ImageDescriptor, ItemRecord, Location, ValuationRequest, ValuationResult,
};
pub use snapshot::{Health, Snapshot, SnapshotStore};
