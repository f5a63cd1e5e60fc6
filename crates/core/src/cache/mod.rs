//! SQLite-backed shared cache tier.
//!
//! This module provides the persistent, content-addressed string store that
//! backs valuation caching across restarts and across processes pointed at
//! the same database file. It supports:
//!
//! - Content-addressed keys using SHA-256 fingerprints
//! - Expiry fixed at write time and enforced on read
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use hash::compute_fingerprint;
