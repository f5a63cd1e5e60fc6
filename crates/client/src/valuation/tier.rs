//! Cache tiers for valuation results.
//!
//! The shared tier is optional and may be unreachable; every failure there is
//! absorbed (logged, counted, treated as a miss) and moves the tier to
//! `Degraded`. A degraded tier is skipped until `retry_interval` has passed,
//! then the next call retries it and a success restores it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use bidscout_core::{CacheDb, CachedValuation, Error, Metrics, ValuationResult};
use chrono::Utc;
use tokio::time::Instant;

/// String key/value store with a TTL fixed at write time.
#[async_trait]
pub trait SharedCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, Error>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), Error>;
}

#[async_trait]
impl SharedCache for CacheDb {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        self.get_entry(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), Error> {
        self.put_entry(key, value, ttl).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TierState {
    Available,
    Degraded { since: Instant },
}

/// Reported state of the shared tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TierStatus {
    Available,
    Degraded,
}

pub struct SharedTier {
    backend: Arc<dyn SharedCache>,
    state: Mutex<TierState>,
    retry_interval: Duration,
    ttl: Duration,
    metrics: Arc<Metrics>,
}

impl SharedTier {
    pub fn new(backend: Arc<dyn SharedCache>, ttl: Duration, retry_interval: Duration, metrics: Arc<Metrics>) -> Self {
        Self { backend, state: Mutex::new(TierState::Available), retry_interval, ttl, metrics }
    }

    pub fn status(&self) -> TierStatus {
        match *self.state.lock().unwrap_or_else(PoisonError::into_inner) {
            TierState::Available => TierStatus::Available,
            TierState::Degraded { .. } => TierStatus::Degraded,
        }
    }

    fn should_try(&self) -> bool {
        match *self.state.lock().unwrap_or_else(PoisonError::into_inner) {
            TierState::Available => true,
            TierState::Degraded { since } => since.elapsed() >= self.retry_interval,
        }
    }

    fn mark_ok(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*state, TierState::Degraded { .. }) {
            tracing::info!("shared cache tier recovered");
            *state = TierState::Available;
        }
    }

    fn mark_failed(&self, op: &str, err: &Error) {
        self.metrics.record_shared_error();
        tracing::warn!(op, error = %err, "shared cache tier unavailable, degrading");
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = TierState::Degraded { since: Instant::now() };
    }

    fn is_fresh(&self, cached: &CachedValuation) -> bool {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
        cached.created_at.checked_add_signed(ttl).is_none_or(|expires| expires > Utc::now())
    }

    /// Look up a fresh result. Errors and undecodable payloads read as misses.
    pub async fn get(&self, key: &str) -> Option<ValuationResult> {
        if !self.should_try() {
            return None;
        }

        let raw = match self.backend.get(key).await {
            Ok(raw) => {
                self.mark_ok();
                raw
            }
            Err(e) => {
                self.mark_failed("get", &e);
                return None;
            }
        };

        let Some(raw) = raw else {
            self.metrics.record_shared_miss();
            return None;
        };

        match serde_json::from_str::<CachedValuation>(&raw) {
            Ok(cached) if self.is_fresh(&cached) => {
                self.metrics.record_shared_hit();
                Some(cached.result)
            }
            Ok(_) => {
                self.metrics.record_shared_miss();
                None
            }
            Err(e) => {
                self.metrics.record_shared_error();
                tracing::warn!(fingerprint = key, error = %e, "undecodable shared cache entry");
                None
            }
        }
    }

    /// Write-through. Failures are absorbed.
    pub async fn set(&self, key: &str, result: &ValuationResult) {
        if !self.should_try() {
            return;
        }

        let payload = CachedValuation { result: result.clone(), created_at: Utc::now() };
        let raw = match serde_json::to_string(&payload) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(fingerprint = key, error = %e, "could not encode cache entry");
                return;
            }
        };

        match self.backend.set(key, &raw, self.ttl).await {
            Ok(()) => self.mark_ok(),
            Err(e) => self.mark_failed("set", &e),
        }
    }
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    result: ValuationResult,
    inserted: Instant,
}

/// Process-local fingerprint → result map. TTL is checked on read.
#[derive(Debug)]
pub struct MemoryTier {
    ttl: Duration,
    entries: RwLock<HashMap<String, MemoryEntry>>,
}

impl MemoryTier {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: RwLock::new(HashMap::new()) }
    }

    pub fn get(&self, key: &str) -> Option<ValuationResult> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .filter(|entry| entry.inserted.elapsed() < self.ttl)
            .map(|entry| entry.result.clone())
    }

    /// Insert, pruning expired entries first.
    pub fn insert(&self, key: &str, result: ValuationResult) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, entry| entry.inserted.elapsed() < self.ttl);
        entries.insert(key.to_string(), MemoryEntry { result, inserted: Instant::now() });
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
