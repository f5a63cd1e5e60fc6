//! Cache and inference usage counters.
//!
//! One [`Metrics`] value is created at start-up and shared by `Arc` with every
//! component that records into it. Counters only ever increase until
//! [`Metrics::reset`] is called.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug)]
struct Ledger {
    estimated_cost_usd: f64,
    last_reset: DateTime<Utc>,
}

/// Process-wide usage accumulator.
#[derive(Debug)]
pub struct Metrics {
    shared_hits: AtomicU64,
    shared_misses: AtomicU64,
    shared_errors: AtomicU64,
    memory_hits: AtomicU64,
    memory_misses: AtomicU64,
    provider_calls: AtomicU64,
    provider_errors: AtomicU64,
    deduplicated: AtomicU64,
    ledger: Mutex<Ledger>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared (persistent) tier counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SharedTierCounters {
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
}

/// In-process tier counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct MemoryTierCounters {
    pub hits: u64,
    pub misses: u64,
}

/// Inference provider usage.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCounters {
    pub api_calls: u64,
    pub errors: u64,
    /// Requests that joined an identical in-flight call instead of issuing their own.
    pub deduplicated: u64,
    #[serde(rename = "estimatedCostUSD")]
    pub estimated_cost_usd: f64,
}

/// Immutable copy of the counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub shared: SharedTierCounters,
    pub memory: MemoryTierCounters,
    pub provider: ProviderCounters,
    pub last_reset: DateTime<Utc>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            shared_hits: AtomicU64::new(0),
            shared_misses: AtomicU64::new(0),
            shared_errors: AtomicU64::new(0),
            memory_hits: AtomicU64::new(0),
            memory_misses: AtomicU64::new(0),
            provider_calls: AtomicU64::new(0),
            provider_errors: AtomicU64::new(0),
            deduplicated: AtomicU64::new(0),
            ledger: Mutex::new(Ledger { estimated_cost_usd: 0.0, last_reset: Utc::now() }),
        }
    }

    pub fn record_shared_hit(&self) {
        self.shared_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_shared_miss(&self) {
        self.shared_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_shared_error(&self) {
        self.shared_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_memory_hit(&self) {
        self.memory_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_memory_miss(&self) {
        self.memory_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_provider_call(&self) {
        self.provider_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_provider_error(&self) {
        self.provider_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deduplicated(&self) {
        self.deduplicated.fetch_add(1, Ordering::Relaxed);
    }

    /// Add an estimated cost in USD. Negative or non-finite amounts are ignored.
    pub fn add_cost(&self, usd: f64) {
        if !usd.is_finite() || usd < 0.0 {
            return;
        }
        let mut ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        ledger.estimated_cost_usd += usd;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let (estimated_cost_usd, last_reset) = {
            let ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
            (ledger.estimated_cost_usd, ledger.last_reset)
        };

        MetricsSnapshot {
            shared: SharedTierCounters {
                hits: self.shared_hits.load(Ordering::Relaxed),
                misses: self.shared_misses.load(Ordering::Relaxed),
                errors: self.shared_errors.load(Ordering::Relaxed),
            },
            memory: MemoryTierCounters {
                hits: self.memory_hits.load(Ordering::Relaxed),
                misses: self.memory_misses.load(Ordering::Relaxed),
            },
            provider: ProviderCounters {
                api_calls: self.provider_calls.load(Ordering::Relaxed),
                errors: self.provider_errors.load(Ordering::Relaxed),
                deduplicated: self.deduplicated.load(Ordering::Relaxed),
                estimated_cost_usd,
            },
            last_reset,
        }
    }

    /// Zero every counter and stamp `last_reset`.
    pub fn reset(&self) {
        let mut ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        for counter in [
            &self.shared_hits,
            &self.shared_misses,
            &self.shared_errors,
            &self.memory_hits,
            &self.memory_misses,
            &self.provider_calls,
            &self.provider_errors,
            &self.deduplicated,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        ledger.estimated_cost_usd = 0.0;
        ledger.last_reset = Utc::now();
    }
}
