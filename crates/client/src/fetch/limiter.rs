//! Per-host request spacing.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Last request time for one key. `None` until the first request.
type Slot = Arc<Mutex<Option<Instant>>>;

/// Enforces a minimum interval between consecutive requests sharing a key.
///
/// Requests under different keys never wait on each other. Callers under the
/// same key are serialized by the slot lock, so the spacing holds under
/// concurrency.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    slots: std::sync::Mutex<HashMap<String, Slot>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval, slots: std::sync::Mutex::new(HashMap::new()) }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    fn slot(&self, key: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key.to_string()).or_default())
    }

    /// Acquire permission to make a request under `key`, waiting if necessary.
    pub async fn acquire(&self, key: &str) {
        if self.min_interval.is_zero() {
            return;
        }

        let slot = self.slot(key);
        let mut last = slot.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                tracing::debug!(key, wait_ms = wait.as_millis() as u64, "rate limited");
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }
}
