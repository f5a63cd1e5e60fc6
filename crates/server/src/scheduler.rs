//! Periodic aggregation.
//!
//! Runs go through [`Aggregator::run`], so a tick that lands while a manual
//! refresh is in progress joins it instead of starting a second run.

use std::sync::Arc;
use std::time::Duration;

use bidscout_client::Aggregator;
use bidscout_core::CacheDb;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Run the aggregator now and then every `every`. Expired shared-tier rows
/// are purged on the same tick.
pub fn spawn(aggregator: Aggregator, cache: Option<Arc<CacheDb>>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            tick(&aggregator, cache.as_deref()).await;
        }
    })
}

async fn tick(aggregator: &Aggregator, cache: Option<&CacheDb>) {
    match aggregator.run().await {
        Ok(summary) => tracing::info!(
            auctions = summary.auctions,
            items = summary.items,
            skipped = summary.skipped.len(),
            "scheduled aggregation published"
        ),
        Err(e) => tracing::warn!(error = %e, "scheduled aggregation failed, keeping previous snapshot"),
    }

    if let Some(cache) = cache {
        match cache.purge_expired_entries().await {
            Ok(0) => {}
            Ok(purged) => tracing::debug!(purged, "purged expired shared cache entries"),
            Err(e) => tracing::warn!(error = %e, "failed to purge shared cache entries"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StaticTransport, aggregator};
    use std::sync::atomic::Ordering;

    #[tokio::test(start_paused = true)]
    async fn test_runs_at_start_and_on_each_interval() {
        let transport = StaticTransport::with_auctions(&[("1", 2)]);
        let calls = transport.calls();
        let aggregator = aggregator(transport);

        let handle = spawn(aggregator.clone(), None, Duration::from_secs(600));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(aggregator.store().health().items, 2);
        // listing, detail, items
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 6);

        handle.abort();
    }

    #[tokio::test]
    async fn test_tick_purges_expired_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry("stale", "{}", Duration::ZERO).await.unwrap();
        db.put_entry("fresh", "{}", Duration::from_secs(600)).await.unwrap();

        let aggregator = aggregator(StaticTransport::with_auctions(&[("1", 1)]));
        tick(&aggregator, Some(&db)).await;

        assert!(db.get_entry("fresh").await.unwrap().is_some());
        assert_eq!(db.purge_expired_entries().await.unwrap(), 0);
    }
}
