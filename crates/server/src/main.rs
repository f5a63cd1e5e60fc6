//! bidscout server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use bidscout_client::{
    Aggregator, FetchConfig, InferenceBackend, OpenAiBackend, OpenAiConfig, RateLimitedFetcher, SharedCache,
    SiteEndpoints, ValuationConfig, ValuationService,
};
use bidscout_core::{AppConfig, CacheDb, Metrics, SnapshotStore};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod scheduler;
mod tools;

#[cfg(test)]
mod testing;

/// Open the shared tier. A failure leaves the service running on the memory tier alone.
async fn open_shared_cache(config: &AppConfig) -> Option<Arc<CacheDb>> {
    if !config.shared_cache_enabled {
        return None;
    }

    if let Some(parent) = config.db_path.parent()
        && !parent.as_os_str().is_empty()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        tracing::warn!(path = %parent.display(), error = %e, "could not create cache directory");
    }

    match CacheDb::open(&config.db_path).await {
        Ok(db) => {
            tracing::info!(path = %config.db_path.display(), "shared cache tier opened");
            Some(Arc::new(db))
        }
        Err(e) => {
            tracing::warn!(path = %config.db_path.display(), error = %e, "shared cache tier unavailable, continuing without it");
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    if config.require_openai_api_key().is_err() {
        tracing::warn!("BIDSCOUT_OPENAI_API_KEY is not set; valuation tools will fail until it is");
    }

    tracing::info!(listing_url = %config.listing_url, model = %config.model, "Starting bidscout server on stdio transport");

    let cache = open_shared_cache(&config).await;

    let fetcher = RateLimitedFetcher::from_config(&FetchConfig::from(&config))?;
    let endpoints = SiteEndpoints::from_config(&config)?;
    let aggregator = Aggregator::new(fetcher, endpoints, Arc::new(SnapshotStore::new()));

    let backend: Arc<dyn InferenceBackend> = Arc::new(OpenAiBackend::new(OpenAiConfig::from(&config))?);
    let shared = cache.clone().map(|db| db as Arc<dyn SharedCache>);
    let valuation = ValuationService::new(backend, shared, Arc::new(Metrics::new()), ValuationConfig::from(&config));

    let refresh = scheduler::spawn(aggregator.clone(), cache, config.refresh_interval());

    let handler = handler::BidScoutServer::new(aggregator, valuation);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;
    refresh.abort();

    Ok(())
}
