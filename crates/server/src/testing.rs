//! Fakes for the tool tests: a canned auction site and a fixed-answer provider.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bidscout_client::fetch::canonicalize;
use bidscout_client::valuation::{ChatMessage, Completion, Usage};
use bidscout_client::{
    Aggregator, FetchError, HttpTransport, InferenceBackend, ProviderError, RateLimitedFetcher, RetryPolicy,
    SiteEndpoints, ValuationConfig, ValuationService,
};
use bidscout_core::{Metrics, SnapshotStore};
use url::Url;

pub const LISTING_URL: &str = "https://auctions.test/#auctions-start";
const SITE_BASE: &str = "https://auctions.test";
const ITEMS_API: &str = "https://bid.auctions.test/api";

fn key(url: &str) -> String {
    canonicalize(url).map(|u| u.to_string()).unwrap_or_else(|_| url.to_string())
}

/// Serves fixed bodies per URL. Unknown URLs answer 404.
#[derive(Default)]
pub struct StaticTransport {
    pages: Mutex<HashMap<String, Result<String, u16>>>,
    calls: Arc<AtomicUsize>,
}

impl StaticTransport {
    /// A site listing `auctions`, each `(id, item count)`.
    pub fn with_auctions(auctions: &[(&str, usize)]) -> Self {
        let transport = Self::default();
        let listing: String = auctions
            .iter()
            .map(|(id, _)| format!(r#"<a href="/auctions/detail/bw{id}">Auction {id}</a>"#))
            .collect();
        transport.serve(LISTING_URL, &format!("<html><body>{listing}</body></html>"));

        for (id, count) in auctions {
            transport.serve(
                &format!("{SITE_BASE}/auctions/detail/bw{id}"),
                &format!("<html><body><h1>Auction {id}</h1><p>Estate lots.</p></body></html>"),
            );
            let items: Vec<_> = (0..*count)
                .map(|n| serde_json::json!({"id": format!("{id}-{n}"), "name": format!("Lot {n}")}))
                .collect();
            transport.serve(&format!("{ITEMS_API}/auctions/{id}/items"), &serde_json::json!(items).to_string());
        }
        transport
    }

    pub fn serve(&self, url: &str, body: &str) {
        self.pages.lock().unwrap().insert(key(url), Ok(body.to_string()));
    }

    pub fn fail(&self, url: &str) {
        self.pages.lock().unwrap().insert(key(url), Err(503));
    }

    /// Shared request counter, readable after the transport is moved.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl HttpTransport for StaticTransport {
    async fn get(&self, url: &Url) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let page = self.pages.lock().unwrap().get(url.as_str()).cloned();
        match page {
            Some(Ok(body)) => Ok(body),
            Some(Err(status)) => Err(FetchError::Status { url: url.to_string(), status }),
            None => Err(FetchError::Status { url: url.to_string(), status: 404 }),
        }
    }
}

pub fn aggregator(transport: StaticTransport) -> Aggregator {
    let endpoints = SiteEndpoints::new(LISTING_URL, SITE_BASE, ITEMS_API).unwrap();
    let fetcher = RateLimitedFetcher::new(Arc::new(transport), Duration::ZERO, RetryPolicy::no_retry());
    Aggregator::new(fetcher, endpoints, Arc::new(SnapshotStore::new()))
}

/// Provider that answers every call the same way and counts calls.
#[derive(Clone)]
pub struct StaticBackend {
    answer: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl StaticBackend {
    pub fn valuing(range: &str) -> Self {
        let answer = serde_json::json!({
            "valueRange": range,
            "context": "Comparable lots",
            "demand": "Moderate",
            "specialConsiderations": "None"
        });
        Self { answer: Some(answer.to_string()), calls: Arc::new(AtomicUsize::new(0)) }
    }

    pub fn failing() -> Self {
        Self { answer: None, calls: Arc::new(AtomicUsize::new(0)) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceBackend for StaticBackend {
    fn model(&self) -> &str {
        "gpt-4o-mini"
    }

    async fn complete(&self, _messages: Vec<ChatMessage>) -> Result<Completion, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.answer {
            Some(content) => {
                Ok(Completion { content: content.clone(), usage: Usage { prompt_tokens: 500, completion_tokens: 80 } })
            }
            None => Err(ProviderError::HttpError { status: 500, body: "upstream down".into() }),
        }
    }
}

pub fn valuation_service(backend: StaticBackend) -> ValuationService {
    ValuationService::new(Arc::new(backend), None, Arc::new(Metrics::new()), ValuationConfig::default())
}
