//! AI valuation service: two cache tiers in front of the inference provider.
//!
//! ### Lookup order
//! 1. Shared tier (if configured and not degraded)
//! 2. In-process tier
//! 3. Provider call, coalesced per fingerprint, then written through to both tiers
//!
//! Provider failures are propagated and never cached. A provider answer that
//! is not a valuation object becomes [`ValuationResult::unavailable`], which
//! is cached like any other result.

pub mod error;
pub mod pricing;
pub mod prompt;
pub mod provider;
pub mod tier;

use std::sync::Arc;
use std::time::Duration;

use bidscout_core::cache::compute_fingerprint;
use bidscout_core::{AppConfig, Metrics, ValuationRequest, ValuationResult};
use serde::Deserialize;

use crate::flight::{FlightRole, SingleFlight};

pub use error::ProviderError;
pub use pricing::estimate_cost;
pub use prompt::{ContentPart, ImageSource, build_messages};
pub use provider::{ChatMessage, Completion, InferenceBackend, OpenAiBackend, OpenAiConfig, Usage};
pub use tier::{MemoryTier, SharedCache, SharedTier, TierStatus};

/// Cache lifetimes for the valuation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValuationConfig {
    /// TTL applied to both tiers (default: 10 minutes)
    pub ttl: Duration,

    /// Wait before probing a degraded shared tier (default: 30s)
    pub retry_interval: Duration,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self { ttl: Duration::from_secs(600), retry_interval: Duration::from_secs(30) }
    }
}

impl From<&AppConfig> for ValuationConfig {
    fn from(config: &AppConfig) -> Self {
        Self { ttl: config.valuation_ttl(), retry_interval: config.shared_retry_interval() }
    }
}

type FillOutcome = Result<ValuationResult, ProviderError>;

struct Inner {
    backend: Arc<dyn InferenceBackend>,
    memory: MemoryTier,
    shared: Option<SharedTier>,
    metrics: Arc<Metrics>,
    in_flight: SingleFlight<String, FillOutcome>,
}

#[derive(Clone)]
pub struct ValuationService {
    inner: Arc<Inner>,
}

impl ValuationService {
    pub fn new(
        backend: Arc<dyn InferenceBackend>,
        shared: Option<Arc<dyn SharedCache>>,
        metrics: Arc<Metrics>,
        config: ValuationConfig,
    ) -> Self {
        let shared =
            shared.map(|backend| SharedTier::new(backend, config.ttl, config.retry_interval, Arc::clone(&metrics)));
        Self {
            inner: Arc::new(Inner {
                backend,
                memory: MemoryTier::new(config.ttl),
                shared,
                metrics,
                in_flight: SingleFlight::new(),
            }),
        }
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.inner.metrics
    }

    /// `None` when no shared tier is configured.
    pub fn shared_status(&self) -> Option<TierStatus> {
        self.inner.shared.as_ref().map(SharedTier::status)
    }

    /// Value one item.
    pub async fn get_valuation(&self, request: &ValuationRequest) -> Result<ValuationResult, bidscout_core::Error> {
        let fingerprint =
            compute_fingerprint(&request.item_name, &request.item_description, &request.image_links);

        if let Some(shared) = &self.inner.shared
            && let Some(hit) = shared.get(&fingerprint).await
        {
            tracing::debug!(fingerprint = %fingerprint, "shared tier hit");
            return Ok(hit);
        }

        if let Some(hit) = self.inner.memory.get(&fingerprint) {
            self.inner.metrics.record_memory_hit();
            tracing::debug!(fingerprint = %fingerprint, "memory tier hit");
            return Ok(hit);
        }
        self.inner.metrics.record_memory_miss();

        let inner = Arc::clone(&self.inner);
        let key = fingerprint.clone();
        let request = request.clone();
        let (outcome, role) = self
            .inner
            .in_flight
            .run(fingerprint.clone(), move || async move { inner.fill(&key, &request).await })
            .await;

        if role == FlightRole::Joined {
            self.inner.metrics.record_deduplicated();
            tracing::debug!(fingerprint = %fingerprint, "joined in-flight valuation");
        }

        outcome.map_err(bidscout_core::Error::from)
    }

    /// Value items one after another, preserving order. The first hard
    /// error aborts the batch.
    pub async fn get_valuations_batch(
        &self,
        requests: &[ValuationRequest],
    ) -> Result<Vec<ValuationResult>, bidscout_core::Error> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.get_valuation(request).await?);
        }
        Ok(results)
    }
}

impl Inner {
    async fn fill(&self, fingerprint: &str, request: &ValuationRequest) -> FillOutcome {
        self.metrics.record_provider_call();

        let result = match call_provider(self.backend.as_ref(), &self.metrics, request).await {
            Ok(result) => result,
            Err(e) => {
                self.metrics.record_provider_error();
                tracing::warn!(fingerprint, error = %e, "inference provider call failed");
                return Err(e);
            }
        };

        if let Some(shared) = &self.shared {
            shared.set(fingerprint, &result).await;
        }
        self.memory.insert(fingerprint, result.clone());

        Ok(result)
    }
}

/// Shape the provider is asked to answer with. `valueRange` is mandatory.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderPayload {
    value_range: String,
    #[serde(default)]
    context: String,
    #[serde(default)]
    demand: String,
    #[serde(default)]
    special_considerations: String,
}

fn parse_valuation(content: &str) -> ValuationResult {
    match serde_json::from_str::<ProviderPayload>(content) {
        Ok(payload) => ValuationResult {
            value_range: payload.value_range,
            context: payload.context,
            demand: payload.demand,
            special_considerations: payload.special_considerations,
        },
        Err(e) => {
            let preview: String = content.chars().take(200).collect();
            tracing::warn!(error = %e, content = %preview, "provider answer is not a valuation object");
            ValuationResult::unavailable()
        }
    }
}

/// One provider round trip: build the prompt, call, meter cost, parse.
pub async fn call_provider(
    backend: &dyn InferenceBackend,
    metrics: &Metrics,
    request: &ValuationRequest,
) -> Result<ValuationResult, ProviderError> {
    let messages = build_messages(request);

    let completion = match backend.complete(messages).await {
        Ok(completion) => completion,
        Err(ProviderError::MalformedResponse(msg)) => {
            tracing::warn!(error = %msg, "malformed completion envelope");
            return Ok(ValuationResult::unavailable());
        }
        Err(e) => return Err(e),
    };

    metrics.add_cost(estimate_cost(backend.model(), &completion.usage));
    Ok(parse_valuation(&completion.content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBackend, FakeSharedCache};

    fn vase() -> ValuationRequest {
        ValuationRequest::new("Vase", "Blue ceramic vase", Vec::new())
    }

    fn service(backend: Arc<FakeBackend>, shared: Option<Arc<FakeSharedCache>>) -> ValuationService {
        let shared = shared.map(|s| s as Arc<dyn SharedCache>);
        ValuationService::new(backend, shared, Arc::new(Metrics::new()), ValuationConfig::default())
    }

    #[tokio::test]
    async fn test_repeat_request_served_from_memory() {
        let backend = Arc::new(FakeBackend::valuing("$40–$48 USD"));
        let service = service(Arc::clone(&backend), None);

        let first = service.get_valuation(&vase()).await.unwrap();
        let second = service.get_valuation(&vase()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.value_range, "$40–$48 USD");
        assert_eq!(backend.calls(), 1);

        let snap = service.metrics().snapshot();
        assert_eq!(snap.provider.api_calls, 1);
        assert_eq!(snap.memory.hits, 1);
        assert_eq!(snap.memory.misses, 1);
    }

    #[tokio::test]
    async fn test_shared_tier_checked_first() {
        let backend = Arc::new(FakeBackend::valuing("$40–$48 USD"));
        let shared = Arc::new(FakeSharedCache::new());
        let service = service(Arc::clone(&backend), Some(Arc::clone(&shared)));

        service.get_valuation(&vase()).await.unwrap();
        service.get_valuation(&vase()).await.unwrap();

        assert_eq!(backend.calls(), 1);
        assert_eq!(shared.entry_count(), 1);
        let snap = service.metrics().snapshot();
        assert_eq!(snap.shared.hits, 1);
        assert_eq!(snap.shared.misses, 1);
        assert_eq!(snap.memory.hits, 0);
    }

    #[tokio::test]
    async fn test_shared_entry_from_another_process_is_used() {
        let backend = Arc::new(FakeBackend::valuing("$1 USD"));
        let shared = Arc::new(FakeSharedCache::new());
        let request = vase();
        let key = compute_fingerprint(&request.item_name, &request.item_description, &request.image_links);
        let cached = bidscout_core::CachedValuation {
            result: ValuationResult { value_range: "$99 USD".into(), ..ValuationResult::default() },
            created_at: chrono::Utc::now(),
        };
        shared.insert_raw(&key, &serde_json::to_string(&cached).unwrap());

        let service = service(Arc::clone(&backend), Some(shared));
        assert_eq!(service.get_valuation(&request).await.unwrap().value_range, "$99 USD");
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_identical_requests_call_provider_once() {
        let backend = Arc::new(FakeBackend::valuing("$40–$48 USD").with_delay(Duration::from_millis(100)));
        let service = service(Arc::clone(&backend), None);

        let (first, second) = (vase(), vase());
        let (a, b) = tokio::join!(service.get_valuation(&first), service.get_valuation(&second));
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(backend.calls(), 1);

        let snap = service.metrics().snapshot();
        assert_eq!(snap.provider.api_calls, 1);
        assert_eq!(snap.provider.deduplicated, 1);
    }

    #[tokio::test]
    async fn test_non_json_answer_yields_cached_placeholder() {
        let backend = Arc::new(FakeBackend::answering("I think it's worth about forty dollars."));
        let service = service(Arc::clone(&backend), None);

        let result = service.get_valuation(&vase()).await.unwrap();
        assert!(result.is_unavailable());
        assert_eq!(result.demand, "Unknown");

        let again = service.get_valuation(&vase()).await.unwrap();
        assert!(again.is_unavailable());
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_answer_without_value_range_yields_placeholder() {
        let backend = Arc::new(FakeBackend::answering(r#"{"context": "nice"}"#));
        let service = service(backend, None);
        assert!(service.get_valuation(&vase()).await.unwrap().is_unavailable());
    }

    #[tokio::test]
    async fn test_malformed_envelope_yields_placeholder() {
        let backend = Arc::new(FakeBackend::valuing("$1 USD"));
        backend.push_reply(Err(ProviderError::MalformedResponse("no choices".into())));
        let service = service(Arc::clone(&backend), None);

        assert!(service.get_valuation(&vase()).await.unwrap().is_unavailable());
        assert_eq!(service.metrics().snapshot().provider.errors, 0);
    }

    #[tokio::test]
    async fn test_provider_error_propagates_and_is_not_cached() {
        let backend = Arc::new(FakeBackend::valuing("$40–$48 USD"));
        backend.push_reply(Err(ProviderError::HttpError { status: 500, body: "upstream".into() }));
        let shared = Arc::new(FakeSharedCache::new());
        let service = service(Arc::clone(&backend), Some(Arc::clone(&shared)));

        let err = service.get_valuation(&vase()).await.unwrap_err();
        assert!(matches!(err, bidscout_core::Error::ProviderCallFailed(_)));
        assert_eq!(shared.entry_count(), 0);

        let retry = service.get_valuation(&vase()).await.unwrap();
        assert_eq!(retry.value_range, "$40–$48 USD");
        assert_eq!(backend.calls(), 2);

        let snap = service.metrics().snapshot();
        assert_eq!(snap.provider.api_calls, 2);
        assert_eq!(snap.provider.errors, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_triggers_new_call() {
        let backend = Arc::new(FakeBackend::valuing("$40–$48 USD"));
        let service = service(Arc::clone(&backend), None);

        service.get_valuation(&vase()).await.unwrap();
        tokio::time::advance(Duration::from_secs(599)).await;
        service.get_valuation(&vase()).await.unwrap();
        assert_eq!(backend.calls(), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        service.get_valuation(&vase()).await.unwrap();
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let backend = Arc::new(FakeBackend::valuing("unused"));
        for range in ["$1 USD", "$2 USD", "$3 USD"] {
            backend.push_reply(Ok(Completion {
                content: serde_json::json!({ "valueRange": range }).to_string(),
                usage: Usage::default(),
            }));
        }
        let service = service(Arc::clone(&backend), None);

        let requests = vec![
            ValuationRequest::new("Chair", "Oak", Vec::new()),
            ValuationRequest::new("Lamp", "Brass", Vec::new()),
            ValuationRequest::new("Chair", "Oak", Vec::new()),
            ValuationRequest::new("Rug", "Wool", Vec::new()),
        ];

        let ranges: Vec<_> = service
            .get_valuations_batch(&requests)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.value_range)
            .collect();

        assert_eq!(ranges, vec!["$1 USD", "$2 USD", "$1 USD", "$3 USD"]);
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn test_batch_aborts_on_first_error() {
        let backend = Arc::new(FakeBackend::valuing("$1 USD"));
        let service = service(Arc::clone(&backend), None);

        service.get_valuation(&ValuationRequest::new("Chair", "Oak", Vec::new())).await.unwrap();
        backend.push_reply(Err(ProviderError::RateLimited));

        let requests = vec![
            ValuationRequest::new("Chair", "Oak", Vec::new()),
            ValuationRequest::new("Lamp", "Brass", Vec::new()),
            ValuationRequest::new("Rug", "Wool", Vec::new()),
        ];
        assert!(service.get_valuations_batch(&requests).await.is_err());
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_cost_is_metered() {
        let backend = Arc::new(FakeBackend::valuing("$1 USD"));
        let service = service(backend, None);
        service.get_valuation(&vase()).await.unwrap();

        let cost = service.metrics().snapshot().provider.estimated_cost_usd;
        assert!((cost - 0.0035).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_cost_uses_backend_model_rate() {
        let backend = Arc::new(FakeBackend::valuing("$1 USD").with_model("gpt-4o-mini-2024-07-18"));
        let service = service(backend, None);
        service.get_valuation(&vase()).await.unwrap();

        let cost = service.metrics().snapshot().provider.estimated_cost_usd;
        assert!((cost - 0.00021).abs() < 1e-12);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_shared_tier_falls_back_to_memory() {
        let backend = Arc::new(FakeBackend::valuing("$40–$48 USD"));
        let shared = Arc::new(FakeSharedCache::new());
        shared.set_failing(true);
        let service = service(Arc::clone(&backend), Some(Arc::clone(&shared)));

        service.get_valuation(&vase()).await.unwrap();
        let again = service.get_valuation(&vase()).await.unwrap();

        assert_eq!(again.value_range, "$40–$48 USD");
        assert_eq!(backend.calls(), 1);
        assert_eq!(service.shared_status(), Some(TierStatus::Degraded));
        assert_eq!(service.metrics().snapshot().shared.errors, 1);
        assert_eq!(service.metrics().snapshot().memory.hits, 1);
    }

    #[tokio::test]
    async fn test_image_links_reach_the_provider() {
        let backend = Arc::new(FakeBackend::valuing("$1 USD"));
        let service = service(Arc::clone(&backend), None);
        let request = ValuationRequest::new("Vase", "Blue", vec!["https://cdn/vase.jpg".into()]);
        service.get_valuation(&request).await.unwrap();

        let messages = backend.last_messages().unwrap();
        assert!(messages[0].content.iter().any(|part| matches!(
            part,
            ContentPart::ImageUrl { image_url } if image_url.url == "https://cdn/vase.jpg"
        )));
    }
}
