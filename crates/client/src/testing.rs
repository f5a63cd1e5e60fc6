//! In-crate fakes for the network seams.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use url::Url;

use crate::fetch::{FetchError, HttpTransport};
use crate::valuation::provider::{ChatMessage, Completion, InferenceBackend, Usage};
use crate::valuation::{ProviderError, SharedCache};

fn normalize(url: &str) -> String {
    match crate::fetch::canonicalize(url) {
        Ok(u) => u.to_string(),
        Err(_) => url.to_string(),
    }
}

/// Transport answering from per-URL scripts.
///
/// Queued responses are served first, in order; after that the URL's
/// standing response (if any) repeats. Unscripted URLs answer 404.
#[derive(Default)]
pub struct ScriptedTransport {
    queued: Mutex<HashMap<String, VecDeque<Result<String, FetchError>>>>,
    standing: Mutex<HashMap<String, Result<String, FetchError>>>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, url: &str, response: Result<String, FetchError>) {
        self.queued.lock().unwrap().entry(normalize(url)).or_default().push_back(response);
    }

    pub fn push_ok(&self, url: &str, body: &str) {
        self.push(url, Ok(body.to_string()));
    }

    pub fn push_status(&self, url: &str, status: u16) {
        self.push(url, Err(FetchError::Status { url: normalize(url), status }));
    }

    pub fn always_ok(&self, url: &str, body: &str) {
        self.standing.lock().unwrap().insert(normalize(url), Ok(body.to_string()));
    }

    pub fn always_fail(&self, url: &str, status: u16) {
        self.standing
            .lock()
            .unwrap()
            .insert(normalize(url), Err(FetchError::Status { url: normalize(url), status }));
    }

    pub fn call_times(&self, url: &str) -> Vec<Instant> {
        let url = normalize(url);
        self.calls.lock().unwrap().iter().filter(|(u, _)| *u == url).map(|(_, at)| *at).collect()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.call_times(url).len()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(&self, url: &Url) -> Result<String, FetchError> {
        let key = url.to_string();
        self.calls.lock().unwrap().push((key.clone(), Instant::now()));

        if let Some(response) = self.queued.lock().unwrap().get_mut(&key).and_then(VecDeque::pop_front) {
            return response;
        }
        if let Some(response) = self.standing.lock().unwrap().get(&key) {
            return response.clone();
        }
        Err(FetchError::Status { url: key, status: 404 })
    }
}

/// Inference backend returning scripted completions and counting calls.
pub struct FakeBackend {
    model: String,
    replies: Mutex<VecDeque<Result<Completion, ProviderError>>>,
    default_content: String,
    delay: Duration,
    calls: AtomicUsize,
    last_messages: Mutex<Option<Vec<ChatMessage>>>,
}

impl FakeBackend {
    /// Backend that answers every call with `content`.
    pub fn answering(content: &str) -> Self {
        Self {
            model: "gpt-4o".to_string(),
            replies: Mutex::new(VecDeque::new()),
            default_content: content.to_string(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            last_messages: Mutex::new(None),
        }
    }

    /// Answer with a fixed valuation JSON object.
    pub fn valuing(value_range: &str) -> Self {
        Self::answering(
            &serde_json::json!({
                "valueRange": value_range,
                "context": "Comparable sales",
                "demand": "Moderate",
                "specialConsiderations": "Condition matters"
            })
            .to_string(),
        )
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Sleep before answering, so concurrent callers overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queue a one-off reply served before the default answer.
    pub fn push_reply(&self, reply: Result<Completion, ProviderError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_messages(&self) -> Option<Vec<ChatMessage>> {
        self.last_messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceBackend for FakeBackend {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<Completion, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_messages.lock().unwrap() = Some(messages);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let queued = self.replies.lock().unwrap().pop_front();
        match queued {
            Some(reply) => reply,
            None => Ok(Completion {
                content: self.default_content.clone(),
                usage: Usage { prompt_tokens: 1000, completion_tokens: 100 },
            }),
        }
    }
}

/// Shared cache over a map, with a switch to make every call fail.
#[derive(Default)]
pub struct FakeSharedCache {
    entries: Mutex<HashMap<String, String>>,
    failing: std::sync::atomic::AtomicBool,
    gets: AtomicUsize,
    sets: AtomicUsize,
}

impl FakeSharedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn insert_raw(&self, key: &str, value: &str) {
        self.entries.lock().unwrap().insert(key.to_string(), value.to_string());
    }

    fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), bidscout_core::Error> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(bidscout_core::Error::CacheTierUnavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SharedCache for FakeSharedCache {
    async fn get(&self, key: &str) -> Result<Option<String>, bidscout_core::Error> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: &str, _ttl: Duration) -> Result<(), bidscout_core::Error> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.insert_raw(key, value);
        Ok(())
    }
}
