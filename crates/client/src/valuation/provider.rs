//! Chat-completions inference backend.

use std::time::Duration;

use async_trait::async_trait;
use bidscout_core::AppConfig;
use serde::{Deserialize, Serialize};

use super::error::ProviderError;
pub use super::prompt::ChatMessage;

/// Token counts reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

/// Text of the first choice plus usage.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub content: String,
    pub usage: Usage,
}

/// One model call.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    fn model(&self) -> &str;

    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<Completion, ProviderError>;
}

/// OpenAI backend configuration.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key (from BIDSCOUT_OPENAI_API_KEY). Checked when a call is made.
    pub api_key: Option<String>,

    /// Base URL (default: "https://api.openai.com/v1")
    pub base_url: String,

    /// Model name (default: "gpt-4o")
    pub model: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            timeout: Duration::from_millis(20000),
            max_tokens: 1024,
            temperature: 0.2,
        }
    }
}

impl From<&AppConfig> for OpenAiConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            api_key: config.openai_api_key.clone().filter(|k| !k.trim().is_empty()),
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout: config.timeout(),
            ..Self::default()
        }
    }
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Decode a 2xx chat-completions body.
fn decode_completion(bytes: &[u8]) -> Result<Completion, ProviderError> {
    let response: ChatResponse =
        serde_json::from_slice(bytes).map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| ProviderError::MalformedResponse("no choices in response".to_string()))?;

    Ok(Completion { content, usage: response.usage })
}

/// Production backend over reqwest.
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    http: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiBackend {
    pub fn new(config: OpenAiConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    /// Use a caller-built client. `config.timeout` is not applied to it.
    pub fn with_http_client(http: reqwest::Client, config: OpenAiConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl InferenceBackend for OpenAiBackend {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<Completion, ProviderError> {
        let api_key = self.config.api_key.as_deref().ok_or(ProviderError::MissingApiKey)?;
        let url = format!("{}/chat/completions", self.config.base_url);

        let body = ChatRequest {
            model: &self.config.model,
            messages: &messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            response_format: ResponseFormat { kind: "json_object" },
        };

        tracing::debug!(model = %self.config.model, parts = messages.iter().map(|m| m.content.len()).sum::<usize>(), "calling inference provider");

        let response = self.http.post(&url).bearer_auth(api_key).json(&body).send().await?;

        let status = response.status();
        tracing::debug!("inference provider response status: {}", status);

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthError);
        }

        if status == 429 {
            return Err(ProviderError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %body.chars().take(200).collect::<String>(), "inference provider error");
            return Err(ProviderError::HttpError { status: status.as_u16(), body });
        }

        let bytes = response.bytes().await?;
        decode_completion(&bytes)
    }
}
