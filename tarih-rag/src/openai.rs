//! OpenAI-compatible embedding and chat providers.
//!
//! Both talk to any server exposing the OpenAI REST surface (`/v1/embeddings`,
//! `/v1/chat/completions`), including local sentence-transformer servers.
//!
//! This module is only available when the `openai` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::{GenerationRequest, TextGenerator};

/// The default OpenAI API base URL.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// The default model for OpenAI embeddings.
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// The default dimensionality for `text-embedding-3-small`.
const DEFAULT_DIMENSIONS: usize = 1536;

/// The default chat model.
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

const PROVIDER: &str = "OpenAI";

fn api_key_from_env() -> Option<String> {
    std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty())
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{path}", base_url.trim_end_matches('/'))
}

/// An [`EmbeddingProvider`] backed by an OpenAI-compatible embeddings API.
///
/// Uses `reqwest` to call the `/embeddings` endpoint directly.
///
/// # Configuration
///
/// - `base_url` – defaults to `https://api.openai.com/v1`.
/// - `model` – defaults to `text-embedding-3-small`.
/// - `dimensions` – optional Matryoshka dimension override.
/// - `api_key` – from the constructor or the `OPENAI_API_KEY` environment
///   variable; may be omitted for local servers.
///
/// # Example
///
/// ```rust,ignore
/// use tarih_rag::openai::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::new("sk-...")
///     .with_base_url("http://localhost:8080/v1")
///     .with_model("paraphrase-multilingual-MiniLM-L12-v2")
///     .with_dimensions(384);
/// let embedding = provider.embed("Kurtuluş Savaşı").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    dimensions: usize,
    /// If set, passed to the API for Matryoshka dimension truncation.
    request_dimensions: Option<usize>,
}

impl OpenAIEmbeddingProvider {
    /// Create a new provider with the given API key.
    ///
    /// Uses the default model (`text-embedding-3-small`) and dimensions (1536).
    pub fn new(api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        Self {
            client: reqwest::Client::new(),
            api_key: (!api_key.is_empty()).then_some(api_key),
            base_url: OPENAI_BASE_URL.into(),
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
            request_dimensions: None,
        }
    }

    /// Create a new provider using the `OPENAI_API_KEY` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] if the variable is unset or empty.
    pub fn from_env() -> Result<Self> {
        let api_key = api_key_from_env().ok_or_else(|| RagError::EmbeddingError {
            provider: PROVIDER.into(),
            message: "OPENAI_API_KEY environment variable not set".into(),
        })?;
        Ok(Self::new(api_key))
    }

    /// Point the provider at another OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the model name (e.g. `text-embedding-3-large`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the output dimensions (Matryoshka support).
    ///
    /// When set, the API returns embeddings truncated to this size.
    /// This also updates the value returned by [`dimensions()`](EmbeddingProvider::dimensions).
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.request_dimensions = Some(dims);
        self
    }
}

/// A [`TextGenerator`] backed by an OpenAI-compatible chat completions API.
///
/// # Example
///
/// ```rust,ignore
/// use tarih_rag::openai::OpenAIChatGenerator;
///
/// let generator = OpenAIChatGenerator::from_env()?.with_model("gpt-4o");
/// ```
pub struct OpenAIChatGenerator {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OpenAIChatGenerator {
    /// Create a new generator with the given API key and the default model.
    pub fn new(api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        Self {
            client: reqwest::Client::new(),
            api_key: (!api_key.is_empty()).then_some(api_key),
            base_url: OPENAI_BASE_URL.into(),
            model: DEFAULT_CHAT_MODEL.into(),
            temperature: 0.2,
        }
    }

    /// Create a new generator using the `OPENAI_API_KEY` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::GenerationError`] if the variable is unset or empty.
    pub fn from_env() -> Result<Self> {
        let api_key = api_key_from_env().ok_or_else(|| RagError::GenerationError {
            provider: PROVIDER.into(),
            message: "OPENAI_API_KEY environment variable not set".into(),
        })?;
        Ok(Self::new(api_key))
    }

    /// Point the generator at another OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the chat model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

// ── OpenAI API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Send `body` to `url` and decode the JSON reply, describing failures as text.
async fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
    client: &reqwest::Client,
    url: &str,
    api_key: Option<&str>,
    body: &B,
) -> std::result::Result<R, String> {
    let mut request = client.post(url).json(body);
    if let Some(key) = api_key {
        request = request.bearer_auth(key);
    }

    let response = request.send().await.map_err(|e| {
        error!(provider = PROVIDER, error = %e, "request failed");
        format!("request failed: {e}")
    })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail =
            serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);

        error!(provider = PROVIDER, %status, "API error");
        return Err(format!("API returned {status}: {detail}"));
    }

    response.json().await.map_err(|e| {
        error!(provider = PROVIDER, error = %e, "failed to parse response");
        format!("failed to parse response: {e}")
    })
}

// ── EmbeddingProvider implementation ───────────────────────────────

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| RagError::EmbeddingError {
            provider: PROVIDER.into(),
            message: "API returned empty response".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = PROVIDER, batch_size = texts.len(), model = %self.model, "embedding batch");

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: texts.to_vec(),
            dimensions: self.request_dimensions,
        };

        let response: EmbeddingResponse = post_json(
            &self.client,
            &endpoint(&self.base_url, "embeddings"),
            self.api_key.as_deref(),
            &request_body,
        )
        .await
        .map_err(|message| RagError::EmbeddingError { provider: PROVIDER.into(), message })?;

        let mut data = response.data;
        data.sort_by_key(|d| d.index.unwrap_or(usize::MAX));
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ── TextGenerator implementation ───────────────────────────────────

#[async_trait]
impl TextGenerator for OpenAIChatGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        debug!(provider = PROVIDER, model = %self.model, prompt_len = request.prompt.len(), "chat completion");

        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: &request.prompt }],
            temperature: self.temperature,
        };

        let response: ChatResponse = post_json(
            &self.client,
            &endpoint(&self.base_url, "chat/completions"),
            self.api_key.as_deref(),
            &body,
        )
        .await
        .map_err(|message| RagError::GenerationError { provider: PROVIDER.into(), message })?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| RagError::GenerationError {
                provider: PROVIDER.into(),
                message: "API returned no completion".into(),
            })
    }

    fn name(&self) -> &str {
        &self.model
    }
}
