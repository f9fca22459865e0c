//! Gemini embedding and generation providers over the Generative Language
//! REST API.
//!
//! This module is only available when the `gemini` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::{GenerationRequest, TextGenerator};

/// The Generative Language API base URL.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default embedding model.
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";

/// Output size of `text-embedding-004`.
const DEFAULT_DIMENSIONS: usize = 768;

/// Default generation model.
pub const DEFAULT_GENERATION_MODEL: &str = "gemini-2.0-flash";

const PROVIDER: &str = "Gemini";

fn api_key_from_env() -> Option<String> {
    std::env::var("GOOGLE_API_KEY").ok().filter(|k| !k.is_empty())
}

/// Task hint sent with embedding requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    /// Text that will be stored and searched.
    RetrievalDocument,
    /// A search query.
    RetrievalQuery,
    /// Symmetric similarity.
    SemanticSimilarity,
}

/// An [`EmbeddingProvider`] backed by the Gemini `batchEmbedContents` endpoint.
///
/// # Configuration
///
/// - `model` – defaults to `text-embedding-004` (768 dimensions).
/// - `task_type` – [`TaskType::RetrievalDocument`] for batches and
///   [`TaskType::RetrievalQuery`] for single texts unless overridden with
///   [`GeminiEmbeddingProvider::with_task_type`].
/// - `output_dimensionality` – optional truncation of the output vector.
///
/// # Example
///
/// ```rust,ignore
/// use tarih_rag::gemini::GeminiEmbeddingProvider;
///
/// let provider = GeminiEmbeddingProvider::from_env()?;
/// let embedding = provider.embed("Osmanlı Devleti'nin kuruluşu").await?;
/// ```
pub struct GeminiEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    task_type: Option<TaskType>,
    output_dimensionality: Option<usize>,
    dimensions: usize,
}

impl GeminiEmbeddingProvider {
    /// Create a new provider using the given API key and the default model.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] if the key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: "API key must not be empty".into(),
            });
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: GEMINI_BASE_URL.into(),
            model: DEFAULT_EMBEDDING_MODEL.into(),
            task_type: None,
            output_dimensionality: None,
            dimensions: DEFAULT_DIMENSIONS,
        })
    }

    /// Create a new provider using the `GOOGLE_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = api_key_from_env().ok_or_else(|| RagError::EmbeddingError {
            provider: PROVIDER.into(),
            message: "GOOGLE_API_KEY environment variable not set".into(),
        })?;
        Self::new(api_key)
    }

    /// Set the embedding model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Use one task type for every request.
    pub fn with_task_type(mut self, task_type: TaskType) -> Self {
        self.task_type = Some(task_type);
        self
    }

    /// Truncate output vectors to `dims` components.
    pub fn with_output_dimensionality(mut self, dims: usize) -> Self {
        self.output_dimensionality = Some(dims);
        self.dimensions = dims;
        self
    }

    async fn embed_with_task(&self, texts: &[&str], task_type: TaskType) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(provider = PROVIDER, batch_size = texts.len(), model = %self.model, "embedding batch");

        let model = format!("models/{}", self.model);
        let body = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|&text| EmbedContentRequest {
                    model: &model,
                    content: Content { parts: vec![Part { text }] },
                    task_type,
                    output_dimensionality: self.output_dimensionality,
                })
                .collect(),
        };

        let url = format!("{}/{model}:batchEmbedContents", self.base_url.trim_end_matches('/'));
        let response: BatchEmbedResponse = post_json(&self.client, &url, &self.api_key, &body)
            .await
            .map_err(|message| RagError::EmbeddingError { provider: PROVIDER.into(), message })?;

        if response.embeddings.len() != texts.len() {
            return Err(RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: format!(
                    "API returned {} embeddings for {} texts",
                    response.embeddings.len(),
                    texts.len()
                ),
            });
        }
        Ok(response.embeddings.into_iter().map(|e| e.values).collect())
    }
}

/// A [`TextGenerator`] backed by the Gemini `generateContent` endpoint.
///
/// # Example
///
/// ```rust,ignore
/// use tarih_rag::gemini::GeminiGenerator;
///
/// let generator = GeminiGenerator::from_env()?;
/// ```
pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiGenerator {
    /// Create a new generator with the given API key and `gemini-2.0-flash`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::GenerationError`] if the key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::GenerationError {
                provider: PROVIDER.into(),
                message: "API key must not be empty".into(),
            });
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: GEMINI_BASE_URL.into(),
            model: DEFAULT_GENERATION_MODEL.into(),
        })
    }

    /// Create a new generator using the `GOOGLE_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = api_key_from_env().ok_or_else(|| RagError::GenerationError {
            provider: PROVIDER.into(),
            message: "GOOGLE_API_KEY environment variable not set".into(),
        })?;
        Self::new(api_key)
    }

    /// Set the generation model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

// ── Gemini API request/response types ──────────────────────────────

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: TaskType,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_dimensionality: Option<usize>,
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl GenerateContentResponse {
    fn text(self) -> Option<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

async fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    body: &B,
) -> std::result::Result<R, String> {
    let response = client
        .post(url)
        .header("x-goog-api-key", api_key)
        .json(body)
        .send()
        .await
        .map_err(|e| {
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

// ── Trait implementations ──────────────────────────────────────────

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let task_type = self.task_type.unwrap_or(TaskType::RetrievalQuery);
        self.embed_with_task(&[text], task_type).await?.into_iter().next().ok_or_else(|| {
            RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: "API returned empty response".into(),
            }
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let task_type = self.task_type.unwrap_or(TaskType::RetrievalDocument);
        self.embed_with_task(texts, task_type).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        debug!(provider = PROVIDER, model = %self.model, prompt_len = request.prompt.len(), "generating content");

        let body = GenerateContentRequest {
            contents: vec![Content { parts: vec![Part { text: &request.prompt }] }],
        };
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let response: GenerateContentResponse =
            post_json(&self.client, &url, &self.api_key, &body)
                .await
                .map_err(|message| RagError::GenerationError { provider: PROVIDER.into(), message })?;

        response.text().ok_or_else(|| RagError::GenerationError {
            provider: PROVIDER.into(),
            message: "API returned no text".into(),
        })
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embed_request_uses_camel_case_and_task_names() {
        let request = EmbedContentRequest {
            model: "models/text-embedding-004",
            content: Content { parts: vec![Part { text: "Sakarya" }] },
            task_type: TaskType::RetrievalQuery,
            output_dimensionality: Some(256),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["taskType"], "RETRIEVAL_QUERY");
        assert_eq!(json["outputDimensionality"], 256);
        assert_eq!(json["content"]["parts"][0]["text"], "Sakarya");
    }

    #[test]
    fn generate_response_joins_candidate_parts() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Malazgirt "},{"text":"1071"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("Malazgirt 1071"));

        let empty: GenerateContentResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert_eq!(empty.text(), None);
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(GeminiEmbeddingProvider::new("").is_err());
        assert!(GeminiGenerator::new("").is_err());
    }
}
