//! Text generation trait and the offline extractive generator.

use async_trait::async_trait;

use crate::error::Result;

/// Everything a generator may need to answer one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// The user's question.
    pub question: String,
    /// Formatted context blocks taken from the retrieved chunks.
    pub context: String,
    /// The full instruction prompt embedding question and context.
    pub prompt: String,
}

/// A generative model that turns a prompt into an answer.
///
/// Remote implementations send [`GenerationRequest::prompt`]; offline ones
/// may work from the question and context directly.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Produce the answer text.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}

/// Offline generator that answers with the retrieved context itself.
///
/// Lets the whole pipeline run without an API key; the answer is the cited
/// passages, not a synthesized text.
#[derive(Debug, Clone, Default)]
pub struct ExtractiveGenerator;

impl ExtractiveGenerator {
    /// Create a new extractive generator.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextGenerator for ExtractiveGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        Ok(format!("Bilgi bankasında bulunan ilgili kayıtlar:\n\n{}", request.context))
    }

    fn name(&self) -> &str {
        "extractive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn extractive_answer_contains_context() {
        let request = GenerationRequest {
            question: "Soru?".into(),
            context: "Kaynak 1 (Osmanlı Devleti - TTK):\nLale Devri".into(),
            prompt: String::new(),
        };
        let answer = ExtractiveGenerator::new().generate(&request).await.unwrap();
        assert!(answer.ends_with("Lale Devri"));
    }
}
