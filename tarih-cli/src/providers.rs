//! Embedding and generation backend selection.

use std::sync::Arc;

use anyhow::Result;
use tarih_rag::{EmbeddingProvider, ExtractiveGenerator, HashingEmbeddingProvider, TextGenerator};

use crate::cli::{EmbedderKind, GeneratorKind};

/// Construct the embedding provider for `kind`, reading API keys from the
/// environment.
pub fn embedder(kind: EmbedderKind) -> Result<Arc<dyn EmbeddingProvider>> {
    match kind {
        EmbedderKind::Hashing => Ok(Arc::new(HashingEmbeddingProvider::default())),
        #[cfg(feature = "openai")]
        EmbedderKind::Openai => Ok(Arc::new(tarih_rag::OpenAIEmbeddingProvider::from_env()?)),
        #[cfg(feature = "gemini")]
        EmbedderKind::Gemini => Ok(Arc::new(tarih_rag::GeminiEmbeddingProvider::from_env()?)),
        #[allow(unreachable_patterns)]
        other => anyhow::bail!("embedder {other:?} is not compiled in; enable its cargo feature"),
    }
}

/// Construct the answer generator for `kind`.
pub fn generator(kind: GeneratorKind) -> Result<Arc<dyn TextGenerator>> {
    match kind {
        GeneratorKind::Extractive => Ok(Arc::new(ExtractiveGenerator::new())),
        #[cfg(feature = "openai")]
        GeneratorKind::Openai => Ok(Arc::new(tarih_rag::OpenAIChatGenerator::from_env()?)),
        #[cfg(feature = "gemini")]
        GeneratorKind::Gemini => Ok(Arc::new(tarih_rag::GeminiGenerator::from_env()?)),
        #[allow(unreachable_patterns)]
        other => anyhow::bail!("generator {other:?} is not compiled in; enable its cargo feature"),
    }
}
