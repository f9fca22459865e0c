//! The question-answering application context.

use std::sync::Arc;

use tracing::{error, info};

use crate::assembler::AnswerAssembler;
use crate::config::RagConfig;
use crate::document::{QueryResponse, RetrievalResult, SourceRef};
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::generation::TextGenerator;
use crate::index::IndexStats;
use crate::inmemory::InMemoryVectorStore;
use crate::retrieval::Retriever;
use crate::vectorstore::VectorStore;

/// Wires retrieval and generation together for answering questions.
///
/// Built once at startup and shared read-only afterwards; nothing in it is
/// mutated per query.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use tarih_rag::{ExtractiveGenerator, HashingEmbeddingProvider, RagConfig, RagSystem};
///
/// let system = RagSystem::open(
///     RagConfig::from_env()?,
///     Arc::new(HashingEmbeddingProvider::default()),
///     Arc::new(ExtractiveGenerator::new()),
/// )
/// .await?;
/// let answer = system.query("Malazgirt Savaşı ne zaman yapıldı?").await;
/// println!("{}", answer.response);
/// ```
#[derive(Clone)]
pub struct RagSystem {
    config: RagConfig,
    retriever: Retriever,
    assembler: AnswerAssembler,
}

impl RagSystem {
    /// Create a system over an existing store.
    pub fn new(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let retriever = Retriever::from_config(&config, embedder, store);
        Self { config, retriever, assembler: AnswerAssembler::new(generator) }
    }

    /// Create a system and load the persisted index from `config.index_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexNotFound`](crate::RagError::IndexNotFound) or
    /// [`RagError::CorruptIndex`](crate::RagError::CorruptIndex) when the
    /// index cannot be loaded.
    pub async fn open(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn TextGenerator>,
    ) -> Result<Self> {
        let store = Arc::new(InMemoryVectorStore::new());
        store.load(&config.index_dir).await?;
        let chunks = store.len().await?;
        info!(index_dir = %config.index_dir.display(), chunks, "knowledge base loaded");
        Ok(Self::new(config, embedder, store, generator))
    }

    /// The active configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Statistics of the loaded index.
    pub async fn stats(&self) -> Result<IndexStats> {
        self.retriever.store().stats().await
    }

    /// Run retrieval only, with the configured `top_k` and threshold.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<RetrievalResult>> {
        self.retriever
            .retrieve(question, self.config.top_k, self.config.similarity_threshold)
            .await
    }

    /// Answer `question`.
    ///
    /// Never fails: retrieval errors are reported in
    /// [`QueryResponse::response`] with no sources.
    pub async fn query(&self, question: &str) -> QueryResponse {
        let results = match self.retrieve(question).await {
            Ok(results) => results,
            Err(e) => {
                error!(error = %e, "retrieval failed");
                return QueryResponse {
                    query: question.to_string(),
                    response: format!("Bilgi aranırken bir hata oluştu: {e}"),
                    sources: Vec::new(),
                    num_sources: 0,
                };
            }
        };

        let response = self.assembler.assemble_and_generate(question, &results).await;
        let sources: Vec<SourceRef> = results.iter().map(SourceRef::from).collect();
        info!(sources = sources.len(), mode = ?self.retriever.mode(), "query answered");

        QueryResponse {
            query: question.to_string(),
            response,
            num_sources: sources.len(),
            sources,
        }
    }
}
