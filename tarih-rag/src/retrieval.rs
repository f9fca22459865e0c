//! Query-time retrieval: embed, search, filter and optionally fuse with
//! keyword overlap.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::config::{RagConfig, RetrievalMode};
use crate::document::RetrievalResult;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::hybrid::fuse;
use crate::vectorstore::VectorStore;

/// Retrieves the chunks most relevant to a question.
///
/// In [`RetrievalMode::Semantic`] the `top_k` nearest chunks are kept when
/// their similarity is at least the threshold. In [`RetrievalMode::Hybrid`]
/// `2 * top_k` candidates are drawn from both the embedding index and keyword
/// overlap, keyword-only candidates are scored against their stored vector,
/// and the fused `top_k` are kept when their similarity is at least the
/// threshold.
///
/// # Example
///
/// ```rust,ignore
/// use tarih_rag::Retriever;
///
/// let retriever = Retriever::new(embedder, store);
/// let results = retriever.retrieve("Malazgirt ne zaman oldu?", 5, 0.3).await?;
/// ```
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    mode: RetrievalMode,
    alpha: f32,
}

impl Retriever {
    /// Create a semantic retriever.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store, mode: RetrievalMode::Semantic, alpha: 1.0 }
    }

    /// Create a retriever using the mode and alpha from `config`.
    pub fn from_config(
        config: &RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self::new(embedder, store).with_mode(config.retrieval_mode, config.hybrid_alpha)
    }

    /// Set the ranking mode and the hybrid semantic weight.
    pub fn with_mode(mut self, mode: RetrievalMode, alpha: f32) -> Self {
        self.mode = mode;
        self.alpha = alpha.clamp(0.0, 1.0);
        self
    }

    /// The active ranking mode.
    pub fn mode(&self) -> RetrievalMode {
        self.mode
    }

    /// The store this retriever searches.
    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Return at most `top_k` results for `query`.
    ///
    /// An empty vector means nothing cleared the threshold; it is not an error.
    ///
    /// # Errors
    ///
    /// Propagates embedding failures and
    /// [`RagError::IndexNotLoaded`](crate::RagError::IndexNotLoaded).
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<RetrievalResult>> {
        let embedding = self.embedder.embed(query).await?;

        let results = match self.mode {
            RetrievalMode::Semantic => {
                let mut results = self.store.search(&embedding, top_k).await?;
                results.retain(|r| r.similarity >= threshold);
                results
            }
            RetrievalMode::Hybrid => {
                let candidates = top_k.saturating_mul(2);
                let mut semantic = self.store.search(&embedding, candidates).await?;
                let keyword = self.store.keyword_search(query, candidates).await?;

                let scored: HashSet<usize> = semantic.iter().map(|r| r.position).collect();
                let unscored: Vec<usize> = keyword
                    .iter()
                    .map(|hit| hit.position)
                    .filter(|position| !scored.contains(position))
                    .collect();
                semantic.extend(self.store.score(&embedding, &unscored).await?);

                debug!(
                    semantic = semantic.len(),
                    keyword = keyword.len(),
                    alpha = self.alpha,
                    "fusing hybrid candidates"
                );
                let mut results = fuse(semantic, keyword, self.alpha, top_k);
                results.retain(|r| r.similarity >= threshold);
                results
            }
        };

        debug!(mode = ?self.mode, top_k, threshold, results = results.len(), "retrieval complete");
        Ok(results)
    }
}
