//! Vector store trait for holding the chunk index used at query time.

use std::path::Path;

use async_trait::async_trait;

use crate::document::{Chunk, RetrievalResult};
use crate::error::Result;
use crate::hybrid::KeywordHit;
use crate::index::IndexStats;

/// A storage backend for chunk embeddings with similarity search.
///
/// The store starts empty; every data-dependent operation fails with
/// [`RagError::IndexNotLoaded`](crate::RagError::IndexNotLoaded) until
/// [`build`](VectorStore::build) or [`load`](VectorStore::load) succeeds.
/// Readers may run concurrently; writers are exclusive.
///
/// # Example
///
/// ```rust,ignore
/// use tarih_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.load("models/faiss_index").await?;
/// let results = store.search(&query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Replace the current contents with a freshly built index.
    async fn build(&self, dimension: usize, vectors: Vec<Vec<f32>>, chunks: Vec<Chunk>)
    -> Result<()>;

    /// Append vectors and chunks to the loaded index, atomically.
    async fn append(&self, vectors: Vec<Vec<f32>>, chunks: Vec<Chunk>) -> Result<()>;

    /// Return up to `top_k` chunks most similar to `embedding`, best first.
    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<RetrievalResult>>;

    /// Score the chunks at `positions` against `embedding`, in the given
    /// order. Positions outside the index are skipped.
    async fn score(&self, embedding: &[f32], positions: &[usize]) -> Result<Vec<RetrievalResult>>;

    /// Return up to `top_k` chunks ranked by keyword overlap with `query`.
    async fn keyword_search(&self, query: &str, top_k: usize) -> Result<Vec<KeywordHit>>;

    /// Number of stored chunks.
    async fn len(&self) -> Result<usize>;

    /// Index summary counters.
    async fn stats(&self) -> Result<IndexStats>;

    /// Write the loaded index to `dir`.
    async fn persist(&self, dir: &Path) -> Result<()>;

    /// Replace the current contents with the index persisted in `dir`.
    async fn load(&self, dir: &Path) -> Result<()>;

    /// Drop the loaded index.
    async fn clear(&self);
}
