//! In-memory vector store over a [`FlatIndex`].
//!
//! This module provides [`InMemoryVectorStore`], which keeps the whole chunk
//! index in memory behind a `tokio::sync::RwLock`. Queries share the read
//! lock; building, appending and loading take the write lock.

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Chunk, RetrievalResult};
use crate::error::{RagError, Result};
use crate::hybrid::{KeywordHit, rank_by_keywords};
use crate::index::{FlatIndex, IndexStats};
use crate::vectorstore::VectorStore;

/// An in-memory vector store with exact inner-product search.
///
/// # Example
///
/// ```rust,ignore
/// use tarih_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.build(384, vectors, chunks).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    index: RwLock<Option<FlatIndex<Chunk>>>,
}

impl InMemoryVectorStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an already built index.
    pub fn from_index(index: FlatIndex<Chunk>) -> Self {
        Self { index: RwLock::new(Some(index)) }
    }

    /// Whether an index has been built or loaded.
    pub async fn is_loaded(&self) -> bool {
        self.index.read().await.is_some()
    }

    /// Dimension of the loaded index.
    pub async fn dimension(&self) -> Result<usize> {
        let guard = self.index.read().await;
        guard.as_ref().map(FlatIndex::dimension).ok_or(RagError::IndexNotLoaded)
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn build(
        &self,
        dimension: usize,
        vectors: Vec<Vec<f32>>,
        chunks: Vec<Chunk>,
    ) -> Result<()> {
        let index = FlatIndex::build(dimension, vectors, chunks)?;
        *self.index.write().await = Some(index);
        Ok(())
    }

    async fn append(&self, vectors: Vec<Vec<f32>>, chunks: Vec<Chunk>) -> Result<()> {
        let mut guard = self.index.write().await;
        let index = guard.as_mut().ok_or(RagError::IndexNotLoaded)?;
        index.append(vectors, chunks)
    }

    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<RetrievalResult>> {
        let guard = self.index.read().await;
        let index = guard.as_ref().ok_or(RagError::IndexNotLoaded)?;
        let hits = index.search(embedding, top_k)?;
        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                let chunk = index.metadata(hit.position)?.clone();
                Some(RetrievalResult::semantic(hit.position, chunk, hit.similarity))
            })
            .collect())
    }

    async fn score(&self, embedding: &[f32], positions: &[usize]) -> Result<Vec<RetrievalResult>> {
        let guard = self.index.read().await;
        let index = guard.as_ref().ok_or(RagError::IndexNotLoaded)?;
        let mut results = Vec::with_capacity(positions.len());
        for &position in positions {
            let (Some(similarity), Some(chunk)) =
                (index.similarity(embedding, position)?, index.metadata(position))
            else {
                continue;
            };
            results.push(RetrievalResult::semantic(position, chunk.clone(), similarity));
        }
        Ok(results)
    }

    async fn keyword_search(&self, query: &str, top_k: usize) -> Result<Vec<KeywordHit>> {
        let guard = self.index.read().await;
        let index = guard.as_ref().ok_or(RagError::IndexNotLoaded)?;
        Ok(rank_by_keywords(query, index.iter_metadata().enumerate(), top_k))
    }

    async fn len(&self) -> Result<usize> {
        let guard = self.index.read().await;
        guard.as_ref().map(FlatIndex::len).ok_or(RagError::IndexNotLoaded)
    }

    async fn stats(&self) -> Result<IndexStats> {
        let guard = self.index.read().await;
        guard.as_ref().map(FlatIndex::stats).ok_or(RagError::IndexNotLoaded)
    }

    async fn persist(&self, dir: &Path) -> Result<()> {
        let guard = self.index.read().await;
        guard.as_ref().ok_or(RagError::IndexNotLoaded)?.persist(dir)
    }

    async fn load(&self, dir: &Path) -> Result<()> {
        let index = FlatIndex::load(dir)?;
        *self.index.write().await = Some(index);
        Ok(())
    }

    async fn clear(&self) {
        *self.index.write().await = None;
    }
}
