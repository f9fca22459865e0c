//! Offline indexing pipeline.
//!
//! The [`IndexPipeline`] turns a corpus directory into the persisted index
//! used at query time by composing an [`EmbeddingProvider`], a
//! [`VectorStore`] and a [`Chunker`].
//!
//! # Example
//!
//! ```rust,ignore
//! use tarih_rag::{IndexPipeline, RagConfig, HashingEmbeddingProvider};
//!
//! let pipeline = IndexPipeline::builder()
//!     .config(RagConfig::from_env()?)
//!     .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
//!     .build()?;
//!
//! let report = pipeline.build_index().await?;
//! println!("{} chunks indexed", report.stats.total_chunks);
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::corpus::{CorpusReport, load_records};
use crate::document::{Chunk, Record, RecordOrigin};
use crate::embedding::{EMBED_BATCH_SIZE, EmbeddingProvider};
use crate::error::{RagError, Result};
use crate::inmemory::InMemoryVectorStore;
use crate::vectorstore::VectorStore;

/// File name of the corpus statistics written next to the index.
pub const STATS_FILE: &str = "stats.json";

/// Corpus statistics written to `stats.json` after a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusStats {
    /// Number of indexed chunks.
    pub total_chunks: usize,
    /// Embedding dimension.
    pub dimension: usize,
    /// Embedding model name.
    pub model_name: String,
    /// Corpus directory the index was built from.
    pub data_source: String,
    /// Distinct non-empty era labels, sorted.
    pub periods: Vec<String>,
    /// Chunk count per era label.
    pub chunks_per_period: BTreeMap<String, usize>,
}

impl CorpusStats {
    fn from_chunks(chunks: &[Chunk], dimension: usize, model_name: &str, data_source: &Path) -> Self {
        let mut chunks_per_period = BTreeMap::new();
        for chunk in chunks {
            if !chunk.metadata.era.is_empty() {
                *chunks_per_period.entry(chunk.metadata.era.clone()).or_insert(0) += 1;
            }
        }
        Self {
            total_chunks: chunks.len(),
            dimension,
            model_name: model_name.to_string(),
            data_source: data_source.display().to_string(),
            periods: chunks_per_period.keys().cloned().collect(),
            chunks_per_period,
        }
    }

    /// Read `stats.json` from an index directory.
    pub async fn read(index_dir: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(index_dir.join(STATS_FILE)).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Outcome of [`IndexPipeline::build_index`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Corpus load counters.
    pub corpus: CorpusReport,
    /// Statistics written to `stats.json`.
    pub stats: CorpusStats,
}

/// The indexing pipeline.
///
/// Coordinates corpus loading, chunking, batched embedding, index building
/// and persistence. Construct one via [`IndexPipeline::builder()`].
pub struct IndexPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
    batch_size: usize,
}

impl IndexPipeline {
    /// Create a new [`IndexPipelineBuilder`].
    pub fn builder() -> IndexPipelineBuilder {
        IndexPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Chunk records in order, numbering chunks within each record.
    pub fn chunk_records(&self, records: &[(Record, RecordOrigin)]) -> Vec<Chunk> {
        records.iter().flat_map(|(record, origin)| self.chunker.chunk(record, origin)).collect()
    }

    /// Embed chunk contents in batches, preserving order.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] naming the failed batch.
    pub async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(chunks.len());
        for (batch_index, batch) in chunks.chunks(self.batch_size).enumerate() {
            let texts: Vec<&str> = batch.iter().map(|c| c.content.as_str()).collect();
            let embeddings =
                self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
                    error!(batch = batch_index, error = %e, "embedding failed during indexing");
                    RagError::PipelineError(format!("embedding failed for batch {batch_index}: {e}"))
                })?;
            if embeddings.len() != batch.len() {
                return Err(RagError::PipelineError(format!(
                    "provider returned {} embeddings for a batch of {}",
                    embeddings.len(),
                    batch.len()
                )));
            }
            vectors.extend(embeddings);
        }
        Ok(vectors)
    }

    /// Build the index from `config.data_dir` and persist it to `config.index_dir`.
    ///
    /// Writes `index.bin`, `metadata.json` and `stats.json`.
    pub async fn build_index(&self) -> Result<BuildReport> {
        let corpus = load_records(&self.config.data_dir)?;
        let chunks = self.chunk_records(&corpus.records);
        info!(records = corpus.records.len(), chunks = chunks.len(), "corpus chunked");

        let vectors = self.embed_chunks(&chunks).await?;
        let dimension = self.embedding_provider.dimensions();
        let stats = CorpusStats::from_chunks(
            &chunks,
            dimension,
            self.embedding_provider.name(),
            &self.config.data_dir,
        );

        self.vector_store.build(dimension, vectors, chunks).await?;
        self.vector_store.persist(&self.config.index_dir).await?;
        tokio::fs::write(
            self.config.index_dir.join(STATS_FILE),
            serde_json::to_vec_pretty(&stats)?,
        )
        .await?;

        info!(
            chunks = stats.total_chunks,
            dimension,
            model = %stats.model_name,
            index_dir = %self.config.index_dir.display(),
            "index built"
        );
        Ok(BuildReport { corpus: corpus.report, stats })
    }

    /// Load the persisted index from `config.index_dir` into the store.
    pub async fn load_existing(&self) -> Result<()> {
        self.vector_store.load(&self.config.index_dir).await
    }

    /// Chunk, embed and append extra records to the loaded index.
    ///
    /// Returns the number of chunks appended. The append is all-or-nothing.
    pub async fn append_records(&self, records: &[(Record, RecordOrigin)]) -> Result<usize> {
        let chunks = self.chunk_records(records);
        if chunks.is_empty() {
            return Ok(0);
        }
        let vectors = self.embed_chunks(&chunks).await?;
        let count = chunks.len();
        self.vector_store.append(vectors, chunks).await?;
        info!(records = records.len(), chunks = count, "records appended to index");
        Ok(count)
    }

    /// Persist the current index to `config.index_dir`.
    pub async fn persist(&self) -> Result<()> {
        self.vector_store.persist(&self.config.index_dir).await
    }
}

/// Builder for constructing an [`IndexPipeline`].
///
/// `config` and `embedding_provider` are required. The store defaults to an
/// [`InMemoryVectorStore`], the chunker to a [`RecursiveChunker`] using the
/// config's chunk size and overlap, and the batch size to 32.
#[derive(Default)]
pub struct IndexPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
    batch_size: Option<usize>,
}

impl IndexPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the record chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set how many chunks are embedded per provider call.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Build the [`IndexPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing or the
    /// batch size is zero.
    pub fn build(self) -> Result<IndexPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let batch_size = self.batch_size.unwrap_or(EMBED_BATCH_SIZE);
        if batch_size == 0 {
            return Err(RagError::ConfigError("batch_size must be greater than zero".to_string()));
        }
        let chunker =
            self.chunker.unwrap_or_else(|| Arc::new(RecursiveChunker::from_config(&config)));
        let vector_store =
            self.vector_store.unwrap_or_else(|| Arc::new(InMemoryVectorStore::new()));

        Ok(IndexPipeline { config, embedding_provider, vector_store, chunker, batch_size })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::HashingEmbeddingProvider;

    #[test]
    fn builder_requires_config_and_provider() {
        assert!(matches!(IndexPipeline::builder().build(), Err(RagError::ConfigError(_))));
        let err = IndexPipeline::builder()
            .config(RagConfig::default())
            .embedding_provider(Arc::new(HashingEmbeddingProvider::new(8)))
            .batch_size(0)
            .build();
        assert!(matches!(err, Err(RagError::ConfigError(_))));
    }

    #[test]
    fn stats_count_chunks_per_era() {
        let mut a = Chunk {
            content: "a".into(),
            metadata: crate::document::ChunkMetadata::default(),
        };
        a.metadata.era = "Osmanlı Devleti".into();
        let mut b = a.clone();
        b.metadata.era = "Cumhuriyet Dönemi".into();
        let c = Chunk { content: "c".into(), metadata: Default::default() };

        let stats = CorpusStats::from_chunks(&[a.clone(), b, a, c], 8, "m", Path::new("data"));
        assert_eq!(stats.total_chunks, 4);
        assert_eq!(stats.periods, vec!["Cumhuriyet Dönemi", "Osmanlı Devleti"]);
        assert_eq!(stats.chunks_per_period["Osmanlı Devleti"], 2);
    }
}
