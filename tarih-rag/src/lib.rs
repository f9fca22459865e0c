//! # tarih-rag
//!
//! Retrieval-augmented question answering over a corpus of Turkish history
//! records.
//!
//! ## Overview
//!
//! Records are normalized, split into overlapping chunks, embedded and kept in
//! an exact inner-product index. At query time the closest chunks are
//! retrieved (optionally fused with keyword overlap), formatted as cited
//! context and passed with the question to a generative model.
//!
//! - [`IndexPipeline`] - corpus → chunks → embeddings → persisted index
//! - [`FlatIndex`] - exact search with positional metadata and checksummed persistence
//! - [`Retriever`] - semantic or hybrid retrieval with a similarity threshold
//! - [`AnswerAssembler`] - context formatting and answer generation
//! - [`RagSystem`] - the query-time application context
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tarih_rag::{ExtractiveGenerator, HashingEmbeddingProvider, IndexPipeline, RagConfig, RagSystem};
//!
//! let config = RagConfig::from_env()?;
//! let embedder = Arc::new(HashingEmbeddingProvider::default());
//!
//! IndexPipeline::builder()
//!     .config(config.clone())
//!     .embedding_provider(embedder.clone())
//!     .build()?
//!     .build_index()
//!     .await?;
//!
//! let system = RagSystem::open(config, embedder, Arc::new(ExtractiveGenerator::new())).await?;
//! let answer = system.query("İstanbul ne zaman fethedildi?").await;
//! ```
//!
//! ## Features
//!
//! - `openai` - OpenAI-compatible embeddings and chat completions
//! - `gemini` - Gemini embeddings and `generateContent`
//! - `full` - both

pub mod assembler;
pub mod chunking;
pub mod config;
pub mod corpus;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod hashing;
pub mod hybrid;
pub mod index;
pub mod inmemory;
pub mod normalize;
pub mod pipeline;
pub mod retrieval;
pub mod system;
pub mod vectorstore;

#[cfg(feature = "gemini")]
pub mod gemini;
#[cfg(feature = "openai")]
pub mod openai;

pub use assembler::{AnswerAssembler, NO_INFORMATION_RESPONSE};
pub use chunking::{Chunker, RecursiveChunker};
pub use config::{RagConfig, RagConfigBuilder, RetrievalMode};
pub use corpus::{Corpus, CorpusReport, load_records};
pub use document::{
    Category, Chunk, ChunkMetadata, QueryResponse, Record, RecordOrigin, RetrievalResult, SourceRef,
};
pub use embedding::{EMBED_BATCH_SIZE, EmbeddingProvider};
pub use error::{RagError, Result};
pub use generation::{ExtractiveGenerator, GenerationRequest, TextGenerator};
pub use hashing::HashingEmbeddingProvider;
pub use hybrid::{KeywordHit, fuse};
pub use index::{FlatIndex, IndexStats, SearchHit};
pub use inmemory::InMemoryVectorStore;
pub use normalize::normalize;
pub use pipeline::{BuildReport, CorpusStats, IndexPipeline, IndexPipelineBuilder};
pub use retrieval::Retriever;
pub use system::RagSystem;
pub use vectorstore::VectorStore;

#[cfg(feature = "gemini")]
pub use gemini::{GeminiEmbeddingProvider, GeminiGenerator};
#[cfg(feature = "openai")]
pub use openai::{OpenAIChatGenerator, OpenAIEmbeddingProvider};
