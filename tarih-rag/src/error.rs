//! Error types for the `tarih-rag` crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in retrieval operations.
///
/// Index-integrity variants (`DimensionMismatch`, `LengthMismatch`,
/// `IndexNotLoaded`, `IndexNotFound`, `CorruptIndex`, `InvalidVector`) are
/// fatal to the operation that raised them. Provider variants are translated
/// into user-facing text by [`AnswerAssembler`](crate::AnswerAssembler) and
/// [`RagSystem`](crate::RagSystem).
#[derive(Debug, Error)]
pub enum RagError {
    /// A vector's length does not match the index dimension.
    #[error("Dimension mismatch at position {position}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Offset of the offending vector within the submitted batch (0 for queries).
        position: usize,
        /// The index dimension.
        expected: usize,
        /// The length of the submitted vector.
        actual: usize,
    },

    /// The vector and metadata sequences differ in length.
    #[error("Length mismatch: {vectors} vectors but {metadata} metadata entries")]
    LengthMismatch {
        /// Number of vectors submitted.
        vectors: usize,
        /// Number of metadata entries submitted.
        metadata: usize,
    },

    /// A vector cannot be unit-normalized (zero norm or non-finite component).
    #[error("Invalid vector at position {position}: {reason}")]
    InvalidVector {
        /// Offset of the offending vector within the submitted batch (0 for queries).
        position: usize,
        /// Why the vector was rejected.
        reason: String,
    },

    /// The index was queried before it was built or loaded.
    #[error("Index not loaded: build or load an index first")]
    IndexNotLoaded,

    /// The vector artifact does not exist at the given location.
    #[error("Index not found: {}", path.display())]
    IndexNotFound {
        /// The missing vector artifact path.
        path: PathBuf,
    },

    /// The persisted artifacts are unreadable or out of sync with each other.
    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred while calling the generative model.
    #[error("Generation error ({provider}): {message}")]
    GenerationError {
        /// The generator that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A corpus file could not be read or parsed.
    #[error("Corpus error ({}): {message}", path.display())]
    CorpusError {
        /// The corpus file or directory involved.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error in the indexing pipeline orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),

    /// An I/O error from reading or writing index artifacts.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A JSON (de)serialization error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// A convenience result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RagError>;
