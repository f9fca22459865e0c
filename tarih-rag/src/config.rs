//! Configuration for chunking, retrieval, and index locations.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// How the retriever ranks candidates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    /// Embedding similarity only.
    #[default]
    Semantic,
    /// Weighted fusion of embedding similarity and keyword overlap.
    Hybrid,
}

impl FromStr for RetrievalMode {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "semantic" => Ok(Self::Semantic),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(RagError::ConfigError(format!(
                "unknown retrieval mode '{other}' (expected 'semantic' or 'hybrid')"
            ))),
        }
    }
}

/// Configuration parameters for indexing and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of top results to return from retrieval.
    pub top_k: usize,
    /// Minimum similarity for a candidate to survive (strictly-below is dropped).
    pub similarity_threshold: f32,
    /// Weight of the semantic score in hybrid mode; the keyword weight is `1 - alpha`.
    pub hybrid_alpha: f32,
    /// Ranking strategy used by the retriever.
    pub retrieval_mode: RetrievalMode,
    /// Directory holding the persisted index artifacts.
    pub index_dir: PathBuf,
    /// Directory holding the source corpus JSON files.
    pub data_dir: PathBuf,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 50,
            top_k: 5,
            similarity_threshold: 0.3,
            hybrid_alpha: 0.7,
            retrieval_mode: RetrievalMode::Semantic,
            index_dir: PathBuf::from("models/faiss_index"),
            data_dir: PathBuf::from("data/raw"),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Build a configuration from environment variables, falling back to defaults.
    ///
    /// Recognized variables: `CHUNK_SIZE`, `CHUNK_OVERLAP`, `TOP_K_RESULTS`,
    /// `SIMILARITY_THRESHOLD`, `HYBRID_ALPHA`, `RETRIEVAL_MODE`, `INDEX_DIR`,
    /// `DATA_DIR`. Unset variables keep their default; malformed values are
    /// a [`RagError::ConfigError`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reading from an arbitrary lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut builder = Self::builder();
        if let Some(v) = lookup("CHUNK_SIZE") {
            builder = builder.chunk_size(parse_var("CHUNK_SIZE", &v)?);
        }
        if let Some(v) = lookup("CHUNK_OVERLAP") {
            builder = builder.chunk_overlap(parse_var("CHUNK_OVERLAP", &v)?);
        }
        if let Some(v) = lookup("TOP_K_RESULTS") {
            builder = builder.top_k(parse_var("TOP_K_RESULTS", &v)?);
        }
        if let Some(v) = lookup("SIMILARITY_THRESHOLD") {
            builder = builder.similarity_threshold(parse_var("SIMILARITY_THRESHOLD", &v)?);
        }
        if let Some(v) = lookup("HYBRID_ALPHA") {
            builder = builder.hybrid_alpha(parse_var("HYBRID_ALPHA", &v)?);
        }
        if let Some(v) = lookup("RETRIEVAL_MODE") {
            builder = builder.retrieval_mode(v.parse()?);
        }
        if let Some(v) = lookup("INDEX_DIR") {
            builder = builder.index_dir(v);
        }
        if let Some(v) = lookup("DATA_DIR") {
            builder = builder.data_dir(v);
        }
        builder.build()
    }

    /// Return a builder seeded with this configuration, for overriding a few fields.
    pub fn to_builder(&self) -> RagConfigBuilder {
        RagConfigBuilder { config: self.clone() }
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| RagError::ConfigError(format!("invalid value for {key} ('{value}'): {e}")))
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of top results to return from retrieval.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the minimum similarity threshold for filtering results.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = threshold;
        self
    }

    /// Set the semantic weight used by hybrid retrieval.
    pub fn hybrid_alpha(mut self, alpha: f32) -> Self {
        self.config.hybrid_alpha = alpha;
        self
    }

    /// Set the retrieval strategy.
    pub fn retrieval_mode(mut self, mode: RetrievalMode) -> Self {
        self.config.retrieval_mode = mode;
        self
    }

    /// Set the directory for persisted index artifacts.
    pub fn index_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.index_dir = dir.into();
        self
    }

    /// Set the directory for source corpus files.
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0` or `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `similarity_threshold` is not finite
    /// - `hybrid_alpha` is outside `[0, 1]`
    pub fn build(self) -> Result<RagConfig> {
        let c = &self.config;
        if c.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if c.chunk_overlap >= c.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                c.chunk_overlap, c.chunk_size
            )));
        }
        if c.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if !c.similarity_threshold.is_finite() {
            return Err(RagError::ConfigError("similarity_threshold must be finite".to_string()));
        }
        if !(0.0..=1.0).contains(&c.hybrid_alpha) {
            return Err(RagError::ConfigError(format!(
                "hybrid_alpha ({}) must be within [0, 1]",
                c.hybrid_alpha
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = RagConfig::default();
        assert_eq!(config.chunk_size, 512);
        assert_eq!(config.chunk_overlap, 50);
        assert_eq!(config.top_k, 5);
        assert!((config.similarity_threshold - 0.3).abs() < f32::EPSILON);
        assert!((config.hybrid_alpha - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.retrieval_mode, RetrievalMode::Semantic);
    }

    #[test]
    fn rejects_overlap_not_below_chunk_size() {
        let result = RagConfig::builder().chunk_size(100).chunk_overlap(100).build();
        assert!(matches!(result, Err(RagError::ConfigError(_))));
    }

    #[test]
    fn rejects_zero_top_k_and_out_of_range_alpha() {
        assert!(RagConfig::builder().top_k(0).build().is_err());
        assert!(RagConfig::builder().hybrid_alpha(1.5).build().is_err());
        assert!(RagConfig::builder().hybrid_alpha(-0.1).build().is_err());
        assert!(RagConfig::builder().similarity_threshold(f32::NAN).build().is_err());
    }

    #[test]
    fn reads_overrides_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("CHUNK_SIZE", "256"),
            ("TOP_K_RESULTS", "3"),
            ("SIMILARITY_THRESHOLD", "0.45"),
            ("RETRIEVAL_MODE", "Hybrid"),
            ("INDEX_DIR", "/tmp/idx"),
        ]);
        let config = RagConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.chunk_size, 256);
        assert_eq!(config.chunk_overlap, 50);
        assert_eq!(config.top_k, 3);
        assert!((config.similarity_threshold - 0.45).abs() < 1e-6);
        assert_eq!(config.retrieval_mode, RetrievalMode::Hybrid);
        assert_eq!(config.index_dir, PathBuf::from("/tmp/idx"));
    }

    #[test]
    fn malformed_env_value_is_a_config_error() {
        let err = RagConfig::from_lookup(|k| (k == "CHUNK_SIZE").then(|| "big".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("CHUNK_SIZE"));
    }
}
