//! Exact inner-product vector index with positional metadata.
//!
//! [`FlatIndex`] stores unit-normalized vectors in one contiguous buffer and
//! a metadata entry for every vector at the same position. Search is
//! exhaustive, so results are exact and deterministic.
//!
//! # Persisted layout
//!
//! Two files live side by side in the index directory:
//!
//! - `index.bin`: magic `TRIX`, format version (u32), dimension (u32),
//!   count (u64), SHA-256 of the metadata file bytes (32 bytes), then
//!   `count * dimension` little-endian `f32` values.
//! - `metadata.json`: a JSON array with one entry per vector, in vector order.
//!
//! The count and checksum in the header tie the two files together so that a
//! stale or swapped metadata file is detected on load.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{RagError, Result};

/// File name of the vector artifact.
pub const INDEX_FILE: &str = "index.bin";
/// File name of the metadata artifact.
pub const METADATA_FILE: &str = "metadata.json";
/// Index type reported by [`FlatIndex::stats`].
pub const INDEX_TYPE: &str = "FlatInnerProduct";
/// Exact search is intended for collections up to this many vectors.
pub const SCALING_LIMIT: usize = 100_000;

const MAGIC: &[u8; 4] = b"TRIX";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8 + 32;

/// One search hit: similarity to the query and the index position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchHit {
    /// Inner product of the unit query and the unit stored vector.
    pub similarity: f32,
    /// Position of the hit in the index.
    pub position: usize,
}

/// Summary counters for an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Number of stored vectors.
    pub total_vectors: usize,
    /// Vector dimension.
    pub dimension: usize,
    /// Always [`INDEX_TYPE`].
    pub index_type: String,
    /// Number of metadata entries, equal to `total_vectors`.
    pub metadata_count: usize,
}

/// Ordered unit vectors with positional correspondence to ordered metadata.
///
/// # Example
///
/// ```rust
/// use tarih_rag::index::FlatIndex;
///
/// let index = FlatIndex::build(2, vec![vec![1.0, 0.0], vec![0.0, 2.0]], vec!["a", "b"]).unwrap();
/// let hits = index.search(&[0.0, 1.0], 1).unwrap();
/// assert_eq!(hits[0].position, 1);
/// assert_eq!(index.metadata(1), Some(&"b"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex<M> {
    dimension: usize,
    vectors: Vec<f32>,
    metadata: Vec<M>,
}

impl<M> FlatIndex<M> {
    /// Create an empty index of the given dimension.
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(RagError::ConfigError(
                "index dimension must be greater than zero".to_string(),
            ));
        }
        Ok(Self { dimension, vectors: Vec::new(), metadata: Vec::new() })
    }

    /// Build an index from vectors and their metadata.
    ///
    /// Every vector is L2-normalized on the way in.
    ///
    /// # Errors
    ///
    /// - [`RagError::LengthMismatch`] if the two sequences differ in length
    /// - [`RagError::DimensionMismatch`] if a vector's length is not `dimension`
    /// - [`RagError::InvalidVector`] if a vector has zero norm or a non-finite component
    pub fn build(dimension: usize, vectors: Vec<Vec<f32>>, metadata: Vec<M>) -> Result<Self> {
        let mut index = Self::new(dimension)?;
        index.append(vectors, metadata)?;
        Ok(index)
    }

    /// Append vectors and metadata at the end of the index.
    ///
    /// The whole batch is validated before anything is stored, so on error
    /// the index is unchanged. Appending an empty batch is a no-op.
    pub fn append(&mut self, vectors: Vec<Vec<f32>>, metadata: Vec<M>) -> Result<()> {
        if vectors.len() != metadata.len() {
            return Err(RagError::LengthMismatch {
                vectors: vectors.len(),
                metadata: metadata.len(),
            });
        }
        if vectors.is_empty() {
            return Ok(());
        }

        let mut flat = Vec::with_capacity(vectors.len() * self.dimension);
        for (position, vector) in vectors.iter().enumerate() {
            flat.extend(unit_normalize(vector, self.dimension, position)?);
        }

        self.vectors.extend(flat);
        self.metadata.extend(metadata);
        debug!(added = vectors.len(), total = self.len(), "appended vectors to index");
        if self.len() > SCALING_LIMIT {
            warn!(
                total = self.len(),
                limit = SCALING_LIMIT,
                "flat index exceeds the size exact search is intended for"
            );
        }
        Ok(())
    }

    /// Return the `k` stored vectors most similar to `query`.
    ///
    /// The query is normalized first. Hits are ordered by descending
    /// similarity, ties by ascending position. If `k` exceeds the index size
    /// every position is returned.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let query = unit_normalize(query, self.dimension, 0)?;
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits: Vec<SearchHit> = self
            .vectors
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, stored)| SearchHit { similarity: dot(&query, stored), position })
            .collect();

        hits.sort_by(|a, b| {
            b.similarity.total_cmp(&a.similarity).then_with(|| a.position.cmp(&b.position))
        });
        hits.truncate(k);
        Ok(hits)
    }

    /// Similarity between `query` and the stored vector at `position`, or
    /// `None` when no vector is stored there.
    pub fn similarity(&self, query: &[f32], position: usize) -> Result<Option<f32>> {
        let query = unit_normalize(query, self.dimension, 0)?;
        Ok(self.vector(position).map(|stored| dot(&query, stored)))
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    /// Whether the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// Vector dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// The stored (unit) vector at `position`.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimension)?;
        self.vectors.get(start..start + self.dimension)
    }

    /// The metadata entry at `position`.
    pub fn metadata(&self, position: usize) -> Option<&M> {
        self.metadata.get(position)
    }

    /// Metadata entries in position order.
    pub fn iter_metadata(&self) -> impl Iterator<Item = &M> {
        self.metadata.iter()
    }

    /// Summary counters.
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            total_vectors: self.len(),
            dimension: self.dimension,
            index_type: INDEX_TYPE.to_string(),
            metadata_count: self.metadata.len(),
        }
    }
}

impl<M: Serialize> FlatIndex<M> {
    /// Write `index.bin` and `metadata.json` into `dir`, creating it if needed.
    ///
    /// Each file is written to a temporary name and renamed into place.
    pub fn persist(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let metadata_bytes = serde_json::to_vec_pretty(&self.metadata)?;
        let checksum = Sha256::digest(&metadata_bytes);

        let mut index_bytes = Vec::with_capacity(HEADER_LEN + self.vectors.len() * 4);
        index_bytes.extend_from_slice(MAGIC);
        index_bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        index_bytes.extend_from_slice(&header_u32(self.dimension, "dimension")?.to_le_bytes());
        index_bytes.extend_from_slice(&(self.len() as u64).to_le_bytes());
        index_bytes.extend_from_slice(&checksum);
        for value in &self.vectors {
            index_bytes.extend_from_slice(&value.to_le_bytes());
        }

        write_replacing(&dir.join(METADATA_FILE), &metadata_bytes)?;
        write_replacing(&dir.join(INDEX_FILE), &index_bytes)?;
        info!(dir = %dir.display(), vectors = self.len(), dimension = self.dimension, "index persisted");
        Ok(())
    }
}

impl<M: DeserializeOwned> FlatIndex<M> {
    /// Load an index previously written by [`persist`](Self::persist).
    ///
    /// # Errors
    ///
    /// - [`RagError::IndexNotFound`] if `index.bin` does not exist
    /// - [`RagError::CorruptIndex`] on a bad header, truncated or oversized
    ///   vector data, a metadata count that differs from the vector count, a
    ///   checksum mismatch, or a missing metadata file for a non-empty index
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let index_path = dir.join(INDEX_FILE);
        if !index_path.is_file() {
            return Err(RagError::IndexNotFound { path: index_path });
        }

        let bytes = fs::read(&index_path)?;
        let header = Header::parse(&bytes)?;
        let vectors = decode_vectors(&bytes[HEADER_LEN..], &header)?;

        let metadata_path = dir.join(METADATA_FILE);
        let metadata: Vec<M> = if metadata_path.is_file() {
            let metadata_bytes = fs::read(&metadata_path)?;
            let metadata: Vec<M> = serde_json::from_slice(&metadata_bytes).map_err(|e| {
                RagError::CorruptIndex(format!("unreadable {METADATA_FILE}: {e}"))
            })?;
            if metadata.len() != header.count {
                return Err(RagError::CorruptIndex(format!(
                    "{METADATA_FILE} has {} entries but {INDEX_FILE} has {} vectors",
                    metadata.len(),
                    header.count
                )));
            }
            if Sha256::digest(&metadata_bytes).as_slice() != header.checksum.as_slice() {
                return Err(RagError::CorruptIndex(format!(
                    "{METADATA_FILE} checksum does not match {INDEX_FILE}"
                )));
            }
            metadata
        } else if header.count == 0 {
            Vec::new()
        } else {
            return Err(RagError::CorruptIndex(format!(
                "{METADATA_FILE} is missing for an index of {} vectors",
                header.count
            )));
        };

        info!(dir = %dir.display(), vectors = header.count, dimension = header.dimension, "index loaded");
        Ok(Self { dimension: header.dimension, vectors, metadata })
    }
}

struct Header {
    dimension: usize,
    count: usize,
    checksum: [u8; 32],
}

impl Header {
    fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(RagError::CorruptIndex(format!(
                "{INDEX_FILE} is truncated: {} bytes, header needs {HEADER_LEN}",
                bytes.len()
            )));
        }
        if bytes[0..4] != MAGIC[..] {
            return Err(RagError::CorruptIndex(format!("{INDEX_FILE} has an invalid magic number")));
        }
        let version = u32::from_le_bytes(le_array(&bytes[4..8]));
        if version != FORMAT_VERSION {
            return Err(RagError::CorruptIndex(format!(
                "unsupported index format version {version} (expected {FORMAT_VERSION})"
            )));
        }
        let dimension = u32::from_le_bytes(le_array(&bytes[8..12])) as usize;
        if dimension == 0 {
            return Err(RagError::CorruptIndex("index dimension is zero".to_string()));
        }
        let count = usize::try_from(u64::from_le_bytes(le_array(&bytes[12..20])))
            .map_err(|_| RagError::CorruptIndex("vector count does not fit in memory".to_string()))?;
        Ok(Self { dimension, count, checksum: le_array(&bytes[20..52]) })
    }
}

fn decode_vectors(data: &[u8], header: &Header) -> Result<Vec<f32>> {
    let expected = header
        .count
        .checked_mul(header.dimension)
        .and_then(|n| n.checked_mul(std::mem::size_of::<f32>()))
        .ok_or_else(|| RagError::CorruptIndex("vector data size overflows".to_string()))?;
    if data.len() != expected {
        return Err(RagError::CorruptIndex(format!(
            "vector data is {} bytes, expected {expected} for {} vectors of dimension {}",
            data.len(),
            header.count,
            header.dimension
        )));
    }

    let mut out = Vec::with_capacity(header.count * header.dimension);
    for bytes in data.chunks_exact(4) {
        let value = f32::from_le_bytes(le_array(bytes));
        if !value.is_finite() {
            return Err(RagError::CorruptIndex("vector data contains non-finite values".to_string()));
        }
        out.push(value);
    }
    Ok(out)
}

fn le_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

fn header_u32(value: usize, field: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| RagError::PipelineError(format!("{field} {value} does not fit the index header")))
}

fn write_replacing(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = PathBuf::from(path);
    tmp.as_mut_os_string().push(".tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Check `vector` against `dimension` and scale it to unit length.
///
/// `position` is the offset reported in errors.
pub fn unit_normalize(vector: &[f32], dimension: usize, position: usize) -> Result<Vec<f32>> {
    if vector.len() != dimension {
        return Err(RagError::DimensionMismatch { position, expected: dimension, actual: vector.len() });
    }
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(RagError::InvalidVector {
            position,
            reason: "vector has a non-finite component".to_string(),
        });
    }
    let norm = vector.iter().map(|&v| f64::from(v) * f64::from(v)).sum::<f64>().sqrt();
    if norm <= f64::from(f32::MIN_POSITIVE) {
        return Err(RagError::InvalidVector { position, reason: "vector has zero norm".to_string() });
    }
    Ok(vector.iter().map(|&v| (f64::from(v) / norm) as f32).collect())
}
