//! Offline embedding model based on feature hashing.
//!
//! Useful for tests, demos and air-gapped machines: no network, no model
//! files, identical output on every run.

use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::Result;

/// Default dimension, matching common small sentence-embedding models.
pub const DEFAULT_HASHING_DIMENSIONS: usize = 384;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Embeds text by hashing lower-cased character trigrams and whole words
/// into a fixed number of buckets.
///
/// Components are non-negative counts scaled to unit length, so the cosine
/// similarity of two embeddings is never negative and grows with the number
/// of shared trigrams and words. Text with no features (the empty string)
/// maps to the first basis vector.
///
/// # Example
///
/// ```rust,ignore
/// use tarih_rag::{EmbeddingProvider, HashingEmbeddingProvider};
///
/// let provider = HashingEmbeddingProvider::new(256);
/// let v = provider.embed("Kurtuluş Savaşı").await?;
/// assert_eq!(v.len(), 256);
/// ```
#[derive(Debug, Clone)]
pub struct HashingEmbeddingProvider {
    dimensions: usize,
    name: String,
}

impl HashingEmbeddingProvider {
    /// Create a provider producing vectors of `dimensions` components (at least 1).
    pub fn new(dimensions: usize) -> Self {
        let dimensions = dimensions.max(1);
        Self { dimensions, name: format!("hashing-trigram-{dimensions}") }
    }

    /// Embed synchronously. [`EmbeddingProvider::embed`] delegates here.
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let lowered = text.to_lowercase();

        for word in lowered.split_whitespace() {
            let padded: Vec<char> = std::iter::once(' ')
                .chain(word.chars())
                .chain(std::iter::once(' '))
                .collect();
            for trigram in padded.windows(3) {
                vector[self.bucket(trigram.iter().copied())] += 1.0;
            }
            vector[self.bucket(word.chars())] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm == 0.0 {
            vector[0] = 1.0;
        } else {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }

    fn bucket(&self, chars: impl Iterator<Item = char>) -> usize {
        let mut hash = FNV_OFFSET;
        let mut buf = [0u8; 4];
        for c in chars {
            for byte in c.encode_utf8(&mut buf).bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(FNV_PRIME);
            }
        }
        (hash % self.dimensions as u64) as usize
    }
}

impl Default for HashingEmbeddingProvider {
    fn default() -> Self {
        Self::new(DEFAULT_HASHING_DIMENSIONS)
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn embeddings_are_unit_norm_and_non_negative() {
        let provider = HashingEmbeddingProvider::new(64);
        for text in ["", "Lale Devri", "ÇĞİÖŞÜ çğıöşü 1718"] {
            let v = provider.embed_sync(text);
            assert_eq!(v.len(), 64);
            assert!(v.iter().all(|x| *x >= 0.0));
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn deterministic_and_case_insensitive() {
        let provider = HashingEmbeddingProvider::default();
        assert_eq!(provider.embed_sync("Tanzimat Fermanı"), provider.embed_sync("tanzimat fermanı"));
        assert_eq!(provider.name(), "hashing-trigram-384");
    }

    #[test]
    fn related_text_scores_higher_than_unrelated() {
        let provider = HashingEmbeddingProvider::default();
        let doc = provider.embed_sync("İstanbul 1453 yılında fethedildi.");
        let related = provider.embed_sync("İstanbul ne zaman fethedildi?");
        let unrelated = provider.embed_sync("Cumhuriyet Ankara'da ilan edildi");
        assert!(cosine(&doc, &related) > cosine(&doc, &unrelated));
    }

    #[tokio::test]
    async fn batch_matches_single_embeddings() {
        let provider = HashingEmbeddingProvider::new(32);
        let batch = provider.embed_batch(&["Sakarya", "Dumlupınar"]).await.unwrap();
        assert_eq!(batch[0], provider.embed("Sakarya").await.unwrap());
        assert_eq!(batch[1], provider.embed("Dumlupınar").await.unwrap());
    }
}
