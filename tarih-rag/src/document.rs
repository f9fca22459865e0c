//! Data types for records, chunks, and retrieval results.
//!
//! Field names follow the corpus JSON (`donem`, `yil`, `kaynak`, ...) on the
//! wire and English names in Rust.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::normalize::truncate_text;

/// Number of characters kept in a [`SourceRef`] preview.
pub const SOURCE_PREVIEW_CHARS: usize = 200;

/// Primary and secondary category of a record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    /// Primary category (`ana`).
    #[serde(default, rename = "ana", deserialize_with = "lenient_string")]
    pub primary: String,
    /// Secondary category (`alt`).
    #[serde(default, rename = "alt", deserialize_with = "lenient_string")]
    pub secondary: String,
}

/// A historical fact from the source corpus.
///
/// Every field is optional on the wire; missing values take the documented
/// default (`"unknown"` for `id`, empty string, `0` for an unknown year,
/// empty list).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    /// Stable identifier.
    #[serde(default = "unknown_id", deserialize_with = "lenient_id")]
    pub id: String,
    /// Era label (`donem`).
    #[serde(default, rename = "donem", deserialize_with = "lenient_string")]
    pub era: String,
    /// Sub-era label (`alt_donem`).
    #[serde(default, rename = "alt_donem", deserialize_with = "lenient_string")]
    pub sub_era: String,
    /// Category pair (`kategori`).
    #[serde(default, rename = "kategori", deserialize_with = "lenient_category")]
    pub category: Category,
    /// Topic title (`konu`).
    #[serde(default, rename = "konu", deserialize_with = "lenient_string")]
    pub topic: String,
    /// Free-text body (`icerik`).
    #[serde(default, rename = "icerik", deserialize_with = "lenient_string")]
    pub body: String,
    /// Search keywords (`anahtar_kelimeler`).
    #[serde(default, rename = "anahtar_kelimeler", deserialize_with = "lenient_strings")]
    pub keywords: Vec<String>,
    /// Year, `0` when unknown (`yil`).
    #[serde(default, rename = "yil", deserialize_with = "lenient_year")]
    pub year: i32,
    /// Free-form tags (`etiketler`).
    #[serde(default, rename = "etiketler", deserialize_with = "lenient_strings")]
    pub tags: Vec<String>,
    /// Source citation (`kaynak`).
    #[serde(default, rename = "kaynak", deserialize_with = "lenient_string")]
    pub source: String,
    /// Source type label (`kaynak_turu`).
    #[serde(default, rename = "kaynak_turu", deserialize_with = "lenient_string")]
    pub source_type: String,
    /// External reference link (`referans_link`).
    #[serde(default, rename = "referans_link", deserialize_with = "lenient_string")]
    pub reference_link: String,
}

impl Default for Record {
    fn default() -> Self {
        Self {
            id: unknown_id(),
            era: String::new(),
            sub_era: String::new(),
            category: Category::default(),
            topic: String::new(),
            body: String::new(),
            keywords: Vec::new(),
            year: 0,
            tags: Vec::new(),
            source: String::new(),
            source_type: String::new(),
            reference_link: String::new(),
        }
    }
}

impl Record {
    /// The text that gets normalized and chunked: topic line, body and keyword
    /// line, each only when present, separated by blank lines.
    pub fn serialized_text(&self) -> String {
        let mut parts = Vec::with_capacity(3);
        let topic = self.topic.trim();
        if !topic.is_empty() {
            parts.push(format!("Konu: {topic}"));
        }
        let body = self.body.trim();
        if !body.is_empty() {
            parts.push(body.to_string());
        }
        let keywords: Vec<&str> =
            self.keywords.iter().map(|k| k.trim()).filter(|k| !k.is_empty()).collect();
        if !keywords.is_empty() {
            parts.push(format!("Anahtar Kelimeler: {}", keywords.join(", ")));
        }
        parts.join("\n\n")
    }
}

fn unknown_id() -> String {
    "unknown".to_string()
}

/// Where a record was loaded from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordOrigin {
    /// Path of the corpus file.
    pub source: String,
    /// File name component of `source`.
    pub filename: String,
}

impl RecordOrigin {
    /// Build an origin from a corpus file path.
    pub fn from_path(path: &Path) -> Self {
        Self {
            source: path.display().to_string(),
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }
}

impl From<PathBuf> for RecordOrigin {
    fn from(path: PathBuf) -> Self {
        Self::from_path(&path)
    }
}

/// Record metadata copied verbatim into every chunk of that record.
///
/// Serialized with the corpus key names; this is the `metadata` object of
/// each element in the persisted metadata artifact.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    /// Record identifier.
    pub id: String,
    /// Era label.
    #[serde(rename = "donem", default)]
    pub era: String,
    /// Sub-era label.
    #[serde(rename = "alt_donem", default)]
    pub sub_era: String,
    /// Primary category.
    #[serde(rename = "kategori_ana", default)]
    pub category_primary: String,
    /// Secondary category.
    #[serde(rename = "kategori_alt", default)]
    pub category_secondary: String,
    /// Topic title.
    #[serde(rename = "konu", default)]
    pub topic: String,
    /// Year, `0` when unknown.
    #[serde(rename = "yil", default)]
    pub year: i32,
    /// Tags.
    #[serde(rename = "etiketler", default)]
    pub tags: Vec<String>,
    /// Source citation.
    #[serde(rename = "kaynak", default)]
    pub source_citation: String,
    /// Source type label.
    #[serde(rename = "kaynak_turu", default)]
    pub source_type: String,
    /// External reference link.
    #[serde(rename = "referans_link", default)]
    pub reference_link: String,
    /// Corpus file the record came from.
    #[serde(default)]
    pub source: String,
    /// File name of `source`.
    #[serde(default)]
    pub filename: String,
    /// Position of the chunk within its record.
    #[serde(default)]
    pub chunk_index: usize,
}

impl ChunkMetadata {
    /// Copy a record's metadata for the chunk at `chunk_index`.
    pub fn from_record(record: &Record, origin: &RecordOrigin, chunk_index: usize) -> Self {
        Self {
            id: record.id.clone(),
            era: record.era.clone(),
            sub_era: record.sub_era.clone(),
            category_primary: record.category.primary.clone(),
            category_secondary: record.category.secondary.clone(),
            topic: record.topic.clone(),
            year: record.year,
            tags: record.tags.clone(),
            source_citation: record.source.clone(),
            source_type: record.source_type.clone(),
            reference_link: record.reference_link.clone(),
            source: origin.source.clone(),
            filename: origin.filename.clone(),
            chunk_index,
        }
    }

    /// The year when known.
    pub fn known_year(&self) -> Option<i32> {
        (self.year != 0).then_some(self.year)
    }
}

/// A bounded slice of a record's normalized text: the unit of embedding,
/// storage and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// The chunk text.
    pub content: String,
    /// Metadata inherited from the parent record.
    pub metadata: ChunkMetadata,
}

/// One index position joined with its scores for a single query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    /// Index position of the chunk.
    pub position: usize,
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Cosine similarity to the query (0.0 for keyword-only hybrid candidates).
    pub similarity: f32,
    /// `1 - similarity`.
    pub distance: f32,
    /// Keyword overlap score, set in hybrid mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_score: Option<f32>,
    /// Fused score, set in hybrid mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hybrid_score: Option<f32>,
}

impl RetrievalResult {
    /// A result ranked by embedding similarity only.
    pub fn semantic(position: usize, chunk: Chunk, similarity: f32) -> Self {
        Self {
            position,
            chunk,
            similarity,
            distance: 1.0 - similarity,
            keyword_score: None,
            hybrid_score: None,
        }
    }
}

/// Citation preview returned to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceRef {
    /// Truncated chunk text.
    pub content: String,
    /// Era label, `Bilinmiyor` when empty.
    pub donem: String,
    /// Year, `null` when unknown.
    pub yil: Option<i32>,
    /// Source citation, `Bilinmiyor` when empty.
    pub kaynak: String,
    /// Similarity of the cited chunk.
    pub similarity: f32,
}

impl From<&RetrievalResult> for SourceRef {
    fn from(result: &RetrievalResult) -> Self {
        let meta = &result.chunk.metadata;
        Self {
            content: preview(&result.chunk.content),
            donem: or_unknown(&meta.era),
            yil: meta.known_year(),
            kaynak: or_unknown(&meta.source_citation),
            similarity: result.similarity,
        }
    }
}

fn preview(content: &str) -> String {
    if content.chars().count() <= SOURCE_PREVIEW_CHARS {
        content.to_string()
    } else {
        truncate_text(content, SOURCE_PREVIEW_CHARS + 3, "...")
    }
}

pub(crate) fn or_unknown(value: &str) -> String {
    if value.trim().is_empty() { "Bilinmiyor".to_string() } else { value.to_string() }
}

/// The answer to one question, as consumed by the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResponse {
    /// The question as asked.
    pub query: String,
    /// Generated answer, or a user-facing message when nothing could be answered.
    pub response: String,
    /// Citations for the chunks used as context.
    pub sources: Vec<SourceRef>,
    /// `sources.len()`.
    pub num_sources: usize,
}

// ── Lenient field decoding ─────────────────────────────────────────
//
// Corpus files are hand-edited; a `null` or a number where a string is
// expected falls back to the default instead of rejecting the record.

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let id = lenient_string(deserializer)?;
    Ok(if id.is_empty() { unknown_id() } else { id })
}

fn lenient_strings<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.trim().is_empty())
            .collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s],
        _ => Vec::new(),
    })
}

fn lenient_year<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|y| i32::try_from(y).ok())
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn lenient_category<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Category, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => serde_json::from_value(value).unwrap_or_default(),
        _ => Category::default(),
    })
}
