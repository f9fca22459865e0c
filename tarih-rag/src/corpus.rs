//! Corpus discovery and record loading.
//!
//! The corpus is a directory of JSON files, each holding an array of record
//! objects. Malformed input is logged and skipped so that one bad file does
//! not block indexing the rest.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::document::{Record, RecordOrigin};
use crate::error::{RagError, Result};

/// Counters describing one corpus load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CorpusReport {
    /// JSON files parsed successfully.
    pub files_read: usize,
    /// JSON files skipped as unreadable or not an array.
    pub files_skipped: usize,
    /// Records accepted.
    pub records: usize,
    /// Array elements skipped (non-object or blank text).
    pub records_skipped: usize,
}

/// Records loaded from a corpus directory, in file-name then array order.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    /// Accepted records with the file they came from.
    pub records: Vec<(Record, RecordOrigin)>,
    /// Load counters.
    pub report: CorpusReport,
}

/// List the `*.json` files directly under `data_dir`, sorted by path.
pub fn discover_corpus_files(data_dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let data_dir = data_dir.as_ref();
    if !data_dir.is_dir() {
        return Err(RagError::CorpusError {
            path: data_dir.to_path_buf(),
            message: "data directory does not exist".to_string(),
        });
    }

    let mut files = WalkDir::new(data_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"))
        .map(|entry| entry.into_path())
        .collect::<Vec<_>>();

    files.sort();
    Ok(files)
}

/// Load every record from the corpus files under `data_dir`.
///
/// # Errors
///
/// Returns [`RagError::CorpusError`] only when `data_dir` itself is missing.
/// Unreadable files, files that are not a JSON array, and array elements that
/// are not objects or have no text are skipped with a warning.
pub fn load_records(data_dir: impl AsRef<Path>) -> Result<Corpus> {
    let files = discover_corpus_files(&data_dir)?;
    let mut corpus = Corpus::default();

    for path in files {
        let items = match read_array(&path) {
            Ok(items) => items,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "skipping corpus file");
                corpus.report.files_skipped += 1;
                continue;
            }
        };
        corpus.report.files_read += 1;

        let origin = RecordOrigin::from_path(&path);
        let before = corpus.records.len();
        for (i, item) in items.into_iter().enumerate() {
            match parse_record(item) {
                Some(record) => corpus.records.push((record, origin.clone())),
                None => {
                    warn!(file = %path.display(), element = i, "skipping corpus element");
                    corpus.report.records_skipped += 1;
                }
            }
        }
        debug!(file = %path.display(), records = corpus.records.len() - before, "read corpus file");
    }

    corpus.report.records = corpus.records.len();
    info!(
        files = corpus.report.files_read,
        files_skipped = corpus.report.files_skipped,
        records = corpus.report.records,
        records_skipped = corpus.report.records_skipped,
        "corpus loaded"
    );
    Ok(corpus)
}

fn read_array(path: &Path) -> Result<Vec<Value>> {
    let corpus_error = |message: String| RagError::CorpusError { path: path.to_path_buf(), message };
    let raw = fs::read_to_string(path).map_err(|e| corpus_error(e.to_string()))?;
    match serde_json::from_str::<Value>(&raw).map_err(|e| corpus_error(e.to_string()))? {
        Value::Array(items) => Ok(items),
        _ => Err(corpus_error("expected a JSON array of records".to_string())),
    }
}

fn parse_record(item: Value) -> Option<Record> {
    if !item.is_object() {
        return None;
    }
    let record: Record = serde_json::from_value(item).ok()?;
    (!record.serialized_text().trim().is_empty()).then_some(record)
}
