//! Record chunking.
//!
//! This module provides the [`Chunker`] trait and the [`RecursiveChunker`]
//! implementation, which splits a record's normalized text on progressively
//! finer separators while keeping every chunk within a character budget.

use std::collections::VecDeque;
use std::ops::Range;

use crate::config::RagConfig;
use crate::document::{Chunk, ChunkMetadata, Record, RecordOrigin};
use crate::normalize::normalize;

/// Separators tried from coarsest to finest. The empty separator splits
/// into single characters and always applies.
pub const DEFAULT_SEPARATORS: [&str; 8] = ["\n\n", "\n", ". ", "! ", "? ", ", ", " ", ""];

/// A strategy for splitting records into chunks.
pub trait Chunker: Send + Sync {
    /// Split a record into chunks.
    ///
    /// Returns an empty `Vec` when the record's normalized text is empty.
    /// Every chunk carries the full record metadata and its `chunk_index`.
    fn chunk(&self, record: &Record, origin: &RecordOrigin) -> Vec<Chunk>;
}

/// Splits text hierarchically: paragraphs, lines, sentences, clauses, words,
/// then characters.
///
/// Lengths are counted in characters, never bytes. Separators stay attached
/// to the piece before them, so each chunk is an exact slice of the
/// normalized text and consecutive chunks share at most `chunk_overlap`
/// characters.
///
/// # Example
///
/// ```rust,ignore
/// use tarih_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(512, 50);
/// let chunks = chunker.chunk(&record, &origin);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` - maximum number of characters per chunk (at least 1)
    /// * `chunk_overlap` - maximum number of characters shared with the previous chunk
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size: chunk_size.max(1), chunk_overlap }
    }

    /// Create a chunker from the chunking fields of a validated config.
    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Split `text` and return the byte ranges of the resulting chunks.
    ///
    /// Ranges are in order, start at 0, end at `text.len()` and never leave a
    /// gap between neighbours.
    pub fn split_spans(&self, text: &str) -> Vec<Range<usize>> {
        let mut out = Vec::new();
        if !text.is_empty() {
            self.split_span(text, 0..text.len(), &DEFAULT_SEPARATORS, &mut out);
        }
        out
    }

    /// Split `text` into chunk strings.
    pub fn split_text<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.split_spans(text).into_iter().map(|r| &text[r]).collect()
    }

    fn split_span(
        &self,
        text: &str,
        span: Range<usize>,
        separators: &[&str],
        out: &mut Vec<Range<usize>>,
    ) {
        let piece = &text[span.clone()];
        if char_len(piece) <= self.chunk_size {
            out.push(span);
            return;
        }

        let (separator, remaining) = match separators
            .iter()
            .position(|sep| sep.is_empty() || piece.contains(sep))
        {
            Some(i) => (separators[i], &separators[i + 1..]),
            None => ("", &[][..]),
        };

        let mut fitting = Vec::new();
        for part in split_keeping_separator(piece, separator, span.start) {
            let len = char_len(&text[part.clone()]);
            if len <= self.chunk_size {
                fitting.push((part, len));
            } else {
                if !fitting.is_empty() {
                    self.merge(std::mem::take(&mut fitting), out);
                }
                self.split_span(text, part, remaining, out);
            }
        }
        if !fitting.is_empty() {
            self.merge(fitting, out);
        }
    }

    /// Greedily pack adjacent pieces into chunks, keeping a tail of the
    /// previous chunk (at most `chunk_overlap` chars) as the head of the next.
    fn merge(&self, pieces: Vec<(Range<usize>, usize)>, out: &mut Vec<Range<usize>>) {
        let mut window: VecDeque<(Range<usize>, usize)> = VecDeque::new();
        let mut total = 0;

        for (part, len) in pieces {
            if total + len > self.chunk_size && !window.is_empty() {
                out.push(window_span(&window));
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some((_, popped)) => total -= popped,
                        None => break,
                    }
                }
            }
            total += len;
            window.push_back((part, len));
        }

        if !window.is_empty() {
            out.push(window_span(&window));
        }
    }
}

impl Default for RecursiveChunker {
    fn default() -> Self {
        Self::from_config(&RagConfig::default())
    }
}

fn window_span(window: &VecDeque<(Range<usize>, usize)>) -> Range<usize> {
    let start = window.front().map_or(0, |(r, _)| r.start);
    let end = window.back().map_or(start, |(r, _)| r.end);
    start..end
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split `piece` after every occurrence of `separator`, returning ranges
/// offset by `base`. An empty separator splits into single characters.
fn split_keeping_separator(piece: &str, separator: &str, base: usize) -> Vec<Range<usize>> {
    if separator.is_empty() {
        return piece
            .char_indices()
            .map(|(i, c)| base + i..base + i + c.len_utf8())
            .collect();
    }

    let mut result = Vec::new();
    let mut start = 0;
    while let Some(pos) = piece[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(base + start..base + end);
        start = end;
    }
    if start < piece.len() {
        result.push(base + start..base + piece.len());
    }
    result
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, record: &Record, origin: &RecordOrigin) -> Vec<Chunk> {
        let text = normalize(&record.serialized_text());
        self.split_text(&text)
            .into_iter()
            .enumerate()
            .map(|(i, content)| Chunk {
                content: content.to_string(),
                metadata: ChunkMetadata::from_record(record, origin, i),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn assert_well_formed(chunker: &RecursiveChunker, text: &str) {
        let spans = chunker.split_spans(text);
        if text.is_empty() {
            assert!(spans.is_empty());
            return;
        }
        assert_eq!(spans.first().map(|r| r.start), Some(0));
        assert_eq!(spans.last().map(|r| r.end), Some(text.len()));
        for span in &spans {
            assert!(char_len(&text[span.clone()]) <= chunker.chunk_size);
        }
        for pair in spans.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            assert!(next.start > prev.start, "no progress: {prev:?} then {next:?}");
            assert!(next.start <= prev.end, "gap between {prev:?} and {next:?}");
            assert!(char_len(&text[next.start..prev.end]) <= chunker.chunk_overlap);
        }
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunker = RecursiveChunker::new(100, 10);
        assert_eq!(chunker.split_text("Malazgirt Savaşı 1071."), vec!["Malazgirt Savaşı 1071."]);
    }

    #[test]
    fn empty_record_produces_no_chunks() {
        let chunker = RecursiveChunker::default();
        let record = Record { topic: "  ".into(), ..Record::default() };
        assert!(chunker.chunk(&record, &RecordOrigin::default()).is_empty());
    }

    #[test]
    fn splits_on_sentence_boundaries_first() {
        let chunker = RecursiveChunker::new(40, 0);
        let text = "Osmanlı Devleti 1299 yılında kuruldu. Bursa 1326 yılında alındı. Edirne sonra alındı.";
        let chunks = chunker.split_text(text);
        assert_eq!(
            chunks,
            vec![
                "Osmanlı Devleti 1299 yılında kuruldu. ",
                "Bursa 1326 yılında alındı. ",
                "Edirne sonra alındı."
            ]
        );
        assert_well_formed(&chunker, text);
    }

    #[test]
    fn carries_overlap_from_previous_chunk() {
        let chunker = RecursiveChunker::new(20, 8);
        let text = "bir iki üç dört beş altı yedi sekiz dokuz on";
        let chunks = chunker.split_text(text);
        assert!(chunks.len() > 1);
        assert_eq!(chunks[0], "bir iki üç dört beş ");
        assert!(chunks[1].starts_with("beş "));
        assert_well_formed(&chunker, text);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let chunker = RecursiveChunker::new(5, 0);
        let text = "ğğğğğşşşşş";
        assert_eq!(chunker.split_text(text), vec!["ğğğğğ", "şşşşş"]);
    }

    #[test]
    fn chunks_carry_record_metadata_and_index() {
        let chunker = RecursiveChunker::new(30, 5);
        let record = Record {
            id: "cum_001".into(),
            era: "Cumhuriyet Dönemi".into(),
            topic: "Cumhuriyetin İlanı".into(),
            body: "Cumhuriyet 29 Ekim 1923 tarihinde ilan edildi. Ankara başkent oldu.".into(),
            year: 1923,
            ..Record::default()
        };
        let origin = RecordOrigin { source: "data/raw/c.json".into(), filename: "c.json".into() };
        let chunks = chunker.chunk(&record, &origin);
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.metadata.chunk_index, i);
            assert_eq!(chunk.metadata.id, "cum_001");
            assert_eq!(chunk.metadata.year, 1923);
            assert_eq!(chunk.metadata.filename, "c.json");
        }
        assert!(chunks[0].content.starts_with("Konu: Cumhuriyetin"));
    }

    proptest! {
        #[test]
        fn chunks_cover_text_within_bounds(
            text in "[a-zçğıöşüİ .,!?\n]{0,400}",
            size in 1usize..80,
            overlap_ratio in 0.0f64..1.0,
        ) {
            let overlap = ((size as f64) * overlap_ratio) as usize;
            let overlap = overlap.min(size - 1);
            let chunker = RecursiveChunker::new(size, overlap);
            assert_well_formed(&chunker, &text);
        }

        #[test]
        fn normalized_records_cover_their_text(body in "\\PC{0,300}") {
            let chunker = RecursiveChunker::new(64, 16);
            let record = Record { body, ..Record::default() };
            let normalized = normalize(&record.serialized_text());
            let chunks = chunker.chunk(&record, &RecordOrigin::default());
            prop_assert_eq!(chunks.is_empty(), normalized.is_empty());
            for chunk in &chunks {
                prop_assert!(normalized.contains(&chunk.content));
                prop_assert!(char_len(&chunk.content) <= 64);
            }
        }
    }
}
