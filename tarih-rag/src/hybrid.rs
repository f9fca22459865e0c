//! Keyword overlap scoring and hybrid score fusion.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::document::{Chunk, RetrievalResult};

/// A chunk ranked by keyword overlap with the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordHit {
    /// Index position of the chunk.
    pub position: usize,
    /// The matched chunk.
    pub chunk: Chunk,
    /// Jaccard overlap in `(0, 1]`.
    pub score: f32,
}

/// Lower-cased whitespace tokens of `text`.
pub fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase().split_whitespace().map(str::to_string).collect()
}

/// `|a ∩ b| / |a ∪ b|`, or 0 when both sets are empty.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f32 / union as f32
}

/// Rank `(position, chunk)` pairs by Jaccard overlap with `query`.
///
/// Chunks sharing no token with the query are left out. Ordered by
/// descending score, ties by ascending position, at most `top_k` hits.
pub fn rank_by_keywords<'a>(
    query: &str,
    chunks: impl Iterator<Item = (usize, &'a Chunk)>,
    top_k: usize,
) -> Vec<KeywordHit> {
    let query_tokens = tokenize(query);
    if query_tokens.is_empty() || top_k == 0 {
        return Vec::new();
    }

    let mut hits: Vec<KeywordHit> = chunks
        .filter_map(|(position, chunk)| {
            let score = jaccard(&query_tokens, &tokenize(&chunk.content));
            (score > 0.0).then(|| KeywordHit { position, chunk: chunk.clone(), score })
        })
        .collect();

    hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.position.cmp(&b.position)));
    hits.truncate(top_k);
    hits
}

/// Merge a semantic and a keyword ranking into one list.
///
/// Each position gets `alpha * semantic + (1 - alpha) * keyword`, where a
/// component missing from its list counts as 0, so an entry absent from
/// `semantic` reports a similarity of 0. The result is ordered by descending hybrid score, ties
/// by ascending position, and truncated to `top_k`.
pub fn fuse(
    semantic: Vec<RetrievalResult>,
    keyword: Vec<KeywordHit>,
    alpha: f32,
    top_k: usize,
) -> Vec<RetrievalResult> {
    let mut merged: HashMap<usize, RetrievalResult> = HashMap::new();

    for result in semantic {
        merged.insert(result.position, result);
    }
    for hit in keyword {
        merged
            .entry(hit.position)
            .and_modify(|existing| existing.keyword_score = Some(hit.score))
            .or_insert_with(|| RetrievalResult {
                keyword_score: Some(hit.score),
                ..RetrievalResult::semantic(hit.position, hit.chunk.clone(), 0.0)
            });
    }

    let mut fused: Vec<RetrievalResult> = merged
        .into_values()
        .map(|mut result| {
            let keyword = result.keyword_score.unwrap_or(0.0);
            result.keyword_score = Some(keyword);
            result.hybrid_score = Some(alpha * result.similarity + (1.0 - alpha) * keyword);
            result
        })
        .collect();

    fused.sort_by(|a, b| {
        let (sa, sb) = (a.hybrid_score.unwrap_or(0.0), b.hybrid_score.unwrap_or(0.0));
        sb.total_cmp(&sa).then_with(|| a.position.cmp(&b.position))
    });
    fused.truncate(top_k);
    fused
}
