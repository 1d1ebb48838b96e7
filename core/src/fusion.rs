//! Score fusion of a lexical and a semantic ranked list.
//!
//! The default strategy min-max normalizes each list on its own and combines
//! them linearly with weight `alpha` on the lexical side. Reciprocal Rank
//! Fusion is available as a second strategy that ignores score magnitudes.

use crate::config::{DEFAULT_ALPHA, RRF_K, SEARCH_BREADTH_MULTIPLIER};
use crate::{DocId, ScoredDoc};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FusionStrategy {
    Weighted { alpha: f64 },
    ReciprocalRank { k: f64 },
}

impl Default for FusionStrategy {
    fn default() -> Self {
        FusionStrategy::Weighted { alpha: DEFAULT_ALPHA }
    }
}

impl FusionStrategy {
    pub fn rrf() -> Self {
        FusionStrategy::ReciprocalRank { k: RRF_K }
    }
}

/// Per-document fused scores. For weighted fusion the two side scores are
/// normalized values; for RRF they are each side's rank contribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FusionEntry {
    pub doc_id: DocId,
    pub lexical_score: f64,
    pub semantic_score: f64,
    pub hybrid_score: f64,
}

impl FusionEntry {
    fn new(doc_id: DocId) -> Self {
        Self { doc_id, lexical_score: 0.0, semantic_score: 0.0, hybrid_score: 0.0 }
    }
}

/// How deep each retrieval path is queried before fusing down to `limit`.
pub fn search_breadth(limit: usize, num_docs: usize) -> usize {
    limit.saturating_mul(SEARCH_BREADTH_MULTIPLIER).min(num_docs)
}

/// Min-max normalization to `[0, 1]`. When every score is equal (one element,
/// all zeros, ...) each normalized score is 1.0.
pub fn normalize(scores: &[f64]) -> Vec<f64> {
    let Some((min, max)) = min_max(scores) else {
        return Vec::new();
    };
    let range = max - min;
    if range == 0.0 {
        return vec![1.0; scores.len()];
    }
    scores.iter().map(|s| (s - min) / range).collect()
}

fn min_max(scores: &[f64]) -> Option<(f64, f64)> {
    if scores.is_empty() {
        return None;
    }
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &s in scores {
        min = min.min(s);
        max = max.max(s);
    }
    Some((min, max))
}

pub fn hybrid_score(lexical: f64, semantic: f64, alpha: f64) -> f64 {
    alpha * lexical + (1.0 - alpha) * semantic
}

/// 1-based rank contribution `1 / (k + rank)`.
pub fn rrf_score(rank: usize, k: f64) -> f64 {
    1.0 / (k + rank as f64)
}

fn normalized(results: &[ScoredDoc]) -> impl Iterator<Item = (DocId, f64)> + '_ {
    let raw: Vec<f64> = results.iter().map(|r| r.score).collect();
    results.iter().map(|r| r.doc_id).zip(normalize(&raw))
}

fn rank_entries(entries: HashMap<DocId, FusionEntry>, limit: usize) -> Vec<FusionEntry> {
    let mut ranked: Vec<FusionEntry> = entries.into_values().collect();
    ranked.sort_by(|a, b| b.hybrid_score.total_cmp(&a.hybrid_score).then_with(|| a.doc_id.cmp(&b.doc_id)));
    ranked.truncate(limit);
    ranked
}

/// Normalize both lists once, merge by document id (a side that did not
/// return the document contributes 0.0), score with [`hybrid_score`], then sort
/// descending with ties by ascending id.
pub fn weighted_fusion(lexical: &[ScoredDoc], semantic: &[ScoredDoc], alpha: f64, limit: usize) -> Vec<FusionEntry> {
    let mut entries: HashMap<DocId, FusionEntry> = HashMap::with_capacity(lexical.len() + semantic.len());
    for (doc_id, norm) in normalized(lexical) {
        entries.entry(doc_id).or_insert_with(|| FusionEntry::new(doc_id)).lexical_score = norm;
    }
    for (doc_id, norm) in normalized(semantic) {
        entries.entry(doc_id).or_insert_with(|| FusionEntry::new(doc_id)).semantic_score = norm;
    }
    for entry in entries.values_mut() {
        entry.hybrid_score = hybrid_score(entry.lexical_score, entry.semantic_score, alpha);
    }
    rank_entries(entries, limit)
}

/// Reciprocal Rank Fusion over the two lists as given (already ranked).
pub fn rrf_fusion(lexical: &[ScoredDoc], semantic: &[ScoredDoc], k: f64, limit: usize) -> Vec<FusionEntry> {
    let mut entries: HashMap<DocId, FusionEntry> = HashMap::with_capacity(lexical.len() + semantic.len());
    for (rank, hit) in lexical.iter().enumerate() {
        entries.entry(hit.doc_id).or_insert_with(|| FusionEntry::new(hit.doc_id)).lexical_score = rrf_score(rank + 1, k);
    }
    for (rank, hit) in semantic.iter().enumerate() {
        entries.entry(hit.doc_id).or_insert_with(|| FusionEntry::new(hit.doc_id)).semantic_score = rrf_score(rank + 1, k);
    }
    for entry in entries.values_mut() {
        entry.hybrid_score = entry.lexical_score + entry.semantic_score;
    }
    rank_entries(entries, limit)
}

pub fn fuse(strategy: FusionStrategy, lexical: &[ScoredDoc], semantic: &[ScoredDoc], limit: usize) -> Vec<FusionEntry> {
    match strategy {
        FusionStrategy::Weighted { alpha } => weighted_fusion(lexical, semantic, alpha, limit),
        FusionStrategy::ReciprocalRank { k } => rrf_fusion(lexical, semantic, k, limit),
    }
}
