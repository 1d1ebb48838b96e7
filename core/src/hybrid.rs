//! Hybrid retrieval: BM25 and chunked semantic search fused into one ranking.

use crate::embed::Embedder;
use crate::fusion::{fuse, search_breadth, FusionEntry, FusionStrategy};
use crate::persist::{missing_artifacts, IndexPaths, ARTIFACTS};
use crate::semantic::ChunkedSemanticSearch;
use crate::tokenizer::StopWords;
use crate::{DocId, Document, IndexError, InvertedIndex, Result};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HybridResult {
    pub document_id: DocId,
    pub title: String,
    pub description: String,
    pub lexical_score: f64,
    pub semantic_score: f64,
    pub hybrid_score: f64,
}

pub struct HybridSearch<E: Embedder> {
    index: InvertedIndex,
    semantic: ChunkedSemanticSearch<E>,
}

impl<E: Embedder> HybridSearch<E> {
    pub fn new(index: InvertedIndex, semantic: ChunkedSemanticSearch<E>) -> Self {
        Self { index, semantic }
    }

    /// Load the persisted index and chunk cache under `paths`, building and
    /// saving whichever is absent. An index store with only some artifacts
    /// present is an error, never a silent rebuild.
    pub fn open(documents: Vec<Document>, paths: &IndexPaths, stop_words: StopWords, embedder: E) -> Result<Self> {
        let mut semantic = ChunkedSemanticSearch::new(embedder);
        semantic.load_or_create(&documents, paths)?;

        let index = if missing_artifacts(paths).len() == ARTIFACTS.len() {
            let mut index = InvertedIndex::new(stop_words);
            index.build(documents)?;
            index.save(paths)?;
            index
        } else {
            InvertedIndex::load(paths, stop_words)?
        };
        Ok(Self { index, semantic })
    }

    pub fn index(&self) -> &InvertedIndex { &self.index }

    pub fn semantic(&self) -> &ChunkedSemanticSearch<E> { &self.semantic }

    /// Min-max normalized weighted fusion; `alpha` weights the lexical side.
    pub fn weighted_search(&self, query: &str, alpha: f64, limit: usize) -> Result<Vec<HybridResult>> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(IndexError::invalid_argument(format!("alpha must be within [0, 1], got {alpha}")));
        }
        self.search(query, FusionStrategy::Weighted { alpha }, limit)
    }

    /// Reciprocal Rank Fusion with constant `k`.
    pub fn rrf_search(&self, query: &str, k: f64, limit: usize) -> Result<Vec<HybridResult>> {
        if !k.is_finite() || k < 0.0 {
            return Err(IndexError::invalid_argument(format!("rrf k must be a non-negative number, got {k}")));
        }
        self.search(query, FusionStrategy::ReciprocalRank { k }, limit)
    }

    pub fn search(&self, query: &str, strategy: FusionStrategy, limit: usize) -> Result<Vec<HybridResult>> {
        let breadth = search_breadth(limit, self.index.len());
        tracing::debug!(query, limit, breadth, ?strategy, "hybrid search");

        let lexical = self.index.bm25_search(query, breadth)?;
        let semantic = self.semantic.search_chunks(query, breadth)?;
        let fused = fuse(strategy, &lexical, &semantic, limit);
        Ok(self.project(fused))
    }

    fn project(&self, entries: Vec<FusionEntry>) -> Vec<HybridResult> {
        entries
            .into_iter()
            .filter_map(|entry| {
                let doc = self.index.document(entry.doc_id)?;
                Some(HybridResult {
                    document_id: doc.id,
                    title: doc.title.clone(),
                    description: doc.description.clone(),
                    lexical_score: entry.lexical_score,
                    semantic_score: entry.semantic_score,
                    hybrid_score: entry.hybrid_score,
                })
            })
            .collect()
    }
}
