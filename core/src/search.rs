//! Lexical query path over a built or loaded [`InvertedIndex`].

use crate::tokenizer::tokenize;
use crate::{DocId, Document, IndexError, InvertedIndex, Result};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize)]
pub struct LexicalHit<'a> {
    pub document: &'a Document,
    pub score: f64,
}

pub struct LexicalSearch<'a> {
    index: &'a InvertedIndex,
}

impl<'a> LexicalSearch<'a> {
    pub fn new(index: &'a InvertedIndex) -> Self {
        Self { index }
    }

    /// BM25-ranked documents with their raw scores.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<LexicalHit<'a>>> {
        let index = self.index;
        let scored = index.bm25_search(query, limit)?;
        Ok(scored
            .into_iter()
            .filter_map(|hit| index.document(hit.doc_id).map(|document| LexicalHit { document, score: hit.score }))
            .collect())
    }

    /// Unranked keyword lookup: the posting lists of each query token in query
    /// order, each list ascending by id, without repeats.
    pub fn keyword_search(&self, query: &str, limit: usize) -> Result<Vec<&'a Document>> {
        let index = self.index;
        if !index.is_ready() {
            return Err(IndexError::IndexNotReady);
        }
        let mut seen: HashSet<DocId> = HashSet::new();
        let mut results = Vec::new();
        for token in tokenize(query, index.stop_words()) {
            for doc in index.get_documents(&token) {
                if results.len() >= limit {
                    return Ok(results);
                }
                if seen.insert(doc.id) {
                    results.push(doc);
                }
            }
        }
        Ok(results)
    }
}
