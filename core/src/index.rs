//! Inverted index with TF-IDF and BM25 scoring.
//!
//! Four structures are kept in step: the posting sets (term -> doc ids), the
//! per-document term-frequency table, the document length table and the
//! document map. They are rebuilt together by [`InvertedIndex::build`] and
//! persisted together by [`crate::persist`].

use crate::config::{BM25_B, BM25_K1};
use crate::persist::{self, IndexPaths};
use crate::tokenizer::{tokenize, StopWords};
use crate::{sort_scored, DocId, Document, IndexError, Result, ScoredDoc};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

#[derive(Debug, Default)]
pub struct InvertedIndex {
    pub(crate) postings: BTreeMap<String, BTreeSet<DocId>>,
    pub(crate) term_frequencies: HashMap<DocId, HashMap<String, u32>>,
    pub(crate) doc_lengths: HashMap<DocId, u32>,
    pub(crate) docmap: BTreeMap<DocId, Document>,
    stop_words: StopWords,
    ready: bool,
}

impl InvertedIndex {
    pub fn new(stop_words: StopWords) -> Self {
        Self { stop_words, ..Self::default() }
    }

    /// Assemble an index from already-restored structures. Used by `load`.
    pub(crate) fn from_parts(
        postings: BTreeMap<String, BTreeSet<DocId>>,
        term_frequencies: HashMap<DocId, HashMap<String, u32>>,
        doc_lengths: HashMap<DocId, u32>,
        docmap: BTreeMap<DocId, Document>,
        stop_words: StopWords,
    ) -> Self {
        Self { postings, term_frequencies, doc_lengths, docmap, stop_words, ready: true }
    }

    /// Replace the index contents with `documents`. Document ids must be unique;
    /// on a duplicate id the index is left untouched.
    pub fn build<I>(&mut self, documents: I) -> Result<()>
    where
        I: IntoIterator<Item = Document>,
    {
        let documents: Vec<Document> = documents.into_iter().collect();
        let mut seen: HashSet<DocId> = HashSet::with_capacity(documents.len());
        for doc in &documents {
            if !seen.insert(doc.id) {
                return Err(IndexError::invalid_argument(format!("duplicate document id {}", doc.id)));
            }
        }

        self.postings.clear();
        self.term_frequencies.clear();
        self.doc_lengths.clear();
        self.docmap.clear();

        for doc in documents {
            self.add_document(doc);
        }
        self.ready = true;

        tracing::info!(num_docs = self.docmap.len(), num_terms = self.postings.len(), "index built");
        Ok(())
    }

    fn add_document(&mut self, doc: Document) {
        let tokens = tokenize(&doc.indexed_text(), &self.stop_words);
        self.doc_lengths.insert(doc.id, tokens.len() as u32);

        let counts = self.term_frequencies.entry(doc.id).or_default();
        for token in tokens {
            self.postings.entry(token.clone()).or_default().insert(doc.id);
            *counts.entry(token).or_insert(0) += 1;
        }
        self.docmap.insert(doc.id, doc);
    }

    pub fn save(&self, paths: &IndexPaths) -> Result<()> {
        persist::save_index(paths, self)
    }

    pub fn load(paths: &IndexPaths, stop_words: StopWords) -> Result<Self> {
        persist::load_index(paths, stop_words)
    }

    pub fn is_ready(&self) -> bool { self.ready }

    pub fn len(&self) -> usize { self.docmap.len() }

    pub fn is_empty(&self) -> bool { self.docmap.is_empty() }

    pub fn stop_words(&self) -> &StopWords { &self.stop_words }

    pub fn document(&self, doc_id: DocId) -> Option<&Document> { self.docmap.get(&doc_id) }

    /// All indexed documents in ascending id order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> { self.docmap.values() }

    pub fn num_terms(&self) -> usize { self.postings.len() }

    pub fn doc_length(&self, doc_id: DocId) -> u32 {
        self.doc_lengths.get(&doc_id).copied().unwrap_or(0)
    }

    /// Mean token count over all documents, computed on every call. 0.0 when empty.
    pub fn avg_doc_length(&self) -> f64 {
        if self.doc_lengths.is_empty() {
            return 0.0;
        }
        let total: u64 = self.doc_lengths.values().map(|&l| l as u64).sum();
        total as f64 / self.doc_lengths.len() as f64
    }

    /// Documents whose posting set contains `term`, ascending by id.
    pub fn get_documents(&self, term: &str) -> Vec<&Document> {
        // BTreeSet iteration is already ascending by id.
        self.postings
            .get(term)
            .map(|ids| ids.iter().filter_map(|id| self.docmap.get(id)).collect())
            .unwrap_or_default()
    }

    /// Normalize `term` and require exactly one resulting token.
    fn single_token(&self, term: &str) -> Result<String> {
        let mut tokens = tokenize(term, &self.stop_words);
        if tokens.len() != 1 {
            return Err(IndexError::InvalidQueryTerm { term: term.to_string(), tokens });
        }
        Ok(tokens.remove(0))
    }

    fn term_frequency(&self, doc_id: DocId, token: &str) -> u32 {
        self.term_frequencies
            .get(&doc_id)
            .and_then(|counts| counts.get(token))
            .copied()
            .unwrap_or(0)
    }

    fn document_frequency(&self, token: &str) -> usize {
        self.postings.get(token).map_or(0, BTreeSet::len)
    }

    pub fn get_term_frequency(&self, doc_id: DocId, term: &str) -> Result<u32> {
        let token = self.single_token(term)?;
        Ok(self.term_frequency(doc_id, &token))
    }

    /// `ln((N + 1) / (df + 1))`. Terms that do not normalize to a single token
    /// count as unseen.
    pub fn get_idf(&self, term: &str) -> f64 {
        let df = self.single_token(term).map_or(0, |t| self.document_frequency(&t));
        let n = self.docmap.len() as f64;
        ((n + 1.0) / (df as f64 + 1.0)).ln()
    }

    pub fn get_tf_idf(&self, doc_id: DocId, term: &str) -> Result<f64> {
        let tf = self.get_term_frequency(doc_id, term)?;
        Ok(tf as f64 * self.get_idf(term))
    }

    pub fn get_bm25_idf(&self, term: &str) -> Result<f64> {
        let token = self.single_token(term)?;
        Ok(self.bm25_idf_token(&token))
    }

    fn bm25_idf_token(&self, token: &str) -> f64 {
        let n = self.docmap.len() as f64;
        let df = self.document_frequency(token) as f64;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    pub fn get_bm25_tf(&self, doc_id: DocId, term: &str, k1: f64, b: f64) -> Result<f64> {
        let token = self.single_token(term)?;
        let avg = self.avg_doc_length();
        if avg == 0.0 {
            return Err(IndexError::DegenerateIndex);
        }
        Ok(self.bm25_tf_token(doc_id, &token, k1, b, avg))
    }

    fn bm25_tf_token(&self, doc_id: DocId, token: &str, k1: f64, b: f64, avg_doc_length: f64) -> f64 {
        let tf = self.term_frequency(doc_id, token) as f64;
        if tf == 0.0 {
            return 0.0;
        }
        let length_norm = 1.0 - b + b * (self.doc_length(doc_id) as f64 / avg_doc_length);
        (tf * (k1 + 1.0)) / (tf + k1 * length_norm)
    }

    /// BM25 contribution of one term to one document with `k1 = 1.5, b = 0.75`.
    pub fn bm25(&self, doc_id: DocId, term: &str) -> Result<f64> {
        let tf_component = self.get_bm25_tf(doc_id, term, BM25_K1, BM25_B)?;
        Ok(self.get_bm25_idf(term)? * tf_component)
    }

    /// Score every document against `query` by summing per-token BM25, sort
    /// descending (ties by ascending id) and keep the first `limit`.
    pub fn bm25_search(&self, query: &str, limit: usize) -> Result<Vec<ScoredDoc>> {
        if !self.ready {
            return Err(IndexError::IndexNotReady);
        }
        let tokens = tokenize(query, &self.stop_words);
        if self.docmap.is_empty() {
            return Ok(Vec::new());
        }
        let avg = self.avg_doc_length();
        if avg == 0.0 {
            return Err(IndexError::DegenerateIndex);
        }

        let idfs: Vec<(&str, f64)> = tokens.iter().map(|t| (t.as_str(), self.bm25_idf_token(t))).collect();
        let mut scored: Vec<ScoredDoc> = self
            .docmap
            .keys()
            .map(|&doc_id| {
                let score: f64 = idfs
                    .iter()
                    .map(|&(token, idf)| idf * self.bm25_tf_token(doc_id, token, BM25_K1, BM25_B, avg))
                    .sum();
                ScoredDoc::new(doc_id, score)
            })
            .collect();

        sort_scored(&mut scored);
        scored.truncate(limit);
        tracing::debug!(query, tokens = tokens.len(), hits = scored.len(), "bm25 search");
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::default_stop_words;

    fn sample() -> InvertedIndex {
        let mut idx = InvertedIndex::new(default_stop_words());
        idx.build(vec![
            Document::new(1, "Space Adventure", "A crew travels to space."),
            Document::new(2, "Love Story", "Two people fall in love."),
            Document::new(3, "Space Love", "A space crew falls in love."),
        ])
        .unwrap();
        idx
    }

    #[test]
    fn posting_sets_sorted_by_id() {
        let idx = sample();
        let ids: Vec<DocId> = idx.get_documents("space").iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(idx.get_documents("unicorn").is_empty());
    }

    #[test]
    fn term_frequency_counts_title_and_description() {
        let idx = sample();
        assert_eq!(idx.get_term_frequency(1, "space").unwrap(), 2);
        assert_eq!(idx.get_term_frequency(3, "Space!").unwrap(), 2);
        assert_eq!(idx.get_term_frequency(2, "space").unwrap(), 0);
        assert_eq!(idx.get_term_frequency(99, "space").unwrap(), 0);
    }

    #[test]
    fn tf_sums_to_doc_length() {
        let idx = sample();
        for doc in idx.documents() {
            let sum: u32 = idx.term_frequencies[&doc.id].values().sum();
            assert_eq!(sum, idx.doc_length(doc.id));
        }
    }

    #[test]
    fn multi_token_term_rejected() {
        let idx = sample();
        assert!(matches!(idx.get_term_frequency(1, "space crew"), Err(IndexError::InvalidQueryTerm { .. })));
        assert!(matches!(idx.get_term_frequency(1, "the"), Err(IndexError::InvalidQueryTerm { .. })));
        assert!(matches!(idx.get_bm25_idf("space crew"), Err(IndexError::InvalidQueryTerm { .. })));
    }

    #[test]
    fn idf_formula() {
        let idx = sample();
        assert!((idx.get_idf("space") - (4.0f64 / 3.0).ln()).abs() < 1e-12);
        assert!((idx.get_idf("unicorn") - 4.0f64.ln()).abs() < 1e-12);
        // multi-token terms count as unseen rather than failing
        assert!((idx.get_idf("space crew") - 4.0f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn tf_idf_is_product() {
        let idx = sample();
        let expected = 2.0 * idx.get_idf("space");
        assert!((idx.get_tf_idf(1, "space").unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn bm25_idf_non_increasing_in_df() {
        let idx = sample();
        let rare = idx.get_bm25_idf("adventure").unwrap(); // df = 1
        let common = idx.get_bm25_idf("love").unwrap(); // df = 2
        let unseen = idx.get_bm25_idf("unicorn").unwrap(); // df = 0
        assert!(unseen >= rare);
        assert!(rare >= common);
        assert!((common - (1.5f64 / 2.5 + 1.0).ln()).abs() < 1e-12);
    }

    #[test]
    fn bm25_tf_matches_formula() {
        let idx = sample();
        let avg = idx.avg_doc_length();
        let len = idx.doc_length(1) as f64;
        let norm = 1.0 - 0.75 + 0.75 * (len / avg);
        let expected = (2.0 * 2.5) / (2.0 + 1.5 * norm);
        assert!((idx.get_bm25_tf(1, "space", 1.5, 0.75).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn bm25_tf_on_empty_index_is_degenerate() {
        let mut idx = InvertedIndex::new(default_stop_words());
        idx.build(Vec::new()).unwrap();
        assert_eq!(idx.avg_doc_length(), 0.0);
        assert!(matches!(idx.get_bm25_tf(1, "space", 1.5, 0.75), Err(IndexError::DegenerateIndex)));
    }

    #[test]
    fn search_before_build_not_ready() {
        let idx = InvertedIndex::new(default_stop_words());
        assert!(matches!(idx.bm25_search("space", 5), Err(IndexError::IndexNotReady)));
    }

    #[test]
    fn bm25_search_ranks_and_truncates() {
        let idx = sample();
        let hits = idx.bm25_search("space", 10).unwrap();
        assert_eq!(hits.len(), 3);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
        let top: Vec<DocId> = hits.iter().take(2).map(|h| h.doc_id).collect();
        assert!(top.contains(&1) && top.contains(&3));
        assert_eq!(idx.bm25_search("space", 1).unwrap().len(), 1);
    }

    #[test]
    fn bm25_search_is_stable() {
        let idx = sample();
        let first = idx.bm25_search("crew love", 3).unwrap();
        for _ in 0..5 {
            assert_eq!(idx.bm25_search("crew love", 3).unwrap(), first);
        }
    }

    #[test]
    fn stop_word_query_scores_every_document_zero() {
        let idx = sample();
        let hits = idx.bm25_search("the", 2).unwrap();
        assert_eq!(hits, vec![ScoredDoc::new(1, 0.0), ScoredDoc::new(2, 0.0)]);
        assert_eq!(idx.bm25_search("", 10).unwrap().len(), 3);
    }

    #[test]
    fn bm25_score_is_idf_times_tf() {
        let idx = sample();
        let expected = idx.get_bm25_idf("crew").unwrap() * idx.get_bm25_tf(3, "crew", BM25_K1, BM25_B).unwrap();
        assert!((idx.bm25(3, "crew").unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn rebuild_replaces_contents() {
        let mut idx = sample();
        idx.build(vec![Document::new(7, "Ocean", "Deep water.")]).unwrap();
        assert_eq!(idx.len(), 1);
        assert!(idx.get_documents("space").is_empty());
        assert_eq!(idx.get_documents("ocean")[0].id, 7);
    }

    #[test]
    fn duplicate_ids_rejected() {
        let mut idx = sample();
        let err = idx.build(vec![Document::new(1, "a", "b"), Document::new(1, "c", "d")]);
        assert!(matches!(err, Err(IndexError::InvalidArgument(_))));
        assert_eq!(idx.len(), 3);
    }
}
