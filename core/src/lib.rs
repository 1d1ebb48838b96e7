use serde::{Deserialize, Serialize};

pub mod chunk;
pub mod config;
pub mod embed;
pub mod error;
pub mod fusion;
pub mod hybrid;
pub mod index;
pub mod persist;
pub mod search;
pub mod semantic;
pub mod source;
pub mod tokenizer;

pub use error::{IndexError, Result};
pub use index::InvertedIndex;

pub type DocId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub title: String,
    pub description: String,
}

impl Document {
    pub fn new(id: DocId, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self { id, title: title.into(), description: description.into() }
    }

    /// Text fed to the tokenizer at build time: title and description joined by one space.
    pub fn indexed_text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}

/// Raw score produced by one retrieval path for one document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    pub score: f64,
}

impl ScoredDoc {
    pub fn new(doc_id: DocId, score: f64) -> Self { Self { doc_id, score } }
}

/// Sort by score descending, ties broken by ascending document id.
pub(crate) fn sort_scored(scored: &mut [ScoredDoc]) {
    scored.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.doc_id.cmp(&b.doc_id)));
}
