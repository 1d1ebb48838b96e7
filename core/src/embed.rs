//! Text embedding.
//!
//! Semantic search only needs `text -> fixed-length vector`; [`Embedder`] is
//! that seam. [`HashingEmbedder`] is the in-process backend: it feature-hashes
//! normalized terms into a signed bag-of-words vector and L2-normalizes it, so
//! results are deterministic and need no model files.

use crate::config::EMBEDDING_DIMENSION;
use crate::tokenizer::{tokenize, StopWords};
use crate::{IndexError, Result};
use sha1::{Digest, Sha1};

pub type Embedding = Vec<f32>;

pub trait Embedder: Send + Sync {
    /// Embed one piece of text. Empty input is an error.
    fn embed(&self, text: &str) -> Result<Embedding>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;
}

pub struct HashingEmbedder {
    dimension: usize,
    stop_words: StopWords,
}

impl HashingEmbedder {
    pub fn new(stop_words: StopWords) -> Self {
        Self::with_dimension(stop_words, EMBEDDING_DIMENSION)
    }

    pub fn with_dimension(stop_words: StopWords, dimension: usize) -> Self {
        Self { dimension: dimension.max(1), stop_words }
    }

    fn bucket(&self, term: &str) -> (usize, f32) {
        let digest = Sha1::digest(term.as_bytes());
        let slot = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize % self.dimension;
        let sign = if digest[4] & 1 == 0 { 1.0 } else { -1.0 };
        (slot, sign)
    }
}

impl Embedder for HashingEmbedder {
    /// Text made only of stop words embeds to the zero vector.
    fn embed(&self, text: &str) -> Result<Embedding> {
        if text.trim().is_empty() {
            return Err(IndexError::embedding("cannot embed empty text"));
        }
        let mut vector = vec![0.0f32; self.dimension];
        for term in tokenize(text, &self.stop_words) {
            let (slot, sign) = self.bucket(&term);
            vector[slot] += sign;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in vector.iter_mut() {
                *x /= norm;
            }
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize { self.dimension }

    fn model_name(&self) -> &str { "feature-hashing-sha1" }
}

/// Cosine similarity in `[-1, 1]`; 0.0 when either vector is all zeros.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have same length");

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
