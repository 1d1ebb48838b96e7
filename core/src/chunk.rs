//! Splitting document text into overlapping windows for embedding.

use crate::{IndexError, Result};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SENTENCE_END: Regex = Regex::new(r"[.!?]\s+").expect("valid regex");
}

/// Sentences of `text`, split at whitespace that follows `.`, `!` or `?`.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for m in SENTENCE_END.find_iter(text) {
        // keep the terminator, drop the whitespace
        sentences.push(text[start..m.start() + 1].trim());
        start = m.end();
    }
    sentences.push(text[start..].trim());
    sentences.retain(|s| !s.is_empty());
    sentences
}

fn windows<T: AsRef<str>>(units: &[T], size: usize, overlap: usize) -> Result<Vec<String>> {
    if size == 0 {
        return Err(IndexError::invalid_argument("chunk size must be positive"));
    }
    if overlap >= size {
        return Err(IndexError::invalid_argument(format!("overlap {overlap} must be smaller than chunk size {size}")));
    }
    let mut chunks = Vec::new();
    if units.is_empty() {
        return Ok(chunks);
    }
    let step = size - overlap;
    let mut start = 0;
    loop {
        let end = (start + size).min(units.len());
        let parts: Vec<&str> = units[start..end].iter().map(|u| u.as_ref()).collect();
        chunks.push(parts.join(" "));
        start += step;
        if start + overlap >= units.len() {
            break;
        }
    }
    Ok(chunks)
}

/// Windows of `max_sentences` sentences, consecutive windows sharing `overlap`.
pub fn semantic_chunk(text: &str, max_sentences: usize, overlap: usize) -> Result<Vec<String>> {
    windows(&split_sentences(text), max_sentences, overlap)
}

/// Windows of `chunk_size` whitespace-separated words sharing `overlap` words.
pub fn fixed_chunk(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    let words: Vec<&str> = text.split_whitespace().collect();
    windows(&words, chunk_size, overlap)
}
