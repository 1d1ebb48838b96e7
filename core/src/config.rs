//! Tuning constants. Runtime paths come from CLI arguments and environment
//! variables in the `blend` binary.

/// BM25 term frequency saturation.
pub const BM25_K1: f64 = 1.5;

/// BM25 document length normalization strength. 0.0 disables it, 1.0 is full.
pub const BM25_B: f64 = 0.75;

/// Result count used when the caller does not give one.
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

/// Each retrieval path is queried this many times deeper than the final limit
/// so fusion re-ranks across the union of candidates.
pub const SEARCH_BREADTH_MULTIPLIER: usize = 500;

/// Default lexical weight for weighted fusion.
pub const DEFAULT_ALPHA: f64 = 0.5;

/// Reciprocal Rank Fusion constant `k` in `1 / (k + rank)`.
pub const RRF_K: f64 = 60.0;

/// Output dimension of the built-in hashing embedder.
pub const EMBEDDING_DIMENSION: usize = 384;

/// Sentences per semantic chunk.
pub const CHUNK_MAX_SENTENCES: usize = 4;

/// Sentences shared between consecutive semantic chunks.
pub const CHUNK_OVERLAP_SENTENCES: usize = 1;

/// Words per fixed-size chunk.
pub const FIXED_CHUNK_WORDS: usize = 200;

/// Version stamped into every persisted index artifact.
pub const FORMAT_VERSION: u32 = 1;
