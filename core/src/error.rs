//! Error type shared by every index, search and fusion operation.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Error, Debug)]
pub enum IndexError {
    /// A term that must normalize to a single token produced zero or several.
    #[error("term {term:?} must normalize to exactly one token, got {tokens:?}")]
    InvalidQueryTerm { term: String, tokens: Vec<String> },

    /// Search attempted before `build()` or `load()` completed.
    #[error("index not ready: build or load it first")]
    IndexNotReady,

    /// One or more persisted artifacts are absent; nothing was loaded.
    #[error("missing index artifact(s): {}", .missing.join(", "))]
    MissingIndexArtifact { missing: Vec<String> },

    /// BM25 length normalization against an empty or zero-length index.
    #[error("degenerate index: average document length is zero")]
    DegenerateIndex,

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("artifact {artifact} has format version {found}, expected {expected}")]
    IncompatibleVersion { artifact: String, found: u32, expected: u32 },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("document source error: {0}")]
    DocumentSource(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding error: {0}")]
    Encode(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IndexError {
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        IndexError::InvalidArgument(msg.into())
    }

    pub fn embedding<S: Into<String>>(msg: S) -> Self {
        IndexError::Embedding(msg.into())
    }
}
