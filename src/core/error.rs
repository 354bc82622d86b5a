//! Error types for retrieval operations

use std::path::PathBuf;

/// Result type used across the retrieval engine.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Error taxonomy for the retrieval engine.
///
/// `IndexUnavailable` and `EmbeddingFailure` are runtime conditions: the
/// gateway converts them into degraded-but-valid outcomes. `DimensionMismatch`
/// is a contract violation between the embedder and the stored collection and
/// is the only variant allowed to reach callers of `index`/`search`.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// Vector backend unreachable, misconfigured, or failing
    #[error("Vector index unavailable: {reason}")]
    IndexUnavailable { reason: String },

    /// Embedding function failed or returned malformed output
    #[error("Embedding failed: {reason}")]
    EmbeddingFailure { reason: String },

    /// Vector length does not match the collection dimensionality
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Invalid settings
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// Catalog file could not be read or parsed
    #[error("Failed to load catalog {path}: {reason}")]
    Catalog { path: PathBuf, reason: String },
}

impl RetrievalError {
    pub fn unavailable(reason: impl std::fmt::Display) -> Self {
        Self::IndexUnavailable {
            reason: reason.to_string(),
        }
    }

    pub fn embedding(reason: impl std::fmt::Display) -> Self {
        Self::EmbeddingFailure {
            reason: reason.to_string(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// True for caller bugs that must not be papered over with an empty result.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::DimensionMismatch { .. })
    }
}

impl From<rusqlite::Error> for RetrievalError {
    fn from(err: rusqlite::Error) -> Self {
        Self::unavailable(format!("sqlite: {}", err))
    }
}

impl From<reqwest::Error> for RetrievalError {
    fn from(err: reqwest::Error) -> Self {
        Self::unavailable(format!("qdrant: {}", err))
    }
}
