//! Embedding error types.
//!
//! All embedding errors are recoverable. Callers degrade to zero similarity
//! or zero vectors instead of aborting.

use thiserror::Error;

/// Errors from embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Inference failed.
    #[error("Inference failed: {0}")]
    Inference(String),

    /// Service not ready (model not loaded or disabled).
    #[error("Embedding service not ready")]
    NotReady,

    /// The provider returned a vector of the wrong width.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Configured dimensions.
        expected: usize,
        /// Dimensions actually produced.
        actual: usize,
    },

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// Generic internal error.
    #[error("{0}")]
    Internal(String),
}

/// Result alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;
