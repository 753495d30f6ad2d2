//! Context manager error types.

use thiserror::Error;

/// Errors from building or driving a [`ContextManager`](crate::ContextManager).
///
/// Selection itself never fails; these come from wiring and from storing new
/// records.
#[derive(Debug, Error)]
pub enum ContextError {
    /// Repository failure.
    #[error(transparent)]
    Store(#[from] scramble_store::StoreError),

    /// Embedding provider could not be built.
    #[error(transparent)]
    Embedding(#[from] scramble_embeddings::EmbeddingError),
}

/// Result type for context manager operations.
pub type Result<T> = std::result::Result<T, ContextError>;
