//! # scramble-store
//!
//! Durable storage for compressed context records.
//!
//! - **Records**: one `<id>.ctx` JSON file per [`ContextRecord`](scramble_core::ContextRecord)
//! - **Aggregate metadata**: `metadata.json` with counters and the chain index,
//!   always reconstructable from the record files
//! - **Chains**: conversation threads built from parent references, tolerant of
//!   dangling parents and cycles
//! - **Recovery**: missing or corrupt metadata triggers a full [`Repository::reindex`]

#![deny(unsafe_code)]

pub mod chains;
pub mod errors;
pub mod files;
pub mod metadata;
pub mod repository;

pub use errors::{Result, StoreError};
pub use metadata::{ConversationSummary, RepositoryMetadata};
pub use repository::Repository;
