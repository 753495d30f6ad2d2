//! # scramble-core
//!
//! Foundation types shared by every Scramble crate.
//!
//! - **Branded IDs**: [`ContextId`] as a newtype so context ids never mix with
//!   arbitrary strings
//! - **Data model**: [`ChunkRecord`], [`ContextRecord`], [`ContextMetadata`]
//!   with a versioned, portable JSON schema
//! - **Compression levels**: the canonical LOW/MEDIUM/HIGH parameter table
//! - **Logging**: `tracing` subscriber setup and log capture for tests

#![deny(unsafe_code)]

pub mod blob;
pub mod ids;
pub mod level;
pub mod logging;
pub mod record;

pub use ids::ContextId;
pub use level::{CompressionLevel, LevelParams, ParseLevelError, SplitAggressiveness};
pub use record::{
    CONTEXT_SCHEMA_VERSION, ChunkRecord, ContextMetadata, ContextRecord, ErrorTag, Speaker,
};
