//! # scramble-embeddings
//!
//! The embedding provider seam: text in, fixed-dimension vectors out.
//!
//! - [`EmbeddingService`]: async, batch-first provider trait
//! - [`TermHashEmbeddingService`]: offline feature-hashing provider whose
//!   vectors reflect shared vocabulary
//! - [`MockEmbeddingService`]: content-hash vectors for tests, with a
//!   switchable not-ready state to exercise failure paths
//! - [`normalize`]: L2 normalization, dot product, cosine similarity
//!
//! Provider failures are never fatal to callers. Every consumer in the
//! workspace logs and substitutes a zero similarity.

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod normalize;
pub mod service;
pub mod term_hash;

pub use config::{EmbeddingConfig, build_service};
pub use errors::{EmbeddingError, Result};
pub use normalize::{cosine_similarity, dot, l2_norm, l2_normalize};
pub use service::{EmbeddingService, MockEmbeddingService};
pub use term_hash::TermHashEmbeddingService;
