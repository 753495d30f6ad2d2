//! # scramble-compression
//!
//! The write and ranking halves of the context memory.
//!
//! - [`Chunker`]: speaker-aware, size-bounded segmentation of raw dialogue
//! - [`compact`]: merges adjacent same-speaker chunks that are small enough
//!   and similar enough
//! - [`Compressor`]: `compress(text, metadata) -> ContextRecord`, never fails
//! - [`ranking`]: semantic, recency, and chain scoring shared by
//!   [`find_similar`] and context selection
//! - [`StatsCollector`]: explicit, shareable compression statistics

#![deny(unsafe_code)]

pub mod chunker;
pub mod compactor;
pub mod compressor;
pub mod ranking;
pub mod stats;

pub use chunker::Chunker;
pub use compactor::compact;
pub use compressor::Compressor;
pub use ranking::{ScoreBreakdown, ScoredContext, ScoringConfig, find_similar, rank};
pub use stats::{
    CompressionEvent, CompressionSummary, ExchangeStats, StatsCollector, TokenUsageSummary,
};
