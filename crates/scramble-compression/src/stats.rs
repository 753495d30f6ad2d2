//! Compression statistics.
//!
//! [`StatsCollector`] is an explicit, clonable handle: the application creates
//! one and hands clones to each [`Compressor`](crate::Compressor) that should
//! report into it.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use scramble_core::{ContextId, ContextRecord, Speaker};
use serde::Serialize;

/// One recorded compression.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompressionEvent {
    /// Record the compression produced.
    pub context_id: ContextId,
    /// When it was recorded.
    pub timestamp: DateTime<Utc>,
    /// Whitespace tokens in the raw input.
    pub original_tokens: usize,
    /// Whitespace tokens in the compressed text.
    pub compressed_tokens: usize,
    /// Original over compressed tokens.
    pub compression_ratio: f64,
    /// Semantic similarity of compressed to original.
    pub similarity: f64,
}

/// Aggregate compression quality over a window.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompressionSummary {
    /// Events in the window.
    pub count: usize,
    /// Mean compression ratio.
    pub average_ratio: f64,
    /// Smallest compression ratio.
    pub min_ratio: f64,
    /// Largest compression ratio.
    pub max_ratio: f64,
    /// Original minus compressed tokens, summed (never negative per event).
    pub tokens_saved: usize,
    /// Mean semantic similarity.
    pub average_similarity: f64,
    /// Lowest semantic similarity.
    pub min_similarity: f64,
}

/// Aggregate token usage over a window.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TokenUsageSummary {
    /// Raw input tokens.
    pub total_original_tokens: usize,
    /// Compressed tokens.
    pub total_compressed_tokens: usize,
    /// Mean raw tokens per compressed exchange.
    pub average_tokens_per_turn: f64,
}

/// Shared, thread-safe compression statistics.
#[derive(Clone, Debug, Default)]
pub struct StatsCollector {
    events: Arc<Mutex<Vec<CompressionEvent>>>,
}

/// Original over compressed tokens, with the denominator floored at one.
#[allow(clippy::cast_precision_loss)]
fn token_ratio(original: usize, compressed: usize) -> f64 {
    original as f64 / compressed.max(1) as f64
}

impl StatsCollector {
    /// Empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one compression.
    pub fn record_compression(
        &self,
        original_tokens: usize,
        compressed_tokens: usize,
        similarity: f64,
        context_id: &ContextId,
    ) {
        self.events.lock().push(CompressionEvent {
            context_id: context_id.clone(),
            timestamp: Utc::now(),
            original_tokens,
            compressed_tokens,
            compression_ratio: token_ratio(original_tokens, compressed_tokens),
            similarity,
        });
    }

    /// Snapshot of all recorded events.
    pub fn events(&self) -> Vec<CompressionEvent> {
        self.events.lock().clone()
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Drop all recorded events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    fn in_window(&self, window: Option<Duration>) -> Vec<CompressionEvent> {
        let cutoff = window.map(|w| Utc::now() - w);
        self.events
            .lock()
            .iter()
            .filter(|e| cutoff.is_none_or(|c| e.timestamp >= c))
            .cloned()
            .collect()
    }

    /// Compression quality over the last `window` (all time if `None`).
    ///
    /// Returns `None` when no events fall in the window.
    #[allow(clippy::cast_precision_loss)]
    pub fn compression_summary(&self, window: Option<Duration>) -> Option<CompressionSummary> {
        let events = self.in_window(window);
        if events.is_empty() {
            return None;
        }
        let n = events.len() as f64;
        let ratios = events.iter().map(|e| e.compression_ratio);
        let similarities = events.iter().map(|e| e.similarity);
        Some(CompressionSummary {
            count: events.len(),
            average_ratio: ratios.clone().sum::<f64>() / n,
            min_ratio: ratios.clone().fold(f64::INFINITY, f64::min),
            max_ratio: ratios.fold(f64::NEG_INFINITY, f64::max),
            tokens_saved: events
                .iter()
                .map(|e| e.original_tokens.saturating_sub(e.compressed_tokens))
                .sum(),
            average_similarity: similarities.clone().sum::<f64>() / n,
            min_similarity: similarities.fold(f64::INFINITY, f64::min),
        })
    }

    /// Token usage over the last `window` (all time if `None`).
    #[allow(clippy::cast_precision_loss)]
    pub fn token_usage_summary(&self, window: Option<Duration>) -> Option<TokenUsageSummary> {
        let events = self.in_window(window);
        if events.is_empty() {
            return None;
        }
        let total_original_tokens: usize = events.iter().map(|e| e.original_tokens).sum();
        Some(TokenUsageSummary {
            total_original_tokens,
            total_compressed_tokens: events.iter().map(|e| e.compressed_tokens).sum(),
            average_tokens_per_turn: total_original_tokens as f64 / events.len() as f64,
        })
    }
}

/// Per-exchange view of one record.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExchangeStats {
    /// Raw input tokens.
    pub original_tokens: usize,
    /// Compressed tokens.
    pub compressed_tokens: usize,
    /// Distinct speakers in first-seen order.
    pub unique_speakers: Vec<Speaker>,
    /// Runs of consecutive chunks by the same attributed speaker.
    pub turns: usize,
    /// Semantic similarity of compressed to original.
    pub semantic_similarity: f64,
}

impl ExchangeStats {
    /// Derive stats from a record's chunks and metadata.
    pub fn from_record(record: &ContextRecord) -> Self {
        let mut unique_speakers = Vec::new();
        let mut turns = 0;
        let mut last = None;
        for speaker in record.chunks.iter().filter_map(|c| c.speaker) {
            if !unique_speakers.contains(&speaker) {
                unique_speakers.push(speaker);
            }
            if last != Some(speaker) {
                turns += 1;
                last = Some(speaker);
            }
        }
        let compressed_tokens = record.token_count();
        Self {
            original_tokens: record.metadata.original_tokens.unwrap_or(compressed_tokens),
            compressed_tokens,
            unique_speakers,
            turns,
            semantic_similarity: record.metadata.semantic_similarity.unwrap_or(0.0),
        }
    }

    /// Original over compressed tokens.
    pub fn compression_ratio(&self) -> f64 {
        token_ratio(self.original_tokens, self.compressed_tokens)
    }
}
