//! Raw exchange to [`ContextRecord`].
//!
//! `compress` runs the chunker and compactor, embeds the resulting chunks in
//! concurrent batches, measures how much meaning the compressed text retains,
//! and assembles metadata. It always returns a well-formed record: degenerate
//! input and provider failures produce error-tagged records instead of errors.

use std::sync::Arc;

use futures::future::try_join_all;
use scramble_core::{
    ChunkRecord, CompressionLevel, ContextId, ContextMetadata, ContextRecord, ErrorTag, LevelParams,
};
use scramble_embeddings::{EmbeddingError, EmbeddingService, cosine_similarity};
use scramble_settings::CompressionSettings;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::chunker::Chunker;
use crate::compactor::compact;
use crate::ranking::{ScoredContext, ScoringConfig, find_similar};
use crate::stats::StatsCollector;

/// Default number of chunks per embedding call.
pub const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 32;

fn whitespace_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Compresses dialogue into context records.
pub struct Compressor {
    embedder: Arc<dyn EmbeddingService>,
    level: CompressionLevel,
    batch_size: usize,
    stats: Option<StatsCollector>,
}

impl Compressor {
    /// Compressor at the default level (MEDIUM).
    pub fn new(embedder: Arc<dyn EmbeddingService>) -> Self {
        Self {
            embedder,
            level: CompressionLevel::default(),
            batch_size: DEFAULT_EMBEDDING_BATCH_SIZE,
            stats: None,
        }
    }

    /// Compressor configured from settings.
    pub fn from_settings(embedder: Arc<dyn EmbeddingService>, settings: &CompressionSettings) -> Self {
        Self::new(embedder)
            .with_level(settings.level)
            .with_batch_size(settings.embedding_batch_size)
    }

    /// Set the initial level.
    #[must_use]
    pub fn with_level(mut self, level: CompressionLevel) -> Self {
        self.level = level;
        self
    }

    /// Set chunks per embedding call (minimum 1).
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Report every compression into `stats`.
    #[must_use]
    pub fn with_stats(mut self, stats: StatsCollector) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Switch the active parameter row.
    pub fn set_compression_level(&mut self, level: CompressionLevel) {
        debug!(%level, params = ?level.params(), "set compression level");
        self.level = level;
    }

    /// Active level.
    pub fn level(&self) -> CompressionLevel {
        self.level
    }

    /// Active parameters.
    pub fn params(&self) -> LevelParams {
        self.level.params()
    }

    /// The embedding provider.
    pub fn embedder(&self) -> &Arc<dyn EmbeddingService> {
        &self.embedder
    }

    /// Chunk and compact `text` without embedding the result.
    pub async fn segment(&self, text: &str) -> Vec<ChunkRecord> {
        let params = self.params();
        let chunks = Chunker::from_params(params).chunk(text);
        compact(chunks, &params, self.embedder.as_ref()).await
    }

    /// Compress one exchange into a record.
    ///
    /// `metadata` is overlaid on the computed metadata, so a caller can set
    /// `parent_context`, override `timestamp`, or attach arbitrary keys.
    pub async fn compress(&self, text: &str, metadata: Option<Map<String, Value>>) -> ContextRecord {
        if text.trim().is_empty() {
            warn!("received empty or whitespace-only text for compression");
            return self.degenerate_empty(metadata);
        }

        let chunks = self.segment(text).await;
        if chunks.is_empty() {
            warn!("no chunks produced during compression");
            return self
                .degenerate_verbatim(text, ErrorTag::NoChunksProduced, metadata)
                .await;
        }

        let compressed_length: usize = chunks.iter().map(|c| c.size).sum();
        if compressed_length == 0 {
            warn!("compressed content length is zero");
            return self
                .degenerate_verbatim(text, ErrorTag::ZeroCompressedLength, metadata)
                .await;
        }

        let id = ContextId::new();
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let (embeddings, error) = match self.embed_chunks(&texts).await {
            Ok(vectors) => (vectors, None),
            Err(e) => {
                warn!(context_id = %id, error = %e, "chunk embedding failed, storing zero vectors");
                (self.zero_vectors(chunks.len()), Some(ErrorTag::EmbeddingFailed))
            }
        };

        let compressed_text = texts.join(" ");
        let similarity = self.text_similarity(text, &compressed_text).await;
        let original_length = text.chars().count();
        let original_tokens = whitespace_tokens(text);
        let compressed_tokens = whitespace_tokens(&compressed_text);

        if let Some(stats) = &self.stats {
            stats.record_compression(original_tokens, compressed_tokens, similarity, &id);
        }

        #[allow(clippy::cast_precision_loss)]
        let compression_ratio = original_length as f64 / compressed_length as f64;
        let mut meta = ContextMetadata {
            timestamp: Some(chrono::Utc::now()),
            compression_ratio: Some(compression_ratio),
            semantic_similarity: Some(similarity),
            original_length: Some(original_length),
            compressed_length: Some(compressed_length),
            original_tokens: Some(original_tokens),
            compressed_tokens: Some(compressed_tokens),
            compression_level: Some(self.level),
            error,
            ..ContextMetadata::default()
        };
        if let Some(caller) = metadata {
            meta.overlay(caller);
        }

        info!(
            context_id = %id,
            level = %self.level,
            chunks = chunks.len(),
            ratio = compression_ratio,
            similarity,
            "compressed exchange"
        );
        ContextRecord::new(id, chunks, embeddings, meta)
    }

    /// Rank `candidates` against `query` with this compressor's provider.
    pub async fn find_similar(
        &self,
        query: &str,
        candidates: &[Arc<ContextRecord>],
        top_k: usize,
        recency_weight: f64,
    ) -> Vec<ScoredContext> {
        let config = ScoringConfig::default().with_recency_weight(recency_weight);
        find_similar(self.embedder.as_ref(), query, candidates, top_k, &config).await
    }

    /// Embed chunk texts in concurrent batches, reassembled in input order.
    async fn embed_chunks(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let batches: Vec<&[String]> = texts.chunks(self.batch_size).collect();
        let results = try_join_all(batches.iter().map(|batch| self.embedder.embed(batch))).await?;

        let expected_dims = self.embedder.dimensions();
        let mut vectors = Vec::with_capacity(texts.len());
        for (batch, batch_vectors) in batches.iter().zip(results) {
            if batch_vectors.len() != batch.len() {
                return Err(EmbeddingError::Inference(format!(
                    "provider returned {} vectors for {} texts",
                    batch_vectors.len(),
                    batch.len()
                )));
            }
            if let Some(bad) = batch_vectors.iter().find(|v| v.len() != expected_dims) {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: expected_dims,
                    actual: bad.len(),
                });
            }
            vectors.extend(batch_vectors);
        }
        Ok(vectors)
    }

    /// Cosine similarity of the original and compressed text; 0.0 on failure.
    async fn text_similarity(&self, original: &str, compressed: &str) -> f64 {
        let texts = [original.to_string(), compressed.to_string()];
        match self.embedder.embed(&texts).await {
            Ok(v) if v.len() == 2 => f64::from(cosine_similarity(&v[0], &v[1])),
            Ok(_) => {
                warn!("embedding provider returned wrong batch size for similarity");
                0.0
            }
            Err(e) => {
                warn!(error = %e, "error calculating similarity score");
                0.0
            }
        }
    }

    fn zero_vectors(&self, n: usize) -> Vec<Vec<f32>> {
        vec![vec![0.0; self.embedder.dimensions()]; n]
    }

    fn degenerate_metadata(&self, tag: ErrorTag, caller: Option<Map<String, Value>>) -> ContextMetadata {
        let mut meta = ContextMetadata::with_error(tag);
        meta.compression_level = Some(self.level);
        if let Some(caller) = caller {
            meta.overlay(caller);
        }
        meta.error = Some(tag);
        meta
    }

    /// One empty marker chunk with a zero vector.
    fn degenerate_empty(&self, caller: Option<Map<String, Value>>) -> ContextRecord {
        ContextRecord::new(
            ContextId::new(),
            vec![ChunkRecord::empty()],
            self.zero_vectors(1),
            self.degenerate_metadata(ErrorTag::EmptyInput, caller),
        )
    }

    /// One chunk wrapping the raw text verbatim.
    async fn degenerate_verbatim(
        &self,
        text: &str,
        tag: ErrorTag,
        caller: Option<Map<String, Value>>,
    ) -> ContextRecord {
        let embedding = match self.embedder.embed_single(text).await {
            Ok(v) if v.len() == self.embedder.dimensions() => v,
            Ok(_) | Err(_) => vec![0.0; self.embedder.dimensions()],
        };
        ContextRecord::new(
            ContextId::new(),
            vec![ChunkRecord::new(text, None)],
            vec![embedding],
            self.degenerate_metadata(tag, caller),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scramble_core::Speaker;
    use scramble_core::logging::capture_logs;
    use scramble_embeddings::{MockEmbeddingService, TermHashEmbeddingService};
    use serde_json::json;

    fn term_hash() -> Arc<dyn EmbeddingService> {
        Arc::new(TermHashEmbeddingService::new(128).unwrap())
    }

    fn dialogue() -> String {
        "Human: I have been learning Rust for a few weeks now. The borrow checker \
         keeps rejecting my code. Can you explain why?\n\
         Assistant: The borrow checker enforces that you either have many shared \
         references or one mutable reference. It prevents data races at compile \
         time. Most errors mean two parts of the code want the same data.\n\
         Human: That makes sense. What about lifetimes?\n\
         Assistant: Lifetimes describe how long references stay valid. The \
         compiler infers most of them. You only write them when it cannot."
            .to_string()
    }

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => Map::new(),
        }
    }

    #[tokio::test]
    async fn compress_produces_consistent_record() {
        let compressor = Compressor::new(term_hash());
        let record = compressor.compress(&dialogue(), None).await;
        assert!(record.is_consistent());
        assert!(record.chunks.len() > 1);
        assert!(record.metadata.error.is_none());
        assert!(record.embeddings.iter().all(|e| e.len() == 128));

        let meta = &record.metadata;
        assert_eq!(meta.original_length, Some(dialogue().chars().count()));
        let compressed: usize = record.chunks.iter().map(|c| c.size).sum();
        assert_eq!(meta.compressed_length, Some(compressed));
        assert_eq!(meta.compression_level, Some(CompressionLevel::Medium));
        assert!(meta.semantic_similarity.unwrap() > 0.5);
        assert!(meta.timestamp.is_some());
        assert_eq!(
            meta.compressed_tokens,
            Some(record.text_content().split_whitespace().count())
        );
    }

    #[tokio::test]
    async fn compress_is_deterministic() {
        let compressor = Compressor::new(term_hash());
        let a = compressor.compress(&dialogue(), None).await;
        let b = compressor.compress(&dialogue(), None).await;
        assert_eq!(a.chunks, b.chunks);
        assert_eq!(a.embeddings, b.embeddings);
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn empty_input_is_tagged() {
        let compressor = Compressor::new(term_hash());
        for input in ["", "   \n\t "] {
            let record = compressor.compress(input, None).await;
            assert_eq!(record.metadata.error, Some(ErrorTag::EmptyInput));
            assert_eq!(record.chunks, vec![ChunkRecord::empty()]);
            assert_eq!(record.embeddings, vec![vec![0.0; 128]]);
            assert!(record.is_consistent());
        }
    }

    #[tokio::test]
    async fn empty_input_keeps_caller_parent_but_not_error_override() {
        let compressor = Compressor::new(term_hash());
        let record = compressor
            .compress("", Some(map(json!({"parent_context": "p1", "error": null}))))
            .await;
        assert_eq!(record.parent_context().map(ContextId::as_str), Some("p1"));
        assert_eq!(record.metadata.error, Some(ErrorTag::EmptyInput));
    }

    #[tokio::test]
    async fn marker_only_lines_yield_no_chunks_tag() {
        let compressor = Compressor::new(term_hash());
        let text = "Human:\nAssistant:\nHuman:\nAssistant:";
        let record = compressor.compress(text, None).await;
        assert_eq!(record.metadata.error, Some(ErrorTag::NoChunksProduced));
        assert_eq!(record.chunks.len(), 1);
        assert_eq!(record.chunks[0].content, text);
        assert!(record.is_consistent());
    }

    #[tokio::test]
    async fn bare_marker_yields_zero_length_tag() {
        let compressor = Compressor::new(term_hash());
        let record = compressor.compress("Human:", None).await;
        assert_eq!(record.metadata.error, Some(ErrorTag::ZeroCompressedLength));
        assert_eq!(record.chunks[0].content, "Human:");
        assert!(record.is_consistent());
    }

    #[tokio::test]
    async fn provider_failure_tags_record() {
        let (logs, _guard) = capture_logs();
        let mock = Arc::new(MockEmbeddingService::new(16));
        mock.set_ready(false);
        let compressor = Compressor::new(mock);
        let record = compressor.compress(&dialogue(), None).await;
        assert_eq!(record.metadata.error, Some(ErrorTag::EmbeddingFailed));
        assert!(record.is_consistent());
        assert!(record.embeddings.iter().all(|e| e.iter().all(|x| *x == 0.0)));
        assert_eq!(record.metadata.semantic_similarity, Some(0.0));
        assert!(logs.has_event(tracing::Level::WARN, "chunk embedding failed"));
    }

    #[tokio::test]
    async fn batching_preserves_chunk_order() {
        let embedder = term_hash();
        let compressor = Compressor::new(Arc::clone(&embedder)).with_batch_size(2);
        let record = compressor.compress(&dialogue(), None).await;
        assert!(record.chunks.len() > 2);
        for (chunk, vector) in record.chunks.iter().zip(&record.embeddings) {
            assert_eq!(&embedder.embed_single(&chunk.content).await.unwrap(), vector);
        }
    }

    #[tokio::test]
    async fn caller_metadata_overlays() {
        let compressor = Compressor::new(term_hash());
        let record = compressor
            .compress(
                &dialogue(),
                Some(map(json!({
                    "parent_context": "prev",
                    "timestamp": "2024-03-01T08:00:00Z",
                    "channel": "cli"
                }))),
            )
            .await;
        assert_eq!(record.parent_context().map(ContextId::as_str), Some("prev"));
        assert_eq!(
            record.resolved_timestamp().to_rfc3339(),
            "2024-03-01T08:00:00+00:00"
        );
        assert_eq!(record.metadata.extra["channel"], "cli");
        assert!(record.metadata.compression_ratio.is_some());
    }

    #[tokio::test]
    async fn stats_are_recorded() {
        let stats = StatsCollector::new();
        let compressor = Compressor::new(term_hash()).with_stats(stats.clone());
        let record = compressor.compress(&dialogue(), None).await;
        let events = stats.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].context_id, record.id);
        assert_eq!(Some(events[0].compressed_tokens), record.metadata.compressed_tokens);
    }

    #[tokio::test]
    async fn set_level_changes_chunking() {
        let mut compressor = Compressor::new(term_hash());
        compressor.set_compression_level(CompressionLevel::Low);
        assert_eq!(compressor.level(), CompressionLevel::Low);
        let low = compressor.segment(&dialogue()).await;
        compressor.set_compression_level(CompressionLevel::High);
        let high = compressor.segment(&dialogue()).await;
        assert!(high.len() > low.len());
    }

    #[tokio::test]
    async fn short_exchange_single_chunk() {
        let compressor = Compressor::new(term_hash());
        let record = compressor
            .compress("Hi there!\nAssistant: Hello! How can I help?", None)
            .await;
        assert_eq!(record.chunks.len(), 1);
        assert_eq!(record.chunks[0].speaker, Some(Speaker::Assistant));
        assert!(record.metadata.error.is_none());
    }

    #[tokio::test]
    async fn long_text_chunks_respect_medium_bound() {
        let body = (0..500)
            .map(|i| format!("Sentence {i} talks about topic {}.", i % 7))
            .collect::<Vec<_>>()
            .join(" ");
        let text = format!("Human: {body}");
        let compressor = Compressor::new(term_hash());
        let record = compressor.compress(&text, None).await;
        let bound = CompressionLevel::Medium.params().merged_size_bound();
        assert!(record.chunks.len() > 2);
        assert!(record.is_consistent());
        for chunk in &record.chunks {
            #[allow(clippy::cast_precision_loss)]
            let size = chunk.size as f64;
            assert!(size <= bound, "chunk of {} chars", chunk.size);
        }
    }

    #[tokio::test]
    async fn higher_levels_compress_at_least_as_much() {
        let text = dialogue();
        let mut ratios = Vec::new();
        for level in CompressionLevel::ALL {
            let compressor =
                Compressor::new(Arc::new(MockEmbeddingService::new(64))).with_level(level);
            let record = compressor.compress(&text, None).await;
            ratios.push(record.metadata.compression_ratio.unwrap());
        }
        // ALL is ordered LOW, MEDIUM, HIGH
        assert!(ratios[2] >= ratios[1], "{ratios:?}");
        assert!(ratios[1] >= ratios[0], "{ratios:?}");
    }

    #[tokio::test]
    async fn from_settings_applies_level() {
        let settings = CompressionSettings {
            level: CompressionLevel::High,
            embedding_batch_size: 0,
        };
        let compressor = Compressor::from_settings(term_hash(), &settings);
        assert_eq!(compressor.level(), CompressionLevel::High);
        let record = compressor.compress(&dialogue(), None).await;
        assert!(record.is_consistent());
    }
}
