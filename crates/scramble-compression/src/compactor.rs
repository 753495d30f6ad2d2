//! Greedy merging of adjacent chunks.
//!
//! Two neighbours merge only when they share a speaker, the merged chunk stays
//! within `chunk_size * (2 - length_multiplier)`, and their embeddings reach
//! `combine_threshold` cosine similarity. The size check runs first so the
//! provider is only called for pairs that could merge.

use scramble_core::{ChunkRecord, LevelParams};
use scramble_embeddings::{EmbeddingService, cosine_similarity};
use tracing::{debug, warn};

/// Merge adjacent chunks that pass the size and similarity checks.
///
/// The output is never longer than the input. A chunk that was oversized on
/// input stays as it is; merged chunks always respect the size bound.
pub async fn compact(
    chunks: Vec<ChunkRecord>,
    params: &LevelParams,
    embedder: &dyn EmbeddingService,
) -> Vec<ChunkRecord> {
    if chunks.len() < 2 {
        return chunks;
    }

    let input_len = chunks.len();
    let mut out = Vec::with_capacity(input_len);
    let mut iter = chunks.into_iter();
    let Some(mut acc) = iter.next() else {
        return out;
    };

    for chunk in iter {
        if should_combine(&acc, &chunk, params, embedder).await {
            acc.absorb(&chunk);
        } else {
            out.push(std::mem::replace(&mut acc, chunk));
        }
    }
    out.push(acc);

    debug!(before = input_len, after = out.len(), "compacted chunks");
    out
}

/// Size of `a` and `b` joined by one space.
fn merged_size(a: &ChunkRecord, b: &ChunkRecord) -> usize {
    a.size + 1 + b.size
}

#[allow(clippy::cast_precision_loss)]
async fn should_combine(
    a: &ChunkRecord,
    b: &ChunkRecord,
    params: &LevelParams,
    embedder: &dyn EmbeddingService,
) -> bool {
    if a.speaker != b.speaker {
        return false;
    }
    if merged_size(a, b) as f64 > params.merged_size_bound() {
        return false;
    }
    let similarity = pair_similarity(a, b, embedder).await;
    similarity >= params.combine_threshold
}

/// Cosine similarity of two chunks' embeddings; 0.0 if the provider fails.
async fn pair_similarity(a: &ChunkRecord, b: &ChunkRecord, embedder: &dyn EmbeddingService) -> f32 {
    let texts = [a.content.clone(), b.content.clone()];
    match embedder.embed(&texts).await {
        Ok(vectors) if vectors.len() == 2 => cosine_similarity(&vectors[0], &vectors[1]),
        Ok(vectors) => {
            warn!(returned = vectors.len(), "embedding provider returned wrong batch size");
            0.0
        }
        Err(e) => {
            warn!(error = %e, "chunk similarity failed, not merging");
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scramble_core::logging::capture_logs;
    use scramble_core::{CompressionLevel, Speaker};
    use scramble_embeddings::{MockEmbeddingService, TermHashEmbeddingService};

    fn chunk(s: &str, speaker: Option<Speaker>) -> ChunkRecord {
        ChunkRecord::new(s, speaker)
    }

    #[tokio::test]
    async fn merges_similar_same_speaker() {
        let embedder = TermHashEmbeddingService::new(256).unwrap();
        let params = CompressionLevel::Medium.params();
        let chunks = vec![
            chunk("rust borrow checker rules", Some(Speaker::User)),
            chunk("rust borrow checker rules", Some(Speaker::User)),
        ];
        let out = compact(chunks, &params, &embedder).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].content, "rust borrow checker rules rust borrow checker rules");
        assert_eq!(out[0].size, out[0].content.chars().count());
    }

    #[tokio::test]
    async fn never_merges_across_speakers() {
        let embedder = TermHashEmbeddingService::new(256).unwrap();
        let params = CompressionLevel::Medium.params();
        let chunks = vec![
            chunk("same words here", Some(Speaker::User)),
            chunk("same words here", Some(Speaker::Assistant)),
        ];
        let out = compact(chunks, &params, &embedder).await;
        assert_eq!(out.len(), 2);
    }

    #[tokio::test]
    async fn size_bound_blocks_merge() {
        let embedder = TermHashEmbeddingService::new(256).unwrap();
        let params = CompressionLevel::Medium.params();
        let text = "word ".repeat(9).trim_end().to_string(); // 44 chars
        let chunks = vec![chunk(&text, None), chunk(&text, None)];
        let out = compact(chunks, &params, &embedder).await;
        assert_eq!(out.len(), 2, "89 chars exceeds the MEDIUM bound of 80");
    }

    #[tokio::test]
    async fn dissimilar_chunks_stay_apart() {
        let embedder = TermHashEmbeddingService::new(256).unwrap();
        let params = CompressionLevel::Medium.params();
        let chunks = vec![
            chunk("compilers parse tokens", None),
            chunk("bake chocolate cake", None),
        ];
        assert_eq!(compact(chunks, &params, &embedder).await.len(), 2);
    }

    #[tokio::test]
    async fn provider_failure_keeps_chunks_and_logs() {
        let (logs, _guard) = capture_logs();
        let embedder = MockEmbeddingService::new(32);
        embedder.set_ready(false);
        let params = CompressionLevel::Medium.params();
        let chunks = vec![chunk("a b c", None), chunk("a b c", None)];
        let out = compact(chunks.clone(), &params, &embedder).await;
        assert_eq!(out, chunks);
        assert!(logs.has_event(tracing::Level::WARN, "chunk similarity failed"));
    }

    #[tokio::test]
    async fn single_chunk_passthrough() {
        let embedder = MockEmbeddingService::new(8);
        let params = CompressionLevel::High.params();
        let chunks = vec![chunk("only", None)];
        assert_eq!(compact(chunks.clone(), &params, &embedder).await, chunks);
        assert!(compact(Vec::new(), &params, &embedder).await.is_empty());
    }

    #[tokio::test]
    async fn merged_chunks_respect_bound() {
        let embedder = TermHashEmbeddingService::new(256).unwrap();
        let params = CompressionLevel::High.params();
        let chunks: Vec<_> = (0..20).map(|_| chunk("go go", Some(Speaker::User))).collect();
        let out = compact(chunks, &params, &embedder).await;
        assert!(out.len() < 20);
        let bound = params.merged_size_bound();
        for c in &out {
            #[allow(clippy::cast_precision_loss)]
            let size = c.size as f64;
            assert!(size <= bound);
        }
    }
}
