//! Embedding service trait and mock implementation.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::errors::{EmbeddingError, Result};
use crate::normalize::l2_normalize;

/// Trait for embedding text into vectors.
///
/// Implementations must be deterministic for identical input and preserve
/// input order in batch results.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text (default: calls `embed` with one item).
    async fn embed_single(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Inference("empty result".into()))
    }

    /// Whether the service is ready for inference.
    fn is_ready(&self) -> bool;

    /// Output embedding dimensions.
    fn dimensions(&self) -> usize;
}

/// Deterministic stand-in provider for tests and offline runs.
///
/// Components come from SHA-256 digests of the text salted with a block
/// counter, sixteen components per digest, so no part of a vector repeats.
/// Vectors carry no semantic structure. Every `embed` call is counted, and
/// the provider can be taken offline to exercise degraded paths.
pub struct MockEmbeddingService {
    dims: usize,
    online: AtomicBool,
    calls: AtomicUsize,
}

impl MockEmbeddingService {
    /// Create an online provider producing `dims`-dimensional vectors.
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            online: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        }
    }

    /// Take the provider offline (`false`) or back online. Offline calls fail
    /// with [`EmbeddingError::NotReady`].
    pub fn set_ready(&self, ready: bool) {
        self.online.store(ready, Ordering::SeqCst);
    }

    /// Number of `embed` calls so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut v = Vec::with_capacity(self.dims);
        let mut block = 0u32;
        while v.len() < self.dims {
            let digest = Sha256::new()
                .chain_update(block.to_le_bytes())
                .chain_update(text.as_bytes())
                .finalize();
            let remaining = self.dims - v.len();
            v.extend(
                digest
                    .chunks_exact(2)
                    .map(|w| f32::from(u16::from_le_bytes([w[0], w[1]])) / f32::from(u16::MAX) * 2.0 - 1.0)
                    .take(remaining),
            );
            block = block.wrapping_add(1);
        }
        l2_normalize(&mut v);
        v
    }
}

#[async_trait]
impl EmbeddingService for MockEmbeddingService {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.is_ready() {
            return Err(EmbeddingError::NotReady);
        }
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn is_ready(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::l2_norm;

    #[tokio::test]
    async fn batch_yields_one_vector_per_text() {
        let svc = MockEmbeddingService::new(512);
        let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let results = svc.embed(&texts).await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.len() == 512));
    }

    #[tokio::test]
    async fn batch_matches_single_calls() {
        let svc = MockEmbeddingService::new(32);
        let texts = vec!["first".to_string(), "second".to_string()];
        let batch = svc.embed(&texts).await.unwrap();
        assert_eq!(batch[0], svc.embed_single("first").await.unwrap());
        assert_eq!(batch[1], svc.embed_single("second").await.unwrap());
    }

    #[tokio::test]
    async fn same_text_same_vector() {
        let svc = MockEmbeddingService::new(512);
        let a = svc.embed_single("hello world").await.unwrap();
        let b = svc.embed_single("hello world").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn different_texts_differ() {
        let svc = MockEmbeddingService::new(512);
        let a = svc.embed_single("hello").await.unwrap();
        let b = svc.embed_single("world").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn offline_returns_not_ready() {
        let svc = MockEmbeddingService::new(512);
        svc.set_ready(false);
        assert!(!svc.is_ready());
        let result = svc.embed_single("test").await;
        assert!(matches!(result, Err(EmbeddingError::NotReady)));
    }

    #[tokio::test]
    async fn embed_single_is_unit_vector() {
        let svc = MockEmbeddingService::new(64);
        let result = svc.embed_single("test").await.unwrap();
        assert_eq!(result.len(), 64);
        assert!((l2_norm(&result) - 1.0).abs() < 1e-5, "should be unit vector");
    }

    #[tokio::test]
    async fn long_vectors_do_not_repeat_the_digest() {
        let svc = MockEmbeddingService::new(40);
        let v = svc.embed_single("context").await.unwrap();
        assert_eq!(v.len(), 40);
        assert_ne!(v[..16], v[16..32]);
    }

    #[tokio::test]
    async fn counts_calls_while_offline() {
        let svc = MockEmbeddingService::new(4);
        let _ = svc.embed_single("a").await.unwrap();
        svc.set_ready(false);
        assert!(svc.embed(&["b".to_string()]).await.is_err());
        svc.set_ready(true);
        let _ = svc.embed(&[]).await.unwrap();
        assert_eq!(svc.calls(), 3);
    }

    #[tokio::test]
    async fn empty_batch_is_empty() {
        let svc = MockEmbeddingService::new(8);
        assert!(svc.embed(&[]).await.unwrap().is_empty());
    }
}
