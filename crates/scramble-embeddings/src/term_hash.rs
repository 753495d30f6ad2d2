//! Offline feature-hashing embedder.
//!
//! Each lowercased alphanumeric term is hashed with SHA-256 into one bucket
//! and a sign; bucket weights are summed and the vector L2-normalized. Texts
//! that share vocabulary end up with high cosine similarity, which is enough
//! structure for ranking and chunk merging without a model.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::errors::{EmbeddingError, Result};
use crate::normalize::l2_normalize;
use crate::service::EmbeddingService;

/// Terms shorter than this are ignored.
const MIN_TERM_CHARS: usize = 2;

/// Deterministic bag-of-terms embedder.
pub struct TermHashEmbeddingService {
    dims: usize,
}

impl TermHashEmbeddingService {
    /// Create an embedder producing `dims`-wide vectors.
    pub fn new(dims: usize) -> Result<Self> {
        if dims == 0 {
            return Err(EmbeddingError::Config("dimensions must be > 0".into()));
        }
        Ok(Self { dims })
    }

    fn terms(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.chars().count() >= MIN_TERM_CHARS)
            .map(str::to_lowercase)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0_f32; self.dims];
        for term in Self::terms(text) {
            let digest = Sha256::digest(term.as_bytes());
            let mut bucket_bytes = [0_u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dims as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }
        l2_normalize(&mut v);
        v
    }
}

#[async_trait]
impl EmbeddingService for TermHashEmbeddingService {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}
