//! Semantic, recency, and chain scoring of context records against a query.
//!
//! ```text
//! final = (1 - recency_weight) * semantic + recency_weight * recency + chain_bonus
//! ```
//!
//! - `semantic`: mean of the top three query·chunk dot products
//! - `recency`: `exp(-age / decay)`, age measured from the record's resolved
//!   timestamp and clamped at zero
//! - `chain_bonus`: a constant for records with a parent reference
//!
//! Scores are computed into [`ScoreBreakdown`] values that travel alongside
//! the record; the record itself is never modified.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use scramble_core::ContextRecord;
use scramble_embeddings::{EmbeddingService, dot};
use scramble_settings::SelectionSettings;
use serde::Serialize;
use tracing::{debug, warn};

/// Chunk scores averaged into the semantic score.
pub const TOP_CHUNKS: usize = 3;

/// Default recency weight.
pub const DEFAULT_RECENCY_WEIGHT: f64 = 0.1;

/// Default bonus for records with a parent.
pub const DEFAULT_CHAIN_BONUS: f64 = 0.2;

/// Default recency decay constant in days.
pub const DEFAULT_DECAY_DAYS: f64 = 7.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Weights used to combine score components.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoringConfig {
    /// Weight of recency against semantic score.
    pub recency_weight: f64,
    /// Added to records that have a parent.
    pub chain_bonus: f64,
    /// Recency decay constant in days.
    pub decay_days: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            recency_weight: DEFAULT_RECENCY_WEIGHT,
            chain_bonus: DEFAULT_CHAIN_BONUS,
            decay_days: DEFAULT_DECAY_DAYS,
        }
    }
}

impl ScoringConfig {
    /// Weights from selection settings.
    pub fn from_settings(settings: &SelectionSettings) -> Self {
        Self {
            recency_weight: settings.recency_weight,
            chain_bonus: settings.chain_bonus,
            decay_days: settings.decay_days,
        }
    }

    /// Same config with a different recency weight.
    #[must_use]
    pub fn with_recency_weight(mut self, recency_weight: f64) -> Self {
        self.recency_weight = recency_weight;
        self
    }
}

/// Per-record score components.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    /// Mean of the top chunk dot products.
    pub semantic_score: f64,
    /// Exponential recency decay.
    pub recency_score: f64,
    /// Chain bonus applied.
    pub chain_bonus: f64,
    /// Weighted combination.
    pub final_score: f64,
}

/// A record with its score breakdown.
#[derive(Clone, Debug)]
pub struct ScoredContext {
    /// The scored record.
    pub record: Arc<ContextRecord>,
    /// Score components.
    pub breakdown: ScoreBreakdown,
}

/// Mean of the top [`TOP_CHUNKS`] dot products between `query` and the
/// record's chunk embeddings.
///
/// Embeddings whose width differs from the query are ignored. A record with no
/// comparable embeddings scores 0.0.
#[allow(clippy::cast_precision_loss)]
pub fn semantic_score(query: &[f32], record: &ContextRecord) -> f64 {
    let mut scores: Vec<f32> = record
        .embeddings
        .iter()
        .filter_map(|e| dot(query, e))
        .collect();
    if scores.is_empty() {
        return 0.0;
    }
    scores.sort_by(|a, b| b.total_cmp(a));
    let top = &scores[..scores.len().min(TOP_CHUNKS)];
    top.iter().map(|s| f64::from(*s)).sum::<f64>() / top.len() as f64
}

/// `exp(-age / (decay_days * 86400))`, with future timestamps treated as age 0.
#[allow(clippy::cast_precision_loss)]
pub fn recency_score(timestamp: DateTime<Utc>, now: DateTime<Utc>, decay_days: f64) -> f64 {
    let age_seconds = ((now - timestamp).num_milliseconds() as f64 / 1000.0).max(0.0);
    (-age_seconds / (decay_days * SECONDS_PER_DAY)).exp()
}

/// Score one record.
///
/// `query` is `None` when the query could not be embedded; the semantic score
/// is then 0.0 and the other components still apply.
pub fn score_record(
    query: Option<&[f32]>,
    record: &ContextRecord,
    now: DateTime<Utc>,
    config: &ScoringConfig,
) -> ScoreBreakdown {
    let semantic = query.map_or(0.0, |q| semantic_score(q, record));
    let recency = recency_score(record.resolved_timestamp(), now, config.decay_days);
    let chain_bonus = if record.parent_context().is_some() {
        config.chain_bonus
    } else {
        0.0
    };
    ScoreBreakdown {
        semantic_score: semantic,
        recency_score: recency,
        chain_bonus,
        final_score: (1.0 - config.recency_weight) * semantic
            + config.recency_weight * recency
            + chain_bonus,
    }
}

/// Score every candidate and sort by descending final score.
///
/// The sort is stable: ties keep candidate order.
pub fn rank(
    query: Option<&[f32]>,
    candidates: &[Arc<ContextRecord>],
    now: DateTime<Utc>,
    config: &ScoringConfig,
) -> Vec<ScoredContext> {
    let mut scored: Vec<ScoredContext> = candidates
        .iter()
        .map(|record| ScoredContext {
            breakdown: score_record(query, record, now, config),
            record: Arc::clone(record),
        })
        .collect();
    scored.sort_by(|a, b| b.breakdown.final_score.total_cmp(&a.breakdown.final_score));
    scored
}

/// Embed a query, logging and returning `None` on provider failure.
pub async fn embed_query(embedder: &dyn EmbeddingService, query: &str) -> Option<Vec<f32>> {
    match embedder.embed_single(query).await {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(error = %e, "query embedding failed, semantic scores set to 0");
            None
        }
    }
}

/// Rank `candidates` against `query` and keep the best `top_k`.
pub async fn find_similar(
    embedder: &dyn EmbeddingService,
    query: &str,
    candidates: &[Arc<ContextRecord>],
    top_k: usize,
    config: &ScoringConfig,
) -> Vec<ScoredContext> {
    if candidates.is_empty() || top_k == 0 {
        return Vec::new();
    }
    let query_vec = embed_query(embedder, query).await;
    let mut ranked = rank(query_vec.as_deref(), candidates, Utc::now(), config);
    ranked.truncate(top_k);
    debug!(
        candidates = candidates.len(),
        returned = ranked.len(),
        "ranked similar contexts"
    );
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use scramble_core::{ChunkRecord, ContextId, ContextMetadata};
    use scramble_embeddings::MockEmbeddingService;

    const UNIT: &[f32] = &[1.0];

    fn record(id: &str, embeddings: Vec<Vec<f32>>, parent: Option<&str>) -> ContextRecord {
        let chunks = embeddings.iter().map(|_| ChunkRecord::new("x", None)).collect();
        ContextRecord::new(
            ContextId::from(id),
            chunks,
            embeddings,
            ContextMetadata {
                parent_context: parent.map(ContextId::from),
                ..ContextMetadata::default()
            },
        )
    }

    #[test]
    fn scoring_config_from_settings() {
        let settings = SelectionSettings {
            recency_weight: 0.3,
            chain_bonus: 0.5,
            decay_days: 14.0,
            ..SelectionSettings::default()
        };
        let config = ScoringConfig::from_settings(&settings);
        assert!((config.recency_weight - 0.3).abs() < f64::EPSILON);
        assert!((config.chain_bonus - 0.5).abs() < f64::EPSILON);
        assert!((config.decay_days - 14.0).abs() < f64::EPSILON);
        assert_eq!(
            ScoringConfig::from_settings(&SelectionSettings::default()),
            ScoringConfig::default()
        );
    }

    #[test]
    fn semantic_averages_top_three() {
        let r = record(
            "a",
            vec![vec![1.0], vec![0.5], vec![0.2], vec![0.9], vec![-1.0]],
            None,
        );
        let expected = (1.0 + 0.9 + 0.5) / 3.0;
        assert!((semantic_score(&[1.0], &r) - expected).abs() < 1e-6);
    }

    #[test]
    fn semantic_fewer_than_three_chunks() {
        let r = record("a", vec![vec![0.4], vec![0.2]], None);
        assert!((semantic_score(&[1.0], &r) - 0.3).abs() < 1e-6);
    }

    #[test]
    fn semantic_ignores_mismatched_dims() {
        let r = record("a", vec![vec![1.0, 0.0], vec![0.5]], None);
        assert!((semantic_score(&[1.0], &r) - 0.5).abs() < 1e-6);
        let empty = record("b", vec![], None);
        assert!(semantic_score(&[1.0], &empty).abs() < f64::EPSILON);
    }

    #[test]
    fn recency_decays_and_clamps() {
        let now = Utc::now();
        assert!((recency_score(now, now, 7.0) - 1.0).abs() < 1e-9);
        let week_ago = now - Duration::days(7);
        assert!((recency_score(week_ago, now, 7.0) - (-1.0_f64).exp()).abs() < 1e-6);
        let future = now + Duration::hours(5);
        assert!((recency_score(future, now, 7.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn chain_bonus_applies_to_children() {
        let now = Utc::now();
        let config = ScoringConfig::default();
        let root = record("r", vec![vec![0.0]], None);
        let child = record("c", vec![vec![0.0]], Some("r"));
        let root_score = score_record(Some(UNIT), &root, now, &config);
        let child_score = score_record(Some(UNIT), &child, now, &config);
        assert!(root_score.chain_bonus.abs() < f64::EPSILON);
        assert!((child_score.chain_bonus - 0.2).abs() < f64::EPSILON);
        assert!((child_score.final_score - root_score.final_score - 0.2).abs() < 1e-9);
    }

    #[test]
    fn final_score_formula() {
        let now = Utc::now();
        let mut r = record("a", vec![vec![0.8]], Some("p"));
        r.metadata.timestamp = Some(now - Duration::days(7));
        let config = ScoringConfig::default().with_recency_weight(0.25);
        let b = score_record(Some(UNIT), &r, now, &config);
        let expected = 0.75 * f64::from(0.8_f32) + 0.25 * (-1.0_f64).exp() + 0.2;
        assert!((b.final_score - expected).abs() < 1e-6);
    }

    #[test]
    fn missing_query_zeroes_semantic() {
        let r = record("a", vec![vec![1.0]], None);
        let b = score_record(None, &r, Utc::now(), &ScoringConfig::default());
        assert!(b.semantic_score.abs() < f64::EPSILON);
        assert!(b.recency_score > 0.99);
    }

    #[test]
    fn rank_is_stable_on_ties() {
        let now = Utc::now();
        let mut a = record("a", vec![vec![0.5]], None);
        let mut b = record("b", vec![vec![0.5]], None);
        let mut c = record("c", vec![vec![0.9]], None);
        for r in [&mut a, &mut b, &mut c] {
            r.metadata.timestamp = Some(now);
        }
        let candidates = vec![Arc::new(a), Arc::new(b), Arc::new(c)];
        let ranked = rank(Some(UNIT), &candidates, now, &ScoringConfig::default());
        let ids: Vec<&str> = ranked.iter().map(|s| s.record.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn rank_does_not_touch_records() {
        let r = Arc::new(record("a", vec![vec![1.0]], None));
        let before = (*r).clone();
        let _ = rank(Some(UNIT), &[Arc::clone(&r)], Utc::now(), &ScoringConfig::default());
        assert_eq!(*r, before);
    }

    #[tokio::test]
    async fn find_similar_truncates_to_top_k() {
        let embedder = MockEmbeddingService::new(4);
        let candidates: Vec<_> = (0..5)
            .map(|i| Arc::new(record(&format!("c{i}"), vec![vec![0.1, 0.2, 0.3, 0.4]], None)))
            .collect();
        let out = find_similar(&embedder, "query", &candidates, 2, &ScoringConfig::default()).await;
        assert_eq!(out.len(), 2);
    }

    #[tokio::test]
    async fn find_similar_empty_inputs() {
        let embedder = MockEmbeddingService::new(4);
        assert!(
            find_similar(&embedder, "q", &[], 3, &ScoringConfig::default())
                .await
                .is_empty()
        );
    }

    #[tokio::test]
    async fn find_similar_survives_provider_failure() {
        let embedder = MockEmbeddingService::new(1);
        embedder.set_ready(false);
        let parent = Arc::new(record("p", vec![vec![1.0]], None));
        let child = Arc::new(record("c", vec![vec![1.0]], Some("p")));
        let out = find_similar(
            &embedder,
            "q",
            &[parent, child],
            2,
            &ScoringConfig::default(),
        )
        .await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].record.id.as_str(), "c", "chain bonus still applies");
        assert!(out.iter().all(|s| s.breakdown.semantic_score.abs() < f64::EPSILON));
    }
}
