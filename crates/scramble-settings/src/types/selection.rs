//! Context selection settings.

use serde::{Deserialize, Serialize};

/// Scoring weights, budget, and candidate windows for context selection.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectionSettings {
    /// Token budget for selected contexts.
    pub max_tokens: usize,
    /// Weight of recency against semantic score (0.0–1.0).
    pub recency_weight: f64,
    /// Score added to records that have a parent.
    pub chain_bonus: f64,
    /// Recency decay constant in days.
    pub decay_days: f64,
    /// Semantic candidates gathered per message.
    pub similar_top_k: usize,
    /// Window for recent-record candidates.
    pub recent_hours: u32,
    /// Half-width of the window around a parsed time reference.
    pub timeframe_window_hours: u32,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            max_tokens: 4000,
            recency_weight: 0.1,
            chain_bonus: 0.2,
            decay_days: 7.0,
            similar_top_k: 10,
            recent_hours: 168,
            timeframe_window_hours: 12,
        }
    }
}
