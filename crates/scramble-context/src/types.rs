//! Selection result types.

use std::sync::Arc;

use scramble_compression::ScoreBreakdown;
use scramble_core::ContextRecord;
use serde::{Deserialize, Serialize};

/// Semantic score above which a selection counts as a semantic match.
pub const SEMANTIC_MATCH_THRESHOLD: f64 = 0.5;

/// Why a context was selected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
    /// Semantic score above [`SEMANTIC_MATCH_THRESHOLD`].
    SemanticMatch,
    /// Part of a conversation chain.
    ChainBonus,
    /// Neither; picked up by time proximity.
    TimeWindow,
}

impl SelectionReason {
    /// Reason for a scored context, by priority: semantic, chain, time.
    pub fn from_breakdown(breakdown: &ScoreBreakdown) -> Self {
        if breakdown.semantic_score > SEMANTIC_MATCH_THRESHOLD {
            Self::SemanticMatch
        } else if breakdown.chain_bonus > 0.0 {
            Self::ChainBonus
        } else {
            Self::TimeWindow
        }
    }

    /// Wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SemanticMatch => "semantic_match",
            Self::ChainBonus => "chain_bonus",
            Self::TimeWindow => "time_window",
        }
    }
}

impl std::fmt::Display for SelectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A selected context with the scores that put it there.
///
/// The scores travel beside the record; the stored record is untouched.
#[derive(Clone, Debug)]
pub struct SelectedContext {
    /// The stored record.
    pub record: Arc<ContextRecord>,
    /// Score components.
    pub breakdown: ScoreBreakdown,
    /// Why it was picked.
    pub selection_reason: SelectionReason,
}

impl SelectedContext {
    /// Tokens this context costs.
    pub fn token_count(&self) -> usize {
        self.record.token_count()
    }
}
