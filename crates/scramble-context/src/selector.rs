//! Budgeted selection over scored candidates.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use scramble_compression::{ScoringConfig, rank};
use scramble_core::ContextRecord;
use tracing::debug;

use crate::types::{SelectedContext, SelectionReason};

/// Drop repeated ids, keeping the first occurrence of each.
pub fn dedupe_by_id(candidates: &[Arc<ContextRecord>]) -> Vec<Arc<ContextRecord>> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter(|r| seen.insert(r.id.clone()))
        .cloned()
        .collect()
}

/// Score, sort, and take candidates until the token budget is reached.
///
/// Candidates are deduplicated first. Selection stops at the first candidate
/// that would push the running total past `max_tokens`; nothing after it is
/// considered. `query` is `None` when the message could not be embedded.
pub fn select(
    query: Option<&[f32]>,
    candidates: &[Arc<ContextRecord>],
    now: DateTime<Utc>,
    config: &ScoringConfig,
    max_tokens: usize,
) -> Vec<SelectedContext> {
    let unique = dedupe_by_id(candidates);
    let ranked = rank(query, &unique, now, config);

    let mut selected = Vec::new();
    let mut used = 0usize;
    for scored in ranked {
        let tokens = scored.record.token_count();
        let Some(total) = used.checked_add(tokens).filter(|t| *t <= max_tokens) else {
            debug!(
                context_id = %scored.record.id.short(),
                tokens,
                used,
                max_tokens,
                "token budget reached"
            );
            break;
        };
        used = total;
        selected.push(SelectedContext {
            selection_reason: SelectionReason::from_breakdown(&scored.breakdown),
            breakdown: scored.breakdown,
            record: scored.record,
        });
    }

    debug!(
        candidates = candidates.len(),
        unique = unique.len(),
        selected = selected.len(),
        tokens = used,
        "selected contexts"
    );
    selected
}
