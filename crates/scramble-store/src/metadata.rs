//! Aggregate repository metadata.

use chrono::{DateTime, Utc};
use scramble_core::ContextId;
use serde::{Deserialize, Serialize};

/// Counters and chain index persisted as `metadata.json`.
///
/// Everything here can be recomputed from the record files, which is what
/// [`Repository::reindex`](crate::Repository::reindex) does.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RepositoryMetadata {
    /// When the repository was first created.
    pub created_at: DateTime<Utc>,
    /// Most recent add.
    pub last_interaction: DateTime<Utc>,
    /// Number of records added.
    pub conversation_count: usize,
    /// Conversation threads, each an ordered list of ids.
    #[serde(default)]
    pub context_chains: Vec<Vec<ContextId>>,
    /// Most recently added record.
    #[serde(default)]
    pub current_context_id: Option<ContextId>,
}

impl RepositoryMetadata {
    /// Fresh metadata for an empty repository.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            last_interaction: now,
            conversation_count: 0,
            context_chains: Vec::new(),
            current_context_id: None,
        }
    }
}

impl Default for RepositoryMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// Overview of the stored history.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConversationSummary {
    /// Records currently loaded.
    pub total_contexts: usize,
    /// Records ever added, per aggregate metadata.
    pub total_conversations: usize,
    /// Most recent add.
    pub last_interaction: DateTime<Utc>,
    /// Records from the last 24 hours.
    pub recent_contexts: usize,
    /// Number of conversation chains.
    pub conversation_chains: usize,
}
