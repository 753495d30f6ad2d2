//! Context manager: candidate assembly and selection over a repository.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use scramble_compression::ranking::embed_query;
use scramble_compression::{Compressor, ScoringConfig, rank};
use scramble_core::{ContextId, ContextRecord};
use scramble_embeddings::{EmbeddingConfig, EmbeddingService, build_service};
use scramble_settings::{ScrambleSettings, SelectionSettings};
use scramble_store::Repository;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::errors::Result;
use crate::selector::select;
use crate::temporal::parse_time_reference;
use crate::types::SelectedContext;

/// Chooses which stored contexts accompany a new message.
pub struct ContextManager {
    repository: Arc<Repository>,
    embedder: Arc<dyn EmbeddingService>,
    selection: SelectionSettings,
}

impl ContextManager {
    /// Manager over `repository` with default selection settings.
    pub fn new(repository: Arc<Repository>, embedder: Arc<dyn EmbeddingService>) -> Self {
        Self {
            repository,
            embedder,
            selection: SelectionSettings::default(),
        }
    }

    /// Open the configured store and build the configured provider.
    pub fn from_settings(settings: &ScrambleSettings) -> Result<Self> {
        let embedder = build_service(&EmbeddingConfig::from_settings(&settings.embedding))?;
        let repository = Arc::new(Repository::open(settings.store.resolved_path())?);
        info!(
            path = %repository.path().display(),
            contexts = repository.len(),
            "context manager ready"
        );
        Ok(Self::new(repository, embedder).with_selection(settings.selection.clone()))
    }

    /// Replace the selection settings.
    #[must_use]
    pub fn with_selection(mut self, selection: SelectionSettings) -> Self {
        self.selection = selection;
        self
    }

    /// Selection settings in use.
    pub fn selection(&self) -> &SelectionSettings {
        &self.selection
    }

    /// Underlying repository.
    pub fn repository(&self) -> &Arc<Repository> {
        &self.repository
    }

    /// Embedding provider used for queries.
    pub fn embedder(&self) -> &Arc<dyn EmbeddingService> {
        &self.embedder
    }

    fn scoring(&self) -> ScoringConfig {
        ScoringConfig::from_settings(&self.selection)
    }

    /// Score `candidates` against `message` and fill the token budget.
    ///
    /// If the message cannot be embedded, semantic scores are 0.0 and
    /// selection proceeds on recency and chain bonus.
    pub async fn select_contexts(
        &self,
        message: &str,
        candidates: &[Arc<ContextRecord>],
    ) -> Vec<SelectedContext> {
        if candidates.is_empty() {
            return Vec::new();
        }
        let query = embed_query(self.embedder.as_ref(), message).await;
        select(
            query.as_deref(),
            candidates,
            Utc::now(),
            &self.scoring(),
            self.selection.max_tokens,
        )
    }

    /// Records created near the time `query` refers to.
    ///
    /// Empty when `query` holds no recognizable time reference.
    pub fn find_contexts_by_timeframe(&self, query: &str) -> Vec<Arc<ContextRecord>> {
        self.find_contexts_by_timeframe_at(query, Utc::now())
    }

    /// [`find_contexts_by_timeframe`](Self::find_contexts_by_timeframe)
    /// resolved against an explicit `now`.
    pub fn find_contexts_by_timeframe_at(
        &self,
        query: &str,
        now: DateTime<Utc>,
    ) -> Vec<Arc<ContextRecord>> {
        let Some(reference) = parse_time_reference(query, now) else {
            return Vec::new();
        };
        let matches = self.created_near(reference.anchor);
        debug!(
            phrase = %reference.phrase,
            anchor = %reference.anchor,
            matches = matches.len(),
            "resolved time reference"
        );
        matches
    }

    /// Records whose `created_at` lies within the timeframe window of `anchor`.
    fn created_near(&self, anchor: DateTime<Utc>) -> Vec<Arc<ContextRecord>> {
        let window = TimeDelta::try_hours(i64::from(self.selection.timeframe_window_hours))
            .unwrap_or_default();
        let start = anchor.checked_sub_signed(window).unwrap_or(anchor);
        let end = anchor.checked_add_signed(window).unwrap_or(anchor);
        self.repository
            .list()
            .into_iter()
            .filter(|r| start <= r.created_at && r.created_at <= end)
            .collect()
    }

    /// Select contexts for a new message.
    ///
    /// Candidates, in order: records near a time reference in the message,
    /// the top `similar_top_k` semantic matches over the whole repository,
    /// and records from the last `recent_hours`. Duplicates keep their first
    /// position. The message is embedded once.
    pub async fn process_message(&self, message: &str) -> Vec<SelectedContext> {
        let now = Utc::now();
        let scoring = self.scoring();
        let query = embed_query(self.embedder.as_ref(), message).await;

        let mut candidates = Vec::new();
        if let Some(reference) = parse_time_reference(message, now) {
            let near = self.created_near(reference.anchor);
            debug!(phrase = %reference.phrase, matches = near.len(), "temporal candidates");
            candidates.extend(near);
        }

        let mut similar = rank(query.as_deref(), &self.repository.list(), now, &scoring);
        similar.truncate(self.selection.similar_top_k);
        candidates.extend(similar.into_iter().map(|s| s.record));

        candidates.extend(self.repository.get_recent(self.selection.recent_hours, None));

        select(
            query.as_deref(),
            &candidates,
            now,
            &scoring,
            self.selection.max_tokens,
        )
    }

    /// Compress an exchange and store it as a child of the current context.
    pub async fn record_exchange(
        &self,
        compressor: &Compressor,
        text: &str,
    ) -> Result<Arc<ContextRecord>> {
        let mut metadata = Map::new();
        if let Some(parent) = self.repository.current_context_id() {
            let _ = metadata.insert("parent_context".into(), Value::String(parent.into_inner()));
        }
        let record = compressor.compress(text, Some(metadata)).await;
        Ok(self.repository.add(record)?)
    }

    /// The conversation leading up to `id`, oldest first.
    pub fn get_conversation_chain(&self, id: &ContextId) -> Vec<Arc<ContextRecord>> {
        self.repository.get_chain(id)
    }
}
