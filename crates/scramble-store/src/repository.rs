//! File-backed context repository.
//!
//! All state lives behind one `RwLock`. Writers (`add`, `reindex`) hold the
//! write lock across their file writes, so the record write and the
//! aggregate-metadata read-modify-write are serialized.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use scramble_core::{ContextId, ContextRecord};
use tracing::{debug, error, info, warn};

use crate::chains;
use crate::errors::{Result, StoreError};
use crate::files;
use crate::metadata::{ConversationSummary, RepositoryMetadata};

/// Window used for the "recent contexts" count in [`ConversationSummary`].
const SUMMARY_RECENT_HOURS: u32 = 24;

#[derive(Default)]
struct State {
    records: HashMap<ContextId, Arc<ContextRecord>>,
    metadata: RepositoryMetadata,
}

impl State {
    /// Records within the last `hours`, newest first.
    fn recent(&self, hours: u32, now: DateTime<Utc>) -> Vec<Arc<ContextRecord>> {
        let cutoff = now - Duration::hours(i64::from(hours));
        let mut recent: Vec<_> = self
            .records
            .values()
            .filter(|r| r.resolved_timestamp() >= cutoff)
            .cloned()
            .collect();
        recent.sort_by(|a, b| newest_first(a, b));
        recent
    }
}

fn newest_first(a: &ContextRecord, b: &ContextRecord) -> Ordering {
    b.resolved_timestamp()
        .cmp(&a.resolved_timestamp())
        .then_with(|| a.id.cmp(&b.id))
}

fn oldest_first(a: &ContextRecord, b: &ContextRecord) -> Ordering {
    a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id))
}

/// Durable store of [`ContextRecord`]s with a chain index.
pub struct Repository {
    dir: PathBuf,
    state: RwLock<State>,
}

impl Repository {
    /// Open (or create) a repository rooted at `dir`.
    ///
    /// Loads aggregate metadata and then every record file. If the metadata
    /// file is missing or unreadable, the index is rebuilt with
    /// [`reindex`](Self::reindex). Unreadable record files are skipped.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

        let repo = Self {
            dir,
            state: RwLock::new(State::default()),
        };

        match files::read_metadata(&repo.dir) {
            Ok(Some(metadata)) => {
                let records = files::load_records(&repo.dir)?;
                let mut state = repo.state.write();
                state.records = records
                    .into_iter()
                    .map(|r| (r.id.clone(), Arc::new(r)))
                    .collect();
                state.metadata = metadata;
                info!(
                    path = %repo.dir.display(),
                    contexts = state.records.len(),
                    "opened context repository"
                );
            }
            Ok(None) => {
                info!(path = %repo.dir.display(), "metadata missing, rebuilding index");
                let _ = repo.reindex()?;
            }
            Err(e) => {
                warn!(path = %repo.dir.display(), error = %e, "metadata corrupted, rebuilding index");
                let _ = repo.reindex()?;
            }
        }

        Ok(repo)
    }

    /// Directory holding the record files.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Persist a record and update the aggregate metadata and chain index.
    ///
    /// Re-adding a stored id overwrites it in place. The counters and chains
    /// are then recomputed from the loaded records, as [`reindex`](Self::reindex)
    /// would.
    ///
    /// Write failures are returned to the caller. If the record file is
    /// written but the metadata write fails, the record is still loaded and
    /// the next [`reindex`](Self::reindex) accounts for it.
    pub fn add(&self, record: ContextRecord) -> Result<Arc<ContextRecord>> {
        let record_path = files::record_path(&self.dir, &record.id)?;
        let mut state = self.state.write();

        let replacing = state.records.contains_key(&record.id);
        if replacing {
            warn!(context_id = %record.id, "replacing existing context record");
        }

        files::write_json_atomic(&record_path, &record).inspect_err(|e| {
            error!(context_id = %record.id, error = %e, "failed to write context record");
        })?;

        let record = Arc::new(record);
        let _ = state.records.insert(record.id.clone(), Arc::clone(&record));

        let mut metadata = state.metadata.clone();
        metadata.last_interaction = Utc::now();
        metadata.current_context_id = Some(record.id.clone());
        if replacing {
            // The parent may have changed, so relink from scratch.
            let mut ordered: Vec<_> = state.records.values().cloned().collect();
            ordered.sort_by(|a, b| oldest_first(a, b));
            metadata.context_chains = chains::rebuild(&ordered);
            metadata.conversation_count = ordered.len();
        } else {
            metadata.conversation_count += 1;
            chains::link(&mut metadata.context_chains, &record.id, record.parent_context());
        }

        files::write_json_atomic(&files::metadata_path(&self.dir), &metadata).inspect_err(|e| {
            error!(context_id = %record.id, error = %e, "failed to write repository metadata");
        })?;
        state.metadata = metadata;

        debug!(
            context_id = %record.id,
            parent = ?record.parent_context().map(ContextId::as_str),
            "added context"
        );
        Ok(record)
    }

    /// Look up one record.
    pub fn get(&self, id: &ContextId) -> Option<Arc<ContextRecord>> {
        self.state.read().records.get(id).cloned()
    }

    /// Every loaded record, oldest first.
    pub fn list(&self) -> Vec<Arc<ContextRecord>> {
        let mut records: Vec<_> = self.state.read().records.values().cloned().collect();
        records.sort_by(|a, b| oldest_first(a, b));
        records
    }

    /// Number of loaded records.
    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    /// Whether no records are loaded.
    pub fn is_empty(&self) -> bool {
        self.state.read().records.is_empty()
    }

    /// Snapshot of the aggregate metadata.
    pub fn metadata(&self) -> RepositoryMetadata {
        self.state.read().metadata.clone()
    }

    /// Most recently added record id.
    pub fn current_context_id(&self) -> Option<ContextId> {
        self.state.read().metadata.current_context_id.clone()
    }

    /// Records whose resolved timestamp falls within the last `hours`,
    /// newest first, truncated to `limit`.
    pub fn get_recent(&self, hours: u32, limit: Option<usize>) -> Vec<Arc<ContextRecord>> {
        let mut recent = self.state.read().recent(hours, Utc::now());
        if let Some(limit) = limit {
            recent.truncate(limit);
        }
        recent
    }

    /// The conversation leading up to `id`, oldest first.
    ///
    /// Follows parent references until a root, a missing parent, or a cycle.
    /// Empty if `id` is not stored.
    pub fn get_chain(&self, id: &ContextId) -> Vec<Arc<ContextRecord>> {
        let state = self.state.read();
        chains::walk(id, |i| state.records.get(i))
    }

    /// Rebuild the index from the record files on disk.
    ///
    /// Reloads every readable record, rebuilds the chains from parent
    /// references, recomputes the counters, and persists fresh metadata.
    /// Returns the number of records found. Safe to rerun after an
    /// interruption.
    pub fn reindex(&self) -> Result<usize> {
        let mut state = self.state.write();
        info!(path = %self.dir.display(), "reindexing context repository");

        let records: HashMap<ContextId, Arc<ContextRecord>> = files::load_records(&self.dir)?
            .into_iter()
            .map(|r| (r.id.clone(), Arc::new(r)))
            .collect();
        let mut ordered: Vec<_> = records.values().cloned().collect();
        ordered.sort_by(|a, b| oldest_first(a, b));

        let mut metadata = state.metadata.clone();
        metadata.context_chains = chains::rebuild(&ordered);
        metadata.conversation_count = ordered.len();
        if let Some(first) = ordered.first() {
            metadata.created_at = metadata.created_at.min(first.created_at);
        }
        if let Some(latest) = ordered.iter().map(|r| r.resolved_timestamp()).max() {
            metadata.last_interaction = latest;
        }
        let current_known = metadata
            .current_context_id
            .as_ref()
            .is_some_and(|id| records.contains_key(id));
        if !current_known {
            metadata.current_context_id = ordered.last().map(|r| r.id.clone());
        }

        files::write_json_atomic(&files::metadata_path(&self.dir), &metadata)?;

        let count = ordered.len();
        info!(
            contexts = count,
            chains = metadata.context_chains.len(),
            "reindex complete"
        );
        state.records = records;
        state.metadata = metadata;
        Ok(count)
    }

    /// Overview of the stored history.
    pub fn conversation_summary(&self) -> ConversationSummary {
        let state = self.state.read();
        ConversationSummary {
            total_contexts: state.records.len(),
            total_conversations: state.metadata.conversation_count,
            last_interaction: state.metadata.last_interaction,
            recent_contexts: state.recent(SUMMARY_RECENT_HOURS, Utc::now()).len(),
            conversation_chains: state.metadata.context_chains.len(),
        }
    }

    /// Earliest and latest resolved timestamps. Both are now if empty.
    pub fn date_range(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let state = self.state.read();
        let timestamps = state.records.values().map(|r| r.resolved_timestamp());
        match (timestamps.clone().min(), timestamps.max()) {
            (Some(start), Some(end)) => (start, end),
            _ => {
                let now = Utc::now();
                (now, now)
            }
        }
    }
}
