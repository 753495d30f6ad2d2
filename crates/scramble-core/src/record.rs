//! Context record data model.
//!
//! A [`ContextRecord`] is the persisted unit of compressed dialogue: ordered
//! chunks, one embedding per chunk, and a metadata map. Records are immutable
//! once created; scoring annotations produced during a query live in separate
//! result types and are never written back.
//!
//! The on-disk form is a versioned JSON document (`schema_version`).
//! Embeddings are stored as base64 little-endian f32 blobs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::blob;
use crate::ids::ContextId;
use crate::level::CompressionLevel;

/// Current persisted record schema version.
pub const CONTEXT_SCHEMA_VERSION: u32 = 1;

/// Who produced a chunk of dialogue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// Lines introduced by `Human: `.
    User,
    /// Lines introduced by `Assistant: `.
    Assistant,
}

impl Speaker {
    /// Transcript marker that introduces this speaker's lines.
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::User => "Human:",
            Self::Assistant => "Assistant:",
        }
    }

    /// Split a leading speaker marker off a line.
    ///
    /// The marker must be followed by whitespace or end the line, so
    /// `"Humane: x"` is not a marker. The returned remainder is trimmed.
    #[must_use]
    pub fn strip_marker(line: &str) -> Option<(Self, &str)> {
        for speaker in [Self::User, Self::Assistant] {
            if let Some(rest) = line.strip_prefix(speaker.marker()) {
                if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                    return Some((speaker, rest.trim()));
                }
            }
        }
        None
    }
}

/// A size-bounded segment of dialogue text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Chunk text.
    pub content: String,
    /// Speaker, if the text was attributed.
    pub speaker: Option<Speaker>,
    /// Character length of `content`.
    pub size: usize,
}

impl ChunkRecord {
    /// Create a chunk, computing `size` from the content.
    pub fn new(content: impl Into<String>, speaker: Option<Speaker>) -> Self {
        let content = content.into();
        let size = content.chars().count();
        Self {
            content,
            speaker,
            size,
        }
    }

    /// Empty marker chunk used by degenerate records.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(String::new(), None)
    }

    /// Append `other`'s text separated by one space.
    pub fn absorb(&mut self, other: &ChunkRecord) {
        if other.content.is_empty() {
            return;
        }
        if !self.content.is_empty() {
            self.content.push(' ');
            self.size += 1;
        }
        self.content.push_str(&other.content);
        self.size += other.size;
    }
}

/// Error tag attached to degraded records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorTag {
    /// Input was empty or whitespace-only.
    EmptyInput,
    /// Chunking produced nothing for non-empty input.
    NoChunksProduced,
    /// Chunks were produced but contained no text.
    ZeroCompressedLength,
    /// The embedding provider failed for the record's chunks.
    EmbeddingFailed,
}

impl ErrorTag {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmptyInput => "empty_input",
            Self::NoChunksProduced => "no_chunks_produced",
            Self::ZeroCompressedLength => "zero_compressed_length",
            Self::EmbeddingFailed => "embedding_failed",
        }
    }
}

/// String-keyed record metadata.
///
/// Well-known keys are typed; anything else a caller supplies is preserved in
/// `extra` and round-trips verbatim.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextMetadata {
    /// When the exchange was compressed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Previous context in the same conversation thread (may be dangling).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_context: Option<ContextId>,
    /// Original character length divided by compressed character length.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_ratio: Option<f64>,
    /// Cosine similarity of original and compressed text embeddings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_similarity: Option<f64>,
    /// Character length of the raw input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_length: Option<usize>,
    /// Character length of all chunk contents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compressed_length: Option<usize>,
    /// Whitespace token count of the raw input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_tokens: Option<usize>,
    /// Whitespace token count of the compressed text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compressed_tokens: Option<usize>,
    /// Level the record was compressed at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_level: Option<CompressionLevel>,
    /// Set when compression degraded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorTag>,
    /// Caller-supplied keys with no typed slot.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContextMetadata {
    /// Metadata for a degraded record.
    #[must_use]
    pub fn with_error(tag: ErrorTag) -> Self {
        Self {
            timestamp: Some(Utc::now()),
            error: Some(tag),
            ..Self::default()
        }
    }

    /// Overlay caller-supplied keys on top of computed values.
    ///
    /// Each key is applied independently. A value whose type does not fit its
    /// typed slot (for example a non-RFC 3339 `timestamp`) is logged and
    /// dropped, leaving the computed value in place.
    pub fn overlay(&mut self, caller: Map<String, Value>) {
        for (key, value) in caller {
            let Ok(Value::Object(mut candidate)) = serde_json::to_value(&*self) else {
                return;
            };
            let _ = candidate.insert(key.clone(), value);
            match serde_json::from_value::<Self>(Value::Object(candidate)) {
                Ok(merged) => *self = merged,
                Err(e) => warn!(key = %key, error = %e, "ignoring caller metadata with invalid type"),
            }
        }
    }
}

/// A compressed exchange: chunks, their embeddings, and metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContextRecord {
    /// Persisted schema version.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Unique identifier.
    pub id: ContextId,
    /// One vector per chunk, in chunk order.
    #[serde(with = "blob::vectors")]
    pub embeddings: Vec<Vec<f32>>,
    /// Ordered chunks.
    pub chunks: Vec<ChunkRecord>,
    /// Metadata map.
    #[serde(default)]
    pub metadata: ContextMetadata,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

fn default_schema_version() -> u32 {
    CONTEXT_SCHEMA_VERSION
}

impl ContextRecord {
    /// Assemble a record created now.
    pub fn new(
        id: ContextId,
        chunks: Vec<ChunkRecord>,
        embeddings: Vec<Vec<f32>>,
        metadata: ContextMetadata,
    ) -> Self {
        let now = Utc::now();
        Self {
            schema_version: CONTEXT_SCHEMA_VERSION,
            id,
            embeddings,
            chunks,
            metadata,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether there is exactly one embedding per chunk.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.embeddings.len() == self.chunks.len()
    }

    /// Parent context reference, if any.
    #[must_use]
    pub fn parent_context(&self) -> Option<&ContextId> {
        self.metadata.parent_context.as_ref()
    }

    /// Timestamp used for recency and windows: metadata timestamp, else `created_at`.
    #[must_use]
    pub fn resolved_timestamp(&self) -> DateTime<Utc> {
        self.metadata.timestamp.unwrap_or(self.created_at)
    }

    /// Chunk contents joined with single spaces.
    #[must_use]
    pub fn text_content(&self) -> String {
        self.chunks
            .iter()
            .map(|c| c.content.as_str())
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Tokens this record contributes to a prompt budget.
    ///
    /// Uses the recorded compressed token count when present, otherwise
    /// counts whitespace-separated tokens of the chunk text.
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.metadata.compressed_tokens.unwrap_or_else(|| {
            self.chunks
                .iter()
                .map(|c| c.content.split_whitespace().count())
                .sum()
        })
    }
}
