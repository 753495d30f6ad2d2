//! Compression, embedding, and storage settings.

use std::path::PathBuf;

use scramble_core::CompressionLevel;
use serde::{Deserialize, Serialize};

/// Chunking and compression settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompressionSettings {
    /// Active parameter row.
    pub level: CompressionLevel,
    /// Chunks embedded per provider call.
    pub embedding_batch_size: usize,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            level: CompressionLevel::Medium,
            embedding_batch_size: 32,
        }
    }
}

/// Which embedding provider to build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EmbeddingProvider {
    /// Vocabulary-sensitive feature hashing.
    #[default]
    TermHash,
    /// Content-hash vectors with no semantic structure.
    Mock,
}

/// Embedding provider settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbeddingSettings {
    /// Provider implementation.
    pub provider: EmbeddingProvider,
    /// Output vector dimensions.
    pub dimensions: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::TermHash,
            dimensions: 512,
        }
    }
}

/// Context repository settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSettings {
    /// Storage directory; a leading `~` expands to `$HOME`.
    pub path: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: "~/.scramble/store".to_string(),
        }
    }
}

impl StoreSettings {
    /// Storage directory with `~` expanded.
    pub fn resolved_path(&self) -> PathBuf {
        expand_home(&self.path)
    }
}

fn expand_home(path: &str) -> PathBuf {
    let home = || std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    if path == "~" {
        PathBuf::from(home())
    } else if let Some(rest) = path.strip_prefix("~/") {
        PathBuf::from(home()).join(rest)
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_path_unchanged() {
        let store = StoreSettings {
            path: "/var/lib/scramble".into(),
        };
        assert_eq!(store.resolved_path(), PathBuf::from("/var/lib/scramble"));
    }

    #[test]
    fn tilde_expands() {
        let resolved = StoreSettings::default().resolved_path();
        assert!(resolved.ends_with(".scramble/store"));
        assert!(!resolved.to_string_lossy().starts_with('~'));
    }

    #[test]
    fn provider_names() {
        let json = serde_json::to_string(&EmbeddingProvider::Mock).unwrap();
        assert_eq!(json, "\"mock\"");
        let back: EmbeddingProvider = serde_json::from_str("\"termHash\"").unwrap();
        assert_eq!(back, EmbeddingProvider::TermHash);
    }
}
