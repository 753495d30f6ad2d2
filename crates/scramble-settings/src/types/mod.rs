//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and `#[serde(default)]`,
//! so a partial JSON file only needs the keys it changes.

mod compression;
mod selection;

pub use compression::*;
pub use selection::*;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "compression": { "level": "HIGH" },
///   "selection": { "maxTokens": 2000 }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScrambleSettings {
    /// Chunking and compression.
    pub compression: CompressionSettings,
    /// Embedding provider.
    pub embedding: EmbeddingSettings,
    /// Context repository location.
    pub store: StoreSettings,
    /// Scoring and budget for context selection.
    pub selection: SelectionSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl ScrambleSettings {
    /// Reject values no component can work with.
    pub fn validate(&self) -> Result<()> {
        if self.compression.embedding_batch_size == 0 {
            return Err(SettingsError::InvalidValue(
                "compression.embeddingBatchSize must be > 0".into(),
            ));
        }
        if self.embedding.dimensions == 0 {
            return Err(SettingsError::InvalidValue(
                "embedding.dimensions must be > 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.selection.recency_weight) {
            return Err(SettingsError::InvalidValue(format!(
                "selection.recencyWeight must be within [0, 1], got {}",
                self.selection.recency_weight
            )));
        }
        if self.selection.decay_days <= 0.0 {
            return Err(SettingsError::InvalidValue(
                "selection.decayDays must be > 0".into(),
            ));
        }
        if self.selection.chain_bonus < 0.0 {
            return Err(SettingsError::InvalidValue(
                "selection.chainBonus must be >= 0".into(),
            ));
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level or `EnvFilter` directive.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}
