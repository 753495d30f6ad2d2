//! Embedding configuration and provider construction.

use std::sync::Arc;

use scramble_settings::{EmbeddingProvider, EmbeddingSettings};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{EmbeddingError, Result};
use crate::service::{EmbeddingService, MockEmbeddingService};
use crate::term_hash::TermHashEmbeddingService;

/// Configuration for the embedding provider.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbeddingConfig {
    /// Provider implementation.
    pub provider: EmbeddingProvider,
    /// Output dimensions.
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self::from_settings(&EmbeddingSettings::default())
    }
}

impl EmbeddingConfig {
    /// Create config from settings.
    pub fn from_settings(s: &EmbeddingSettings) -> Self {
        Self {
            provider: s.provider,
            dimensions: s.dimensions,
        }
    }
}

/// Build the configured provider behind the trait object the pipeline uses.
pub fn build_service(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingService>> {
    if config.dimensions == 0 {
        return Err(EmbeddingError::Config("dimensions must be > 0".into()));
    }
    debug!(provider = ?config.provider, dimensions = config.dimensions, "building embedding service");
    let service: Arc<dyn EmbeddingService> = match config.provider {
        EmbeddingProvider::TermHash => Arc::new(TermHashEmbeddingService::new(config.dimensions)?),
        EmbeddingProvider::Mock => Arc::new(MockEmbeddingService::new(config.dimensions)),
    };
    Ok(service)
}
