//! Compression levels and their canonical parameter table.
//!
//! | Level  | chunk_size | min_sentence_length | semantic_threshold | length_multiplier | combine_threshold |
//! |--------|-----------:|--------------------:|-------------------:|------------------:|------------------:|
//! | LOW    | 265        | 15                  | 0.95               | 0.9               | 0.8               |
//! | MEDIUM | 64         | 5                   | 0.7                | 0.75              | 0.7               |
//! | HIGH   | 16         | 2                   | 0.3                | 0.25              | 0.4               |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Named compression level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CompressionLevel {
    /// Large chunks, conservative sentence splitting.
    Low,
    /// Balanced chunking.
    #[default]
    Medium,
    /// Tiny chunks, split at every terminator.
    High,
}

/// Tunable parameters for one compression level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelParams {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Accumulated sentence length required before a terminator may split.
    pub min_sentence_length: usize,
    /// Similarity considered semantically equivalent at this level.
    pub semantic_threshold: f32,
    /// Controls split aggressiveness and the merged-chunk size bound.
    pub length_multiplier: f32,
    /// Minimum embedding similarity for two adjacent chunks to merge.
    pub combine_threshold: f32,
}

/// How eagerly the chunker splits sentences.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitAggressiveness {
    /// Split at every terminator once the minimum length is reached.
    High,
    /// Split only when the terminator is followed by whitespace.
    Medium,
    /// Like `Medium`, but keep clauses joined by `and`/`or`/`but`.
    Low,
}

impl CompressionLevel {
    /// All levels, least aggressive first.
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    /// Parameter row for this level.
    #[must_use]
    pub const fn params(self) -> LevelParams {
        match self {
            Self::Low => LevelParams {
                chunk_size: 265,
                min_sentence_length: 15,
                semantic_threshold: 0.95,
                length_multiplier: 0.9,
                combine_threshold: 0.8,
            },
            Self::Medium => LevelParams {
                chunk_size: 64,
                min_sentence_length: 5,
                semantic_threshold: 0.7,
                length_multiplier: 0.75,
                combine_threshold: 0.7,
            },
            Self::High => LevelParams {
                chunk_size: 16,
                min_sentence_length: 2,
                semantic_threshold: 0.3,
                length_multiplier: 0.25,
                combine_threshold: 0.4,
            },
        }
    }

    /// Uppercase name as used in settings and metadata.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl LevelParams {
    /// Sentence-split aggressiveness derived from `length_multiplier`.
    #[must_use]
    pub fn aggressiveness(&self) -> SplitAggressiveness {
        if self.length_multiplier <= 0.25 {
            SplitAggressiveness::High
        } else if self.length_multiplier <= 0.75 {
            SplitAggressiveness::Medium
        } else {
            SplitAggressiveness::Low
        }
    }

    /// Largest size a merged chunk may reach: `chunk_size * (2 - length_multiplier)`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn merged_size_bound(&self) -> f64 {
        self.chunk_size as f64 * (2.0 - f64::from(self.length_multiplier))
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown compression level name.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown compression level: {0}")]
pub struct ParseLevelError(pub String);

impl FromStr for CompressionLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}
