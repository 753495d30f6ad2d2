//! # scramble-settings
//!
//! Configuration with layered sources for the Scramble context memory.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`ScrambleSettings::default()`]
//! 2. **User file**: `~/.scramble/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `SCRAMBLE_*` overrides (highest priority)
//!
//! There is no global instance. The application loads settings once and passes
//! the relevant sections to the components it builds.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides_with, deep_merge, load_settings, load_settings_from_path,
    settings_path,
};
pub use types::*;
