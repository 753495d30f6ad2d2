//! On-disk layout: `<id>.ctx` record files and `metadata.json`.
//!
//! Every write lands in a `.tmp` sibling first and is renamed into place, so a
//! reader never observes a partially written file.

use std::fs;
use std::path::{Path, PathBuf};

use scramble_core::{ContextId, ContextRecord};
use serde::Serialize;
use tracing::{debug, warn};

use crate::errors::{Result, StoreError};
use crate::metadata::RepositoryMetadata;

/// Extension of record files.
pub const RECORD_EXTENSION: &str = "ctx";

/// Aggregate metadata file name.
pub const METADATA_FILE: &str = "metadata.json";

const TEMP_EXTENSION: &str = "tmp";

/// Path of a record file, rejecting ids that would escape the directory.
pub fn record_path(dir: &Path, id: &ContextId) -> Result<PathBuf> {
    let name = id.as_str();
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(&['/', '\\', '\0'][..]);
    if !valid {
        return Err(StoreError::InvalidId(id.to_string()));
    }
    Ok(dir.join(format!("{id}.{RECORD_EXTENSION}")))
}

/// Path of the aggregate metadata file.
pub fn metadata_path(dir: &Path) -> PathBuf {
    dir.join(METADATA_FILE)
}

/// Serialize `value` as pretty JSON and atomically replace `path`.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| StoreError::json(path, e))?;
    let temp = path.with_extension(TEMP_EXTENSION);
    fs::write(&temp, &bytes).map_err(|e| StoreError::io(&temp, e))?;
    if let Err(e) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err(StoreError::io(path, e));
    }
    Ok(())
}

/// Read one record file.
pub fn read_record(path: &Path) -> Result<ContextRecord> {
    let bytes = fs::read(path).map_err(|e| StoreError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| StoreError::json(path, e))
}

/// Read aggregate metadata.
///
/// `Ok(None)` means the file does not exist. A file that exists but cannot
/// be read or parsed is a [`StoreError::Metadata`].
pub fn read_metadata(dir: &Path) -> Result<Option<RepositoryMetadata>> {
    let path = metadata_path(dir);
    let bytes = match fs::read(&path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::Metadata(format!("{}: {e}", path.display()))),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| StoreError::Metadata(format!("{}: {e}", path.display())))
}

/// Record files in `dir`, sorted by name.
pub fn record_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| StoreError::io(dir, e))?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io(dir, e))?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == RECORD_EXTENSION) && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Load every readable record in `dir`.
///
/// Unreadable files are logged and skipped. A record whose stored id differs
/// from its file name is kept under its stored id.
pub fn load_records(dir: &Path) -> Result<Vec<ContextRecord>> {
    let paths = record_files(dir)?;
    let mut records = Vec::with_capacity(paths.len());
    for path in paths {
        match read_record(&path) {
            Ok(record) => {
                if !record.is_consistent() {
                    warn!(
                        context_id = %record.id,
                        chunks = record.chunks.len(),
                        embeddings = record.embeddings.len(),
                        "record has mismatched embeddings"
                    );
                }
                records.push(record);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable context record"),
        }
    }
    debug!(dir = %dir.display(), count = records.len(), "loaded context records");
    Ok(records)
}
