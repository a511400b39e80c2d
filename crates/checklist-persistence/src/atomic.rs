//! Atomic file operations for crash-safe persistence.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{PersistenceError, Result};

/// Writes data to a file atomically.
///
/// The data is written to a temporary file in the target's directory and
/// then renamed over the target, so readers see either the old or the new
/// content and never a truncated file.
///
/// # Errors
/// Returns an error if the write or rename fails. The previous file is left
/// untouched in that case.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let temp_file = write_temp(path, data)?;
    commit(temp_file, path)
}

/// Writes data to a synced temporary file next to `path` without replacing it.
///
/// Dropping the returned handle deletes the temporary file and leaves `path`
/// as it was.
pub fn write_temp(path: &Path, data: &[u8]) -> Result<NamedTempFile> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|source| PersistenceError::DirectoryError {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    // Same directory so the rename never crosses filesystems
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let write_err = |source| PersistenceError::WriteError {
        path: path.to_path_buf(),
        source,
    };

    let mut temp_file = NamedTempFile::new_in(dir).map_err(write_err)?;
    temp_file.write_all(data).map_err(write_err)?;
    temp_file.flush().map_err(write_err)?;
    temp_file.as_file().sync_all().map_err(write_err)?;

    Ok(temp_file)
}

/// Renames a temporary file produced by [`write_temp`] over `path`.
pub fn commit(temp_file: NamedTempFile, path: &Path) -> Result<()> {
    temp_file
        .persist(path)
        .map_err(|e| PersistenceError::WriteError {
            path: path.to_path_buf(),
            source: e.error,
        })?;
    Ok(())
}

/// Writes JSON data to a file atomically.
pub fn atomic_write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    atomic_write(path, json.as_bytes())
}

/// Reads and deserializes a JSON file.
///
/// A missing or unreadable file is a [`PersistenceError::ReadError`]; bad
/// JSON is a [`PersistenceError::SerializeError`].
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(|source| PersistenceError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_slice(&bytes)?)
}
