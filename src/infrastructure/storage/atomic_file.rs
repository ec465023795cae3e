//! JSON files that are replaced, never rewritten in place.
//!
//! Writers serialise into a temporary file in the destination directory,
//! fsync it, then rename it over the canonical path. Readers therefore see
//! either the old document or the new one. A crash before the rename leaves
//! a stray temp file and the previous document untouched.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

use crate::domain::errors::PersistenceError;

/// Read and parse `path`.
///
/// Returns `Ok(None)` when the file does not exist. Any other I/O failure is
/// [`PersistenceError::Read`]; a file that exists but does not parse
/// (including an empty one) is [`PersistenceError::Corrupt`].
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, PersistenceError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(PersistenceError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| PersistenceError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
}

/// Atomically replace `path` with the pretty-printed JSON of `value`.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistenceError> {
    let write_err = |source: io::Error| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(write_err)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    serde_json::to_writer_pretty(&mut tmp, value).map_err(|e| write_err(e.into()))?;
    tmp.write_all(b"\n").map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;

    // Commit point.
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}
