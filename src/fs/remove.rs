//! Deleting build outputs.

use crate::error::{MeldError, Result};
use std::fs;
use std::io;
use std::path::Path;

/// Delete a file if it exists. Returns `true` if something was removed.
pub fn remove_if_exists<P: AsRef<Path>>(path: P) -> Result<bool> {
    let path = path.as_ref();
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(MeldError::UserError(format!(
            "failed to delete '{}': {}",
            path.display(),
            e
        ))),
    }
}

/// Delete every file directly inside `dir`, creating `dir` if it is missing.
///
/// Subdirectories are left alone.
pub fn clear_dir<P: AsRef<Path>>(dir: P) -> Result<usize> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|e| {
        MeldError::UserError(format!(
            "failed to create directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    let entries = fs::read_dir(dir).map_err(|e| {
        MeldError::UserError(format!(
            "failed to read directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() && remove_if_exists(&path)? {
            removed += 1;
        }
    }
    Ok(removed)
}
