//! Reading action files and persisting the combined graph.

use super::model::{ActionFile, CombinedGraph};
use crate::error::{MeldError, Result};
use crate::fs::atomic_write_file;
use std::fs;
use std::path::{Path, PathBuf};

/// Load one action file exported by the compiler driver.
pub fn load_action_file<P: AsRef<Path>>(path: P) -> Result<ActionFile> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(MeldError::DriverError(format!(
            "couldn't find action file '{}'",
            path.display()
        )));
    }

    let content = fs::read_to_string(path).map_err(|e| {
        MeldError::DriverError(format!(
            "failed to read action file '{}': {}",
            path.display(),
            e
        ))
    })?;

    let mut file: ActionFile = serde_json::from_str(&content).map_err(|e| {
        MeldError::DriverError(format!(
            "failed to parse action file '{}': {}",
            path.display(),
            e
        ))
    })?;
    file.origin = path.to_path_buf();
    Ok(file)
}

/// Write the combined graph as pretty JSON, atomically.
pub fn write_combined_graph<P: AsRef<Path>>(path: P, graph: &CombinedGraph) -> Result<()> {
    let json = serde_json::to_string_pretty(graph).map_err(|e| {
        MeldError::UserError(format!("failed to serialize combined graph: {}", e))
    })?;
    atomic_write_file(path, &json)
}

/// Read a combined graph previously written by [`write_combined_graph`].
pub fn read_combined_graph<P: AsRef<Path>>(path: P) -> Result<CombinedGraph> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        MeldError::UserError(format!(
            "failed to read combined graph '{}': {}",
            path.display(),
            e
        ))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        MeldError::UserError(format!(
            "failed to parse combined graph '{}': {}",
            path.display(),
            e
        ))
    })
}

/// Copy each source action file next to the graph file as `{graph file}.{source name}`.
///
/// Sources without a readable origin (built in memory) are skipped.
pub fn archive_sources(graph_file: &Path, sources: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut archived = Vec::new();
    for source in sources {
        let Some(name) = source.file_name() else {
            continue;
        };
        if !source.is_file() {
            continue;
        }

        let mut target = graph_file.as_os_str().to_owned();
        target.push(".");
        target.push(name);
        let target = PathBuf::from(target);

        fs::copy(source, &target).map_err(|e| {
            MeldError::UserError(format!(
                "failed to archive action file '{}' to '{}': {}",
                source.display(),
                target.display(),
                e
            ))
        })?;
        archived.push(target);
    }
    Ok(archived)
}
