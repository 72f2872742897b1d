//! Build context resolution for meld.
//!
//! This module finds the build root from any working directory and resolves
//! the fixed layout of meld's working state under it:
//!
//! ```text
//! {root}/.meld/
//!   config.yaml
//!   manifest.json            driver writes one target's manifest here
//!   export/                  driver exports action files here
//!   logs/                    archived action files, manifests, tool output
//!     combined.graph.json    the graph handed to the backend
//!   events/events.ndjson
//! ```
//!
//! All meld commands use this module so they agree on where state lives
//! regardless of where the command is invoked from.

use crate::error::{MeldError, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Working directory name relative to the build root.
pub const DEFAULT_WORK_DIR: &str = ".meld";

/// File name of the persisted combined graph.
pub const COMBINED_GRAPH_FILE: &str = "combined.graph.json";

/// Resolved paths for one build. All paths are absolute.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Directory containing `.meld/`; collaborators run with this as their working directory.
    pub root: PathBuf,

    /// Absolute path to the working state directory (default: `{root}/.meld/`).
    pub work_dir: PathBuf,

    /// Absolute path to the logs directory (default: `{root}/.meld/logs/`).
    pub logs_dir: PathBuf,

    /// Absolute path to the driver export directory (default: `{root}/.meld/export/`).
    pub export_dir: PathBuf,
}

impl BuildContext {
    /// Resolve the build context from the current working directory.
    pub fn resolve() -> Result<Self> {
        let cwd = env::current_dir().map_err(|e| {
            MeldError::UserError(format!("failed to get current working directory: {}", e))
        })?;

        Self::resolve_from(&cwd)
    }

    /// Resolve the build context from a specific directory.
    ///
    /// The root is the nearest ancestor of `cwd` (inclusive) containing a
    /// `.meld` directory. If there is none, `cwd` itself becomes the root.
    pub fn resolve_from<P: AsRef<Path>>(cwd: P) -> Result<Self> {
        let cwd = cwd.as_ref();
        let cwd = if cwd.is_absolute() {
            cwd.to_path_buf()
        } else {
            env::current_dir()
                .map_err(|e| {
                    MeldError::UserError(format!("failed to get current working directory: {}", e))
                })?
                .join(cwd)
        };

        let root = cwd
            .ancestors()
            .find(|dir| dir.join(DEFAULT_WORK_DIR).is_dir())
            .unwrap_or(cwd.as_path())
            .to_path_buf();

        Ok(Self::at(root))
    }

    /// Context rooted exactly at `root`, without searching.
    pub fn at<P: Into<PathBuf>>(root: P) -> Self {
        let root = root.into();
        let work_dir = root.join(DEFAULT_WORK_DIR);
        let logs_dir = work_dir.join("logs");
        let export_dir = work_dir.join("export");

        Self {
            root,
            work_dir,
            logs_dir,
            export_dir,
        }
    }

    /// Check if `.meld/` exists.
    pub fn is_initialized(&self) -> bool {
        self.work_dir.is_dir()
    }

    /// Get the path to the config file.
    pub fn config_path(&self) -> PathBuf {
        self.work_dir.join("config.yaml")
    }

    /// Get the path to the events directory.
    pub fn events_dir(&self) -> PathBuf {
        self.work_dir.join("events")
    }

    /// Get the path to the main events log file.
    pub fn events_file(&self) -> PathBuf {
        self.events_dir().join("events.ndjson")
    }

    /// Where the combined graph is persisted for the backend.
    pub fn graph_file(&self) -> PathBuf {
        self.logs_dir.join(COMBINED_GRAPH_FILE)
    }

    /// Where the driver is told to write a target's manifest.
    pub fn manifest_path(&self) -> PathBuf {
        self.work_dir.join("manifest.json")
    }

    /// First `{logs_dir}/{stem}.{n}.{extension}` that does not exist yet.
    pub fn unique_log_path(&self, stem: &str, extension: &str) -> PathBuf {
        (0..)
            .map(|n| self.logs_dir.join(format!("{}.{}.{}", stem, n, extension)))
            .find(|p| !p.exists())
            .unwrap_or_else(|| self.logs_dir.join(format!("{}.{}", stem, extension)))
    }

    /// Create the logs, export and events directories.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.logs_dir.clone(), self.export_dir.clone(), self.events_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                MeldError::UserError(format!(
                    "failed to create directory '{}': {}",
                    dir.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }
}

/// Convenience function to resolve context from the working directory or an explicit root.
pub fn resolve_context(root: Option<&Path>) -> Result<BuildContext> {
    match root {
        Some(root) => BuildContext::resolve_from(root),
        None => BuildContext::resolve(),
    }
}
