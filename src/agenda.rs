//! Build targets and the agenda that orders them.
//!
//! An agenda is usually written as YAML:
//!
//! ```yaml
//! allow_retries: true
//! targets:
//!   - name: UnrealHeaderTool
//!     platform: Win64
//!     configuration: Development
//!   - name: Game
//!     platform: Win64
//!     configuration: Shipping
//!     project: /work/Game/Game.uproject
//!     args: -monolithic
//! ```

use crate::error::{MeldError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// One thing to build: a target in a platform/configuration pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildTarget {
    /// Target name as the compiler driver knows it.
    pub name: String,
    /// Platform identifier (e.g. `Win64`, `Linux`).
    pub platform: String,
    /// Configuration identifier (e.g. `Development`, `Shipping`).
    pub configuration: String,
    /// Project file, for targets that live outside the engine tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<PathBuf>,
    /// Extra arguments handed to the driver verbatim.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub args: String,
}

impl BuildTarget {
    pub fn new(
        name: impl Into<String>,
        platform: impl Into<String>,
        configuration: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            platform: platform.into(),
            configuration: configuration.into(),
            project: None,
            args: String::new(),
        }
    }

    pub fn with_project(mut self, project: impl Into<PathBuf>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_args(mut self, args: impl Into<String>) -> Self {
        self.args = args.into();
        self
    }

    /// Label used for tool grouping and log records: `name-platform-configuration`.
    pub fn caption(&self) -> String {
        format!("{}-{}-{}", self.name, self.platform, self.configuration)
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.caption())
    }
}

/// Ordered list of targets plus the flags that govern one build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildAgenda {
    pub targets: Vec<BuildTarget>,

    /// Allow a second distributed attempt after a failed one.
    pub allow_retries: bool,

    /// Reserved for experiments; recorded in the event log only.
    pub special_test_flag: bool,
}

impl BuildAgenda {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one target.
    pub fn add_target(&mut self, target: BuildTarget) {
        self.targets.push(target);
    }

    /// Append several targets sharing a platform, configuration, project and args.
    pub fn add_targets<I, S>(
        &mut self,
        names: I,
        platform: &str,
        configuration: &str,
        project: Option<&Path>,
        args: &str,
    ) where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let mut target = BuildTarget::new(name, platform, configuration).with_args(args);
            target.project = project.map(Path::to_path_buf);
            self.targets.push(target);
        }
    }

    /// Load an agenda from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            MeldError::UserError(format!(
                "failed to read agenda file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse an agenda from YAML. An agenda without targets is rejected.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let agenda: BuildAgenda = serde_yaml::from_str(yaml)
            .map_err(|e| MeldError::UserError(format!("failed to parse agenda YAML: {}", e)))?;

        if agenda.targets.is_empty() {
            return Err(MeldError::UserError(
                "agenda has no targets; add at least one entry under 'targets'".to_string(),
            ));
        }
        Ok(agenda)
    }
}
