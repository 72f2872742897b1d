//! Config loading, validation, and utility operations.

use super::model::Config;
use crate::error::{MeldError, Result};
use globset::Glob;
use std::path::Path;
use std::time::Duration;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the config.yaml file
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(MeldError::UserError)` - Parse error or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            MeldError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config from `path`, or fall back to defaults if it does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a YAML string.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| MeldError::UserError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| MeldError::UserError(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `driver_program` and `distributed_tool_name` must be non-empty
    /// - `export_glob` must be a valid glob
    /// - `work_began_marker` must be non-empty
    /// - `transient_exit_codes` must not contain 0
    /// - `distributed_args` must reference `{graph_file}`
    pub fn validate(&self) -> Result<()> {
        if self.driver_program.trim().is_empty() {
            return Err(MeldError::UserError(
                "config validation failed: driver_program must be non-empty".to_string(),
            ));
        }

        if self.distributed_tool_name.trim().is_empty() {
            return Err(MeldError::UserError(
                "config validation failed: distributed_tool_name must be non-empty".to_string(),
            ));
        }

        if let Err(e) = Glob::new(&self.export_glob) {
            return Err(MeldError::UserError(format!(
                "config validation failed: export_glob '{}' is not a valid glob: {}",
                self.export_glob, e
            )));
        }

        if self.work_began_marker.is_empty() {
            return Err(MeldError::UserError(
                "config validation failed: work_began_marker must be non-empty".to_string(),
            ));
        }

        if self.transient_exit_codes.contains(&0) {
            return Err(MeldError::UserError(
                "config validation failed: transient_exit_codes must not contain 0".to_string(),
            ));
        }

        if !self.distributed_args.contains("{graph_file}") {
            return Err(MeldError::UserError(format!(
                "config validation failed: distributed_args must reference {{graph_file}} (found '{}')",
                self.distributed_args
            )));
        }

        if let Some(local) = &self.local_executor
            && !local.contains("{graph_file}")
        {
            return Err(MeldError::UserError(format!(
                "config validation failed: local_executor must reference {{graph_file}} (found '{}')",
                local
            )));
        }

        Ok(())
    }

    /// True if `target` names a bootstrap tool (case-insensitive).
    pub fn is_bootstrap_target(&self, target: &str) -> bool {
        self.bootstrap_targets
            .iter()
            .any(|t| t.eq_ignore_ascii_case(target))
    }

    /// True if targets for `platform` may run through a graph backend.
    pub fn is_distributed_platform(&self, platform: &str) -> bool {
        self.distributed_platforms
            .iter()
            .any(|p| p.eq_ignore_ascii_case(platform))
    }

    pub fn connection_retry_wait(&self) -> Duration {
        Duration::from_secs(self.connection_retry_wait_seconds)
    }

    /// Post-build hook for `platform`, if one is configured.
    pub fn post_build_hook(&self, platform: &str) -> Option<&str> {
        self.post_build_hooks
            .iter()
            .find(|(p, _)| p.eq_ignore_ascii_case(platform))
            .map(|(_, hook)| hook.as_str())
    }
}
