//! Configuration types and defaults for meld.
//!
//! This module defines enums, constants, and default value functions
//! used by the Config struct.

use serde::{Deserialize, Serialize};

/// Which execution backend a build should prefer for graph-eligible targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendPreference {
    /// Remote distributed execution when the backend is installed (default).
    #[default]
    Distributed,
    /// The local parallel executor.
    LocalParallel,
    /// No graph backend; every target is built directly by the driver.
    Direct,
}

/// Command-line arguments shared by every driver mode.
const DRIVER_TARGET_ARGS: &str = "{target} {platform} {configuration} {project} {args}";

pub fn default_bootstrap_targets() -> Vec<String> {
    vec!["UnrealHeaderTool".to_string()]
}

pub fn default_distributed_platforms() -> Vec<String> {
    vec!["Win64".to_string(), "Win32".to_string()]
}

pub fn default_driver_program() -> String {
    "UnrealBuildTool".to_string()
}

pub fn default_driver_manifest_args() -> String {
    format!("{} -generatemanifest -manifest={{manifest}}", DRIVER_TARGET_ARGS)
}

pub fn default_driver_generate_args() -> String {
    format!(
        "{} -generatemanifest -nobuilduht -xgeexport -manifest={{manifest}} -exportdir={{export_dir}}",
        DRIVER_TARGET_ARGS
    )
}

pub fn default_driver_build_args() -> String {
    DRIVER_TARGET_ARGS.to_string()
}

/// Exported action files are matched by file name against this pattern.
pub fn default_export_glob() -> String {
    "*.graph.json".to_string()
}

pub fn default_distributed_tool_name() -> String {
    "xgConsole".to_string()
}

pub fn default_distributed_args() -> String {
    "{graph_file} /Rebuild /MaxCPUS=200".to_string()
}

pub fn default_stop_on_errors_arg() -> String {
    "/StopOnErrors".to_string()
}

/// Text the backend prints once it starts executing tasks.
pub fn default_work_began_marker() -> String {
    "------Project:".to_string()
}

pub fn default_transient_exit_codes() -> Vec<i32> {
    vec![2, 4]
}

pub fn default_connection_retries() -> u32 {
    4
}

pub fn default_connection_retry_wait_seconds() -> u64 {
    60
}
