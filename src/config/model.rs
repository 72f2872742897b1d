//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration for meld builds.
///
/// This struct represents the contents of `.meld/config.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
///
/// Command fields are templates; see [`crate::driver::template`] for the
/// syntax and [`crate::driver::ProcessDriver`] for the available variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Target partitioning
    // =========================================================================
    /// Targets the rest of the build depends on; always built directly, first.
    #[serde(default = "default_bootstrap_targets")]
    pub bootstrap_targets: Vec<String>,

    /// Platforms whose targets may go through the graph backends.
    #[serde(default = "default_distributed_platforms")]
    pub distributed_platforms: Vec<String>,

    /// Backend used when the command line does not choose one.
    #[serde(default)]
    pub default_backend: BackendPreference,

    // =========================================================================
    // Compiler driver
    // =========================================================================
    /// Program invoked for every driver mode.
    #[serde(default = "default_driver_program")]
    pub driver_program: String,

    /// Arguments that make the driver write a target's manifest and exit.
    #[serde(default = "default_driver_manifest_args")]
    pub driver_manifest_args: String,

    /// Arguments that make the driver export a target's action graph.
    #[serde(default = "default_driver_generate_args")]
    pub driver_generate_args: String,

    /// Arguments that make the driver build a target itself.
    #[serde(default = "default_driver_build_args")]
    pub driver_build_args: String,

    /// File-name pattern of exported action files.
    #[serde(default = "default_export_glob")]
    pub export_glob: String,

    /// Per-platform command run after a target's outputs are verified.
    #[serde(default)]
    pub post_build_hooks: BTreeMap<String, String>,

    // =========================================================================
    // Distributed backend
    // =========================================================================
    /// Explicit path to the distributed console. When unset it is looked up
    /// on `PATH` by `distributed_tool_name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distributed_tool: Option<String>,

    #[serde(default = "default_distributed_tool_name")]
    pub distributed_tool_name: String,

    /// Arguments passed to the distributed console.
    #[serde(default = "default_distributed_args")]
    pub distributed_args: String,

    /// Extra argument appended when the build should stop at the first error.
    #[serde(default = "default_stop_on_errors_arg")]
    pub stop_on_errors_arg: String,

    /// Output text proving the backend got as far as running tasks.
    #[serde(default = "default_work_began_marker")]
    pub work_began_marker: String,

    /// Exit codes that mean "could not reach the coordinator".
    #[serde(default = "default_transient_exit_codes")]
    pub transient_exit_codes: Vec<i32>,

    /// Connection retries allowed across one dispatch.
    #[serde(default = "default_connection_retries")]
    pub connection_retries: u32,

    /// Seconds to wait before a connection retry.
    #[serde(default = "default_connection_retry_wait_seconds")]
    pub connection_retry_wait_seconds: u64,

    // =========================================================================
    // Local executor
    // =========================================================================
    /// Command running a combined graph locally (empty disables the local backend).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_executor: Option<String>,

    // =========================================================================
    // Output
    // =========================================================================
    /// Ask the backend to print an `N of total` progress counter.
    #[serde(default)]
    pub show_progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bootstrap_targets: default_bootstrap_targets(),
            distributed_platforms: default_distributed_platforms(),
            default_backend: BackendPreference::default(),
            driver_program: default_driver_program(),
            driver_manifest_args: default_driver_manifest_args(),
            driver_generate_args: default_driver_generate_args(),
            driver_build_args: default_driver_build_args(),
            export_glob: default_export_glob(),
            post_build_hooks: BTreeMap::new(),
            distributed_tool: None,
            distributed_tool_name: default_distributed_tool_name(),
            distributed_args: default_distributed_args(),
            stop_on_errors_arg: default_stop_on_errors_arg(),
            work_began_marker: default_work_began_marker(),
            transient_exit_codes: default_transient_exit_codes(),
            connection_retries: default_connection_retries(),
            connection_retry_wait_seconds: default_connection_retry_wait_seconds(),
            local_executor: None,
            show_progress: false,
        }
    }
}
