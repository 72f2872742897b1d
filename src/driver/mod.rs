//! Collaborators the orchestrator delegates to.
//!
//! Three external programs do the real work:
//!
//! - a compiler driver that turns a target into an action graph (or builds it
//!   directly) and declares the target's outputs
//! - a distributed backend that executes a combined graph on remote agents
//! - a local executor that executes a combined graph on this machine
//!
//! Each is a trait so the core can be driven by in-memory fakes in tests. The
//! subprocess implementations configured from `.meld/config.yaml` live in
//! [`process`] and [`backend`].

pub mod backend;
mod command;
pub mod process;
pub mod template;

pub use backend::{ProcessBackend, ProcessLocalExecutor, find_on_path};
pub use command::{CommandOutput, run_logged};
pub use process::ProcessDriver;

use crate::agenda::BuildTarget;
use crate::error::Result;
use crate::graph::ActionGraph;
use crate::manifest::Manifest;
use std::path::{Path, PathBuf};

/// What the driver exports for a graph-eligible target.
#[derive(Debug, Clone, Default)]
pub struct GraphExport {
    /// Action files in phase order.
    pub graph: ActionGraph,
    /// Outputs the graph will produce.
    pub manifest: Manifest,
}

/// Outcome of building one target directly.
#[derive(Debug, Clone, Default)]
pub struct DirectBuild {
    pub exit_code: i32,
    pub manifest: Manifest,
}

impl DirectBuild {
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Outcome of one distributed backend invocation.
#[derive(Debug, Clone, Default)]
pub struct BackendRun {
    pub exit_code: i32,
    /// Combined stdout and stderr.
    pub output: String,
    /// Where the output was saved, if anywhere.
    pub log_path: Option<PathBuf>,
}

/// The external build tool that knows how to compile a target.
pub trait CompilerDriver {
    /// Export the target's action graph and manifest without executing anything.
    fn generate_graph(&self, target: &BuildTarget) -> Result<GraphExport>;

    /// Build the target synchronously, in-process of the driver.
    fn build_direct(&self, target: &BuildTarget) -> Result<DirectBuild>;

    /// Report the outputs the target would produce, without building it.
    fn query_manifest(&self, target: &BuildTarget) -> Result<Manifest>;

    /// Platform-specific finalization after the target's outputs were verified.
    fn post_build(&self, target: &BuildTarget) -> Result<()>;
}

/// A remote-execution service that runs a combined graph.
pub trait DistributedBackend {
    /// Display name used in log records and errors.
    fn name(&self) -> &str;

    fn is_available(&self) -> bool;

    /// Run the graph once and report how it went. Errors are reserved for
    /// failures to launch; a failed build is a nonzero `exit_code`.
    fn run(&self, graph_file: &Path, stop_on_errors: bool) -> Result<BackendRun>;
}

/// A bounded-parallelism executor that runs a combined graph locally.
pub trait LocalExecutor {
    fn is_available(&self) -> bool;

    /// Run the graph and return the process exit code.
    fn run(&self, graph_file: &Path) -> Result<i32>;
}
