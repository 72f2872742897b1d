//! CLI argument parsing for meld.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use crate::config::BackendPreference;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Meld: combine per-target action graphs and run them as one build.
///
/// Each target of an agenda is either built directly by the compiler driver
/// or has its action graph exported. Exported graphs are merged into a
/// single deduplicated graph and handed to a distributed or local executor.
#[derive(Parser, Debug)]
#[command(name = "meld")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for meld.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize meld in a build root.
    ///
    /// Creates the `.meld/` working directories and a default `config.yaml`.
    Init(InitArgs),

    /// Build every target of an agenda.
    Build(BuildArgs),

    /// Combine action files into one graph without running it.
    ///
    /// Each file is treated as a separate target. Useful for inspecting
    /// what the combiner deduplicates.
    Combine(CombineArgs),
}

/// Arguments for the `init` command.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Build root (default: the current directory).
    #[arg(long)]
    pub root: Option<PathBuf>,
}

/// Backend names accepted on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendArg {
    Distributed,
    Local,
    Direct,
}

impl From<BackendArg> for BackendPreference {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Distributed => BackendPreference::Distributed,
            BackendArg::Local => BackendPreference::LocalParallel,
            BackendArg::Direct => BackendPreference::Direct,
        }
    }
}

/// Arguments for the `build` command.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Agenda file (YAML) listing the targets to build.
    pub agenda: PathBuf,

    /// Execution backend for graph targets (default: from config).
    #[arg(long, value_enum)]
    pub backend: Option<BackendArg>,

    /// Delete every declared output before building.
    #[arg(long)]
    pub clean: bool,

    /// Allow a second distributed attempt even if the agenda does not.
    #[arg(long)]
    pub retries: bool,

    /// Ask the backend to print a progress counter.
    #[arg(long)]
    pub show_progress: bool,

    /// Ask the distributed backend to stop at the first error.
    #[arg(long)]
    pub stop_on_errors: bool,

    /// Build root (default: nearest ancestor containing `.meld/`).
    #[arg(long)]
    pub root: Option<PathBuf>,
}

/// Arguments for the `combine` command.
#[derive(Parser, Debug)]
pub struct CombineArgs {
    /// Action files to combine, one target each.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Where to write the combined graph.
    #[arg(short, long)]
    pub out: PathBuf,

    /// Annotate every tool with a progress counter.
    #[arg(long)]
    pub show_progress: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
