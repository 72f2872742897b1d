//! Typed action graph structures.
//!
//! The compiler driver exports one or more action files per target. Each file
//! holds one environment, the tools (distinct compiler/linker invocations) run
//! under it, and the tasks scheduling those tools. The combiner merges them
//! into a [`CombinedGraph`] which is what execution backends read.

use crate::agenda::BuildTarget;
use crate::manifest::Manifest;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Format version written into every persisted combined graph.
pub const COMBINED_GRAPH_FORMAT_VERSION: u32 = 1;

/// One environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub value: String,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Process environment a tool runs under.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    pub variables: Vec<Variable>,
}

impl Environment {
    pub fn new(variables: Vec<Variable>) -> Self {
        Self { variables }
    }

    /// Sorted `name=value` lines. Two environments are the same iff their keys match.
    pub fn canonical_key(&self) -> String {
        let mut pairs: Vec<String> = self
            .variables
            .iter()
            .map(|v| format!("{}={}", v.name, v.value))
            .collect();
        pairs.sort();
        pairs.into_iter().map(|p| p + "\n").collect()
    }
}

impl PartialEq for Environment {
    fn eq(&self, other: &Self) -> bool {
        self.canonical_key() == other.canonical_key()
    }
}

impl Eq for Environment {}

/// A distinct compiler/linker invocation shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tool {
    pub name: String,
    pub path: String,
    pub params: String,
    pub allow_remote: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_prefix: Option<String>,
    pub output_file_masks: String,
    pub skip_if_project_failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vc_compiler: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_reserve_memory: Option<String>,
    /// Display grouping label listing the targets that depend on this tool.
    /// Only set on combined-graph tools.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_prefix: Option<String>,
}

impl Tool {
    pub fn new(name: impl Into<String>, path: impl Into<String>, params: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            params: params.into(),
            ..Default::default()
        }
    }

    /// `path + " " + params`, the default deduplication key.
    pub fn signature(&self) -> String {
        format!("{} {}", self.path, self.params)
    }
}

/// A scheduling node wrapping one tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Task {
    pub name: String,
    pub source_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub tool: String,
    pub working_dir: String,
    pub skip_if_project_failed: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl Task {
    pub fn new(name: impl Into<String>, tool: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tool: tool.into(),
            ..Default::default()
        }
    }

    pub fn with_deps<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Names of the tasks this one waits for.
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.depends_on.iter().map(String::as_str)
    }
}

/// One file exported by the compiler driver for a target.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionFile {
    /// Where the file was read from; used in error messages.
    #[serde(skip)]
    pub origin: PathBuf,
    pub environment: Environment,
    pub tools: Vec<Tool>,
    pub tasks: Vec<Task>,
}

impl ActionFile {
    pub fn label(&self) -> String {
        self.origin.display().to_string()
    }
}

/// All action files one target contributed, in phase order.
#[derive(Debug, Clone, Default)]
pub struct ActionGraph {
    pub files: Vec<ActionFile>,
}

impl ActionGraph {
    pub fn new(files: Vec<ActionFile>) -> Self {
        Self { files }
    }

    pub fn task_count(&self) -> usize {
        self.files.iter().map(|f| f.tasks.len()).sum()
    }
}

/// A graph-eligible target with its exported graph and declared outputs.
#[derive(Debug, Clone)]
pub struct GraphItem {
    pub target: BuildTarget,
    pub manifest: Manifest,
    pub graph: ActionGraph,
}

/// An environment of the combined graph with the tools that run under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedEnvironment {
    pub name: String,
    pub variables: Vec<Variable>,
    pub tools: Vec<Tool>,
}

/// The tasks scheduled under one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub env: String,
    pub tasks: Vec<Task>,
}

/// Deduplicated union of every graph-eligible target's actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedGraph {
    pub format_version: u32,
    pub environments: Vec<CombinedEnvironment>,
    pub projects: Vec<Project>,
}

impl Default for CombinedGraph {
    fn default() -> Self {
        Self {
            format_version: COMBINED_GRAPH_FORMAT_VERSION,
            environments: Vec::new(),
            projects: Vec::new(),
        }
    }
}

impl CombinedGraph {
    pub fn tools(&self) -> impl Iterator<Item = &Tool> {
        self.environments.iter().flat_map(|e| e.tools.iter())
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.projects.iter().flat_map(|p| p.tasks.iter())
    }

    pub fn tool_count(&self) -> usize {
        self.environments.iter().map(|e| e.tools.len()).sum()
    }

    pub fn task_count(&self) -> usize {
        self.projects.iter().map(|p| p.tasks.len()).sum()
    }

    /// False when nothing needs to run (every target was up to date).
    pub fn has_work(&self) -> bool {
        self.task_count() > 0
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks().find(|t| t.name == name)
    }

    pub fn tool(&self, name: &str) -> Option<&Tool> {
        self.tools().find(|t| t.name == name)
    }

    /// Tasks whose tool is `tool_name`.
    pub fn producers_of<'a>(&'a self, tool_name: &'a str) -> impl Iterator<Item = &'a Task> {
        self.tasks().filter(move |t| t.tool == tool_name)
    }

    /// Mark every tool's output so the backend prints an `N of total` counter.
    pub fn annotate_progress(&mut self) {
        let total = self.tool_count();
        for tool in self.environments.iter_mut().flat_map(|e| e.tools.iter_mut()) {
            tool.output_prefix = Some(match tool.output_prefix.take() {
                Some(prefix) => format!("{} [@progress increment 1/{}]", prefix, total),
                None => format!(" [@progress increment 1/{} skipline]", total),
            });
        }
    }
}
