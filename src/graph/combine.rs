//! Merging per-target action graphs into one combined graph.
//!
//! Action files are consumed in order: targets in agenda order, and each
//! target's files in the order the driver exported them. Every file gets a
//! global index (`job`) that suffixes the names of the tools and tasks it
//! contributes, so names from different files never collide.
//!
//! Identical environments collapse to one `Env_{n}` entry. Identical tools
//! (see [`heuristics::tool_dedup_key`]) collapse to the first tool seen, and
//! any task whose tool already has a producing task is replaced by that
//! producer. Dependents are rewritten to point at the surviving task.
//!
//! Dependencies must refer to tasks declared earlier in the same file. The
//! combiner never re-sorts; a forward reference fails with
//! [`MeldError::ActionNotFound`].

use super::heuristics;
use super::model::{
    ActionFile, CombinedEnvironment, CombinedGraph, Environment, GraphItem, Project, Task,
};
use crate::error::{MeldError, Result};
use std::collections::HashMap;
use std::path::PathBuf;

/// Counters describing how much a combine collapsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CombineStats {
    /// Action files consumed.
    pub files: usize,
    /// Tools seen in the input.
    pub input_tools: usize,
    /// Tasks seen in the input.
    pub input_tasks: usize,
    /// Tools that collapsed onto an existing tool.
    pub reused_tools: usize,
    /// Tasks replaced by an existing producer.
    pub aliased_tasks: usize,
}

/// The result of a combine: the graph plus bookkeeping for the dispatcher.
#[derive(Debug, Clone, Default)]
pub struct Combination {
    pub graph: CombinedGraph,
    pub stats: CombineStats,
    /// Every action file consumed, in merge order.
    pub sources: Vec<PathBuf>,
}

impl Combination {
    /// False when no input contributed a task, i.e. every target was up to date.
    pub fn has_work(&self) -> bool {
        self.graph.has_work()
    }
}

/// Combine the action graphs of `items`, in order.
pub fn combine(items: &[GraphItem]) -> Result<Combination> {
    let mut combiner = Combiner::new();
    for item in items {
        combiner.add_item(item)?;
    }
    Ok(combiner.finish())
}

/// Owns the lookup tables of one combine.
#[derive(Debug, Default)]
pub struct Combiner {
    graph: CombinedGraph,
    stats: CombineStats,
    sources: Vec<PathBuf>,
    /// Environment canonical key -> index into `graph.environments` (and `graph.projects`).
    env_by_key: HashMap<String, usize>,
    /// Tool dedup key -> merged tool name.
    tool_by_key: HashMap<String, String>,
    /// Merged tool name -> (environment index, tool index).
    tool_slot: HashMap<String, (usize, usize)>,
    /// Merged tool name -> merged name of the task producing its output.
    producer_by_tool: HashMap<String, String>,
    next_job: usize,
}

impl Combiner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge every action file of one target.
    ///
    /// Tasks of a later file depend on every task the earlier files of the
    /// same target created; the carried set does not cross targets.
    pub fn add_item(&mut self, item: &GraphItem) -> Result<()> {
        let caption = item.target.caption();
        let mut carried: Vec<String> = Vec::new();

        for file in &item.graph.files {
            let created = self.add_file(file, &caption, &carried)?;
            carried.extend(created);
        }
        Ok(())
    }

    pub fn finish(self) -> Combination {
        Combination {
            graph: self.graph,
            stats: self.stats,
            sources: self.sources,
        }
    }

    /// Merge one file and return the names of the tasks it created.
    fn add_file(
        &mut self,
        file: &ActionFile,
        caption: &str,
        carried: &[String],
    ) -> Result<Vec<String>> {
        let job = self.next_job;
        self.next_job += 1;
        self.stats.files += 1;
        self.sources.push(file.origin.clone());

        let env = self.environment_slot(&file.environment);

        let mut tool_renames: HashMap<&str, String> = HashMap::new();
        for tool in &file.tools {
            self.stats.input_tools += 1;
            let key = heuristics::tool_dedup_key(tool);

            let merged = match self.tool_by_key.get(&key) {
                Some(existing) => {
                    let existing = existing.clone();
                    self.extend_group_prefix(&existing, caption);
                    self.stats.reused_tools += 1;
                    existing
                }
                None => {
                    heuristics::ensure_legacy_resource_output_dir(tool)?;

                    let name = format!("{}_{}", tool.name, job);
                    let mut merged_tool = tool.clone();
                    merged_tool.name = name.clone();
                    merged_tool.group_prefix = Some(format!("** For {}", caption));

                    let tools = &mut self.graph.environments[env].tools;
                    tools.push(merged_tool);
                    self.tool_slot.insert(name.clone(), (env, tools.len() - 1));
                    self.tool_by_key.insert(key, name.clone());
                    name
                }
            };
            tool_renames.insert(tool.name.as_str(), merged);
        }

        let mut task_renames: HashMap<&str, String> = HashMap::new();
        let mut created = Vec::new();

        for task in &file.tasks {
            self.stats.input_tasks += 1;
            let tool = tool_renames.get(task.tool.as_str()).ok_or_else(|| {
                MeldError::DriverError(format!(
                    "task '{}' in {} references tool '{}' which the file does not declare",
                    task.name,
                    file.label(),
                    task.tool
                ))
            })?;

            if let Some(producer) = self.producer_by_tool.get(tool) {
                task_renames.insert(task.name.as_str(), producer.clone());
                self.stats.aliased_tasks += 1;
                continue;
            }

            let mut depends_on = Vec::new();
            for dep in task.dependencies().filter(|d| !d.is_empty()) {
                let merged = task_renames.get(dep).ok_or_else(|| MeldError::ActionNotFound {
                    action: format!("{}_{}", dep, job),
                    file: file.label(),
                })?;
                push_unique(&mut depends_on, merged);
            }
            for dep in carried {
                push_unique(&mut depends_on, dep);
            }

            let name = format!("{}_{}", task.name, job);
            let merged_task = Task {
                name: name.clone(),
                source_file: task.source_file.clone(),
                caption: task.caption.clone(),
                tool: tool.clone(),
                working_dir: task.working_dir.clone(),
                skip_if_project_failed: task.skip_if_project_failed,
                depends_on,
            };

            // A task always lands in the project of its tool's environment.
            let project = self.tool_slot.get(tool).map_or(env, |&(e, _)| e);
            self.graph.projects[project].tasks.push(merged_task);

            self.producer_by_tool.insert(tool.clone(), name.clone());
            task_renames.insert(task.name.as_str(), name.clone());
            created.push(name);
        }

        Ok(created)
    }

    /// Index of the shared environment equal to `environment`, inserting it if new.
    fn environment_slot(&mut self, environment: &Environment) -> usize {
        let key = environment.canonical_key();
        if let Some(&slot) = self.env_by_key.get(&key) {
            return slot;
        }

        let slot = self.graph.environments.len();
        let name = format!("Env_{}", slot);
        self.graph.environments.push(CombinedEnvironment {
            name: name.clone(),
            variables: environment.variables.clone(),
            tools: Vec::new(),
        });
        self.graph.projects.push(Project {
            name: name.clone(),
            env: name,
            tasks: Vec::new(),
        });
        self.env_by_key.insert(key, slot);
        slot
    }

    fn extend_group_prefix(&mut self, tool_name: &str, caption: &str) {
        if let Some(&(env, idx)) = self.tool_slot.get(tool_name) {
            let tool = &mut self.graph.environments[env].tools[idx];
            let prefix = tool.group_prefix.take().unwrap_or_default();
            tool.group_prefix = Some(format!("{} + {}", prefix, caption));
        }
    }
}

fn push_unique(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|n| n == name) {
        list.push(name.to_string());
    }
}
