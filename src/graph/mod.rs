//! Action graphs and their combination.
//!
//! - [`model`]: typed environments, tools, tasks and the combined graph
//! - [`heuristics`]: special cases that change how tools deduplicate
//! - [`combine`]: the merge itself
//! - [`io`]: loading driver output and persisting the combined graph

pub mod combine;
pub mod heuristics;
pub mod io;
pub mod model;


pub use combine::{Combination, CombineStats, Combiner, combine};
pub use io::{archive_sources, load_action_file, read_combined_graph, write_combined_graph};
pub use model::{
    ActionFile, ActionGraph, CombinedEnvironment, CombinedGraph, Environment, GraphItem, Project,
    Task, Tool, Variable,
};
