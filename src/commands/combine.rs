//! Implementation of the `meld combine` command.
//!
//! Combines action files without building anything. Each file stands in for
//! one target, named after the file stem.

use crate::agenda::BuildTarget;
use crate::cli::CombineArgs;
use crate::error::Result;
use crate::graph::{ActionGraph, Combination, GraphItem, combine, load_action_file, write_combined_graph};
use crate::manifest::Manifest;
use std::path::Path;

pub fn cmd_combine(args: CombineArgs) -> Result<()> {
    let combination = combine_files(&args.files, &args.out, args.show_progress)?;
    let stats = combination.stats;

    println!("Wrote {}", args.out.display());
    println!(
        "  tools: {} -> {} ({} reused)",
        stats.input_tools,
        combination.graph.tool_count(),
        stats.reused_tools
    );
    println!(
        "  tasks: {} -> {} ({} aliased)",
        stats.input_tasks,
        combination.graph.task_count(),
        stats.aliased_tasks
    );
    println!("  environments: {}", combination.graph.environments.len());
    Ok(())
}

fn combine_files<P: AsRef<Path>>(files: &[P], out: &Path, show_progress: bool) -> Result<Combination> {
    let items = files
        .iter()
        .map(|path| {
            let path = path.as_ref();
            Ok(GraphItem {
                target: file_target(path),
                manifest: Manifest::default(),
                graph: ActionGraph::new(vec![load_action_file(path)?]),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut combination = combine(&items)?;
    if show_progress {
        combination.graph.annotate_progress();
    }
    write_combined_graph(out, &combination.graph)?;
    Ok(combination)
}

fn file_target(path: &Path) -> BuildTarget {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    BuildTarget::new(stem, "Any", "Any")
}
