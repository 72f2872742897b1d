//! Implementation of the `meld build` command.

use crate::agenda::BuildAgenda;
use crate::cli::BuildArgs;
use crate::config::{BackendPreference, Config};
use crate::context::resolve_context;
use crate::dispatch::DispatchOptions;
use crate::driver::{ProcessBackend, ProcessDriver, ProcessLocalExecutor};
use crate::error::Result;
use crate::orchestrator::{BuildMode, BuildReport, Orchestrator};
use std::fmt::Write;

pub fn cmd_build(args: BuildArgs) -> Result<()> {
    let ctx = resolve_context(args.root.as_deref())?;
    let config = Config::load_or_default(ctx.config_path())?;
    ctx.ensure_dirs()?;

    let mut agenda = BuildAgenda::load(&args.agenda)?;
    if args.retries {
        agenda.allow_retries = true;
    }

    let preference = args
        .backend
        .map(BackendPreference::from)
        .unwrap_or(config.default_backend);
    let options = DispatchOptions {
        show_progress: args.show_progress || config.show_progress,
        stop_on_errors: args.stop_on_errors,
    };

    let driver = ProcessDriver::new(&ctx, &config);
    let distributed = ProcessBackend::new(&ctx, &config);
    let local = ProcessLocalExecutor::new(&ctx, &config);

    let mut orchestrator = Orchestrator::new(&ctx, &config, &driver)
        .with_distributed(&distributed)
        .with_local(&local)
        .with_options(options);
    let report = orchestrator.build(&agenda, preference, args.clean)?;

    print!("{}", format_summary(&report));
    Ok(())
}

/// One line per target plus backend statistics.
fn format_summary(report: &BuildReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Built {} target(s), {} product(s):",
        report.results.len(),
        report.product_count()
    );

    let width = report
        .results
        .iter()
        .map(|r| r.target.caption().len())
        .max()
        .unwrap_or(0);
    for result in &report.results {
        let mode = match result.mode {
            BuildMode::Direct => "direct",
            BuildMode::Graph => "graph",
        };
        let _ = writeln!(
            out,
            "  {:<width$}  {:<6}  {} product(s)",
            result.target.caption(),
            mode,
            result.products.len(),
            width = width
        );
    }

    if let Some(dispatch) = &report.dispatch {
        if !dispatch.executed {
            let _ = writeln!(out, "Graph targets were already up to date.");
        } else if dispatch.attempts > 0 {
            let _ = writeln!(
                out,
                "Distributed backend: {} attempt(s), {} connection retry(ies).",
                dispatch.attempts, dispatch.connection_retries
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agenda::BuildTarget;
    use crate::dispatch::DispatchReport;
    use crate::orchestrator::TargetResult;
    use std::path::PathBuf;

    fn result(name: &str, mode: BuildMode, products: usize) -> TargetResult {
        TargetResult {
            target: BuildTarget::new(name, "Win64", "Development"),
            mode,
            products: (0..products)
                .map(|i| PathBuf::from(format!("{}.{}", name, i)))
                .collect(),
        }
    }

    #[test]
    fn summary_lists_targets_in_order() {
        let report = BuildReport {
            results: vec![
                result("UnrealHeaderTool", BuildMode::Direct, 1),
                result("Game", BuildMode::Graph, 2),
            ],
            dispatch: None,
        };

        let summary = format_summary(&report);
        let lines: Vec<_> = summary.lines().collect();

        assert_eq!(lines[0], "Built 2 target(s), 3 product(s):");
        assert!(lines[1].contains("UnrealHeaderTool-Win64-Development"));
        assert!(lines[1].contains("direct"));
        assert!(lines[2].contains("Game-Win64-Development"));
        assert!(lines[2].contains("graph"));
        assert!(lines[2].ends_with("2 product(s)"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn summary_reports_distributed_retries() {
        let report = BuildReport {
            results: vec![result("Game", BuildMode::Graph, 1)],
            dispatch: Some(DispatchReport {
                executed: true,
                attempts: 2,
                connection_retries: 1,
                ..DispatchReport::default()
            }),
        };

        let summary = format_summary(&report);

        assert!(summary.contains("Distributed backend: 2 attempt(s), 1 connection retry(ies)."));
    }

    #[test]
    fn summary_notes_up_to_date_graph() {
        let report = BuildReport {
            results: vec![result("Game", BuildMode::Graph, 1)],
            dispatch: Some(DispatchReport::default()),
        };

        assert!(format_summary(&report).contains("already up to date"));
    }
}
