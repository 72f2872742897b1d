//! Running a combined graph on an execution backend.
//!
//! The dispatcher persists the graph, hands it to one backend, and once the
//! backend reports success reconciles every contributing target.
//!
//! The local executor runs exactly once. The distributed backend is retried
//! on two levels:
//!
//! - a run that fails with a transient exit code before any project started
//!   is a connection failure and is re-run within the same attempt, up to
//!   `connection_retries` times per dispatch, waiting between runs after the
//!   first
//! - any other failure ends the attempt; if another attempt is allowed every
//!   declared output of every item is deleted first, so the next attempt
//!   starts from scratch

mod retry;


pub use retry::{RetryPolicy, RunOutcome};

use crate::context::BuildContext;
use crate::driver::{CompilerDriver, DistributedBackend, LocalExecutor};
use crate::error::{MeldError, Result};
use crate::events::{Event, EventAction, record_event};
use crate::graph::{Combination, GraphItem, archive_sources, write_combined_graph};
use crate::manifest::{ProductRegistry, reconcile};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// The backend a combined graph is handed to.
#[derive(Clone, Copy)]
pub enum Backend<'a> {
    Distributed(&'a dyn DistributedBackend),
    LocalParallel(&'a dyn LocalExecutor),
}

impl Backend<'_> {
    pub fn name(&self) -> &str {
        match self {
            Backend::Distributed(backend) => backend.name(),
            Backend::LocalParallel(_) => "local executor",
        }
    }
}

/// Switches passed through to the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Annotate every tool so the backend prints an `N of total` counter.
    pub show_progress: bool,
    /// Ask the distributed backend to stop at the first error.
    pub stop_on_errors: bool,
}

/// What one dispatch did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// False when the graph had no tasks and no backend ran.
    pub executed: bool,
    /// Distributed attempts started.
    pub attempts: u32,
    /// Connection failures retried.
    pub connection_retries: u32,
    /// Waits taken before connection retries.
    pub waits: Vec<Duration>,
    /// Registered build products of each item, in item order.
    pub products: Vec<Vec<PathBuf>>,
}

pub struct Dispatcher<'a> {
    ctx: &'a BuildContext,
    driver: &'a dyn CompilerDriver,
    policy: RetryPolicy,
    options: DispatchOptions,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        ctx: &'a BuildContext,
        driver: &'a dyn CompilerDriver,
        policy: RetryPolicy,
        options: DispatchOptions,
    ) -> Self {
        Self {
            ctx,
            driver,
            policy,
            options,
        }
    }

    /// Execute `combination` on `backend`, then reconcile every item.
    ///
    /// `items` must be the graph items `combination` was built from. A graph
    /// without tasks is a successful no-op unless `require_work` is set, in
    /// which case it is [`MeldError::EmptyGraph`] naming every item.
    pub fn execute(
        &self,
        combination: &Combination,
        items: &[GraphItem],
        backend: Backend<'_>,
        registry: &mut ProductRegistry,
        require_work: bool,
    ) -> Result<DispatchReport> {
        let mut report = DispatchReport::default();

        if combination.has_work() {
            let graph_file = self.persist(combination)?;
            match backend {
                Backend::LocalParallel(executor) => self.run_local(executor, &graph_file)?,
                Backend::Distributed(distributed) => {
                    self.run_distributed(distributed, &graph_file, items, &mut report)?
                }
            }
            report.executed = true;
        } else if require_work {
            return Err(MeldError::EmptyGraph {
                targets: items
                    .iter()
                    .map(|item| item.target.caption())
                    .collect::<Vec<_>>()
                    .join(", "),
                files: combination.stats.files,
            });
        } else {
            println!("Everything is up to date; no actions were produced.");
        }

        for item in items {
            let products = reconcile(&item.target, &item.manifest, registry, self.driver)?;
            record_event(
                self.ctx,
                &Event::new(EventAction::Reconcile)
                    .with_target(item.target.caption())
                    .with_details(json!({ "products": products.len() })),
            );
            report.products.push(products);
        }

        Ok(report)
    }

    /// Write the graph for the backend and archive its source files next to it.
    fn persist(&self, combination: &Combination) -> Result<PathBuf> {
        let graph_file = self.ctx.graph_file();

        if self.options.show_progress {
            let mut graph = combination.graph.clone();
            graph.annotate_progress();
            write_combined_graph(&graph_file, &graph)?;
        } else {
            write_combined_graph(&graph_file, &combination.graph)?;
        }

        if let Err(e) = archive_sources(&graph_file, &combination.sources) {
            eprintln!("Warning: failed to archive action files: {}", e);
        }
        Ok(graph_file)
    }

    fn run_local(&self, executor: &dyn LocalExecutor, graph_file: &Path) -> Result<()> {
        let started = Instant::now();
        let exit_code = executor.run(graph_file)?;

        record_event(
            self.ctx,
            &Event::new(EventAction::BackendAttempt).with_details(json!({
                "backend": "local",
                "attempt": 1,
                "exit_code": exit_code,
                "duration_ms": started.elapsed().as_millis() as u64,
            })),
        );

        if exit_code != 0 {
            return Err(MeldError::FatalBackendFailure {
                tool: "local executor".to_string(),
                exit_code,
                log: self.ctx.logs_dir.display().to_string(),
            });
        }
        Ok(())
    }

    fn run_distributed(
        &self,
        backend: &dyn DistributedBackend,
        graph_file: &Path,
        items: &[GraphItem],
        report: &mut DispatchReport,
    ) -> Result<()> {
        let attempts = self.policy.attempts.max(1);
        let mut attempt = 1;

        loop {
            report.attempts = attempt;
            let err = match self.attempt(backend, graph_file, attempt, report) {
                Ok(()) => return Ok(()),
                Err(err) => err,
            };

            if attempt >= attempts {
                return Err(MeldError::DistributedBuildFailed {
                    attempts: attempt,
                    source: Box::new(err),
                });
            }

            eprintln!(
                "Warning: {} failed on attempt {}, deleting build products to force a rebuild: {}",
                backend.name(),
                attempt,
                err
            );
            self.purge(items, attempt)?;
            attempt += 1;
        }
    }

    /// Run the backend until it succeeds, fails, or runs out of connection retries.
    fn attempt(
        &self,
        backend: &dyn DistributedBackend,
        graph_file: &Path,
        attempt: u32,
        report: &mut DispatchReport,
    ) -> Result<()> {
        loop {
            let started = Instant::now();
            let run = backend.run(graph_file, self.options.stop_on_errors)?;
            let outcome = self.policy.classify(&run);
            let log = run
                .log_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(not saved)".to_string());

            record_event(
                self.ctx,
                &Event::new(EventAction::BackendAttempt).with_details(json!({
                    "backend": backend.name(),
                    "attempt": attempt,
                    "exit_code": run.exit_code,
                    "outcome": format!("{:?}", outcome),
                    "duration_ms": started.elapsed().as_millis() as u64,
                    "log": log,
                })),
            );

            match outcome {
                RunOutcome::Succeeded => return Ok(()),
                RunOutcome::ConnectionFailed
                    if report.connection_retries < self.policy.connection_retries =>
                {
                    let failure = MeldError::TransientConnectionFailure {
                        tool: backend.name().to_string(),
                        exit_code: run.exit_code,
                    };
                    eprintln!("Warning: {}; retrying", failure);

                    if report.connection_retries > 0 {
                        let wait = self.policy.connection_retry_wait;
                        report.waits.push(wait);
                        std::thread::sleep(wait);
                    }
                    report.connection_retries += 1;

                    record_event(
                        self.ctx,
                        &Event::new(EventAction::ConnectionRetry).with_details(json!({
                            "backend": backend.name(),
                            "attempt": attempt,
                            "exit_code": run.exit_code,
                            "retry": report.connection_retries,
                        })),
                    );
                }
                RunOutcome::ConnectionFailed | RunOutcome::Failed => {
                    return Err(MeldError::FatalBackendFailure {
                        tool: backend.name().to_string(),
                        exit_code: run.exit_code,
                        log,
                    });
                }
            }
        }
    }

    /// Delete every declared build product of every item.
    fn purge(&self, items: &[GraphItem], attempt: u32) -> Result<usize> {
        let mut removed = 0;
        for item in items {
            removed += item.manifest.delete_build_products()?;
        }

        record_event(
            self.ctx,
            &Event::new(EventAction::Purge).with_details(json!({
                "after_attempt": attempt,
                "removed": removed,
            })),
        );
        Ok(removed)
    }
}
