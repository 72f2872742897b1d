//! Top-level build of an agenda.
//!
//! Targets are split into two groups:
//!
//! - **direct** targets are built synchronously by the compiler driver: the
//!   bootstrap tools, targets for platforms the graph backends cannot build,
//!   and every target when no graph backend is available
//! - **graph** targets have their action graphs exported, combined and
//!   executed in one batch
//!
//! Bootstrap tools are built first, then the other direct targets, then the
//! graph batch, whatever the agenda order. Graph generation runs the header
//! tool, so it cannot start before the bootstrap tools exist.
//!
//! Any failure aborts the build. Products registered before the failure stay
//! registered.

use crate::agenda::{BuildAgenda, BuildTarget};
use crate::config::{BackendPreference, Config};
use crate::context::BuildContext;
use crate::dispatch::{Backend, DispatchOptions, DispatchReport, Dispatcher, RetryPolicy};
use crate::driver::{CompilerDriver, DistributedBackend, LocalExecutor};
use crate::error::{MeldError, Result};
use crate::events::{Event, EventAction, record_event};
use crate::fs::remove_if_exists;
use crate::graph::{Combination, GraphItem, combine};
use crate::manifest::{ProductRegistry, reconcile};
use serde_json::json;
use std::path::PathBuf;
use std::time::Instant;

/// How a target was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    Direct,
    Graph,
}

/// One target's outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetResult {
    pub target: BuildTarget,
    pub mode: BuildMode,
    /// Registered build products, in manifest order.
    pub products: Vec<PathBuf>,
}

/// Outcome of a successful build, one result per agenda target in agenda order.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub results: Vec<TargetResult>,
    /// Present when a graph batch was dispatched.
    pub dispatch: Option<DispatchReport>,
}

impl BuildReport {
    /// Result for the target with caption `caption`.
    pub fn get(&self, caption: &str) -> Option<&TargetResult> {
        self.results.iter().find(|r| r.target.caption() == caption)
    }

    pub fn product_count(&self) -> usize {
        self.results.iter().map(|r| r.products.len()).sum()
    }
}

pub struct Orchestrator<'a> {
    ctx: &'a BuildContext,
    config: &'a Config,
    driver: &'a dyn CompilerDriver,
    distributed: Option<&'a dyn DistributedBackend>,
    local: Option<&'a dyn LocalExecutor>,
    options: DispatchOptions,
    registry: ProductRegistry,
}

impl<'a> Orchestrator<'a> {
    pub fn new(ctx: &'a BuildContext, config: &'a Config, driver: &'a dyn CompilerDriver) -> Self {
        Self {
            ctx,
            config,
            driver,
            distributed: None,
            local: None,
            options: DispatchOptions {
                show_progress: config.show_progress,
                stop_on_errors: false,
            },
            registry: ProductRegistry::new(),
        }
    }

    pub fn with_distributed(mut self, backend: &'a dyn DistributedBackend) -> Self {
        self.distributed = Some(backend);
        self
    }

    pub fn with_local(mut self, executor: &'a dyn LocalExecutor) -> Self {
        self.local = Some(executor);
        self
    }

    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Every product registered so far, across builds.
    pub fn registry(&self) -> &ProductRegistry {
        &self.registry
    }

    /// The graph backend to use for `preference`, if it is available.
    pub fn resolve_backend(&self, preference: BackendPreference) -> Option<Backend<'a>> {
        match preference {
            BackendPreference::Distributed => self
                .distributed
                .filter(|b| b.is_available())
                .map(Backend::Distributed),
            BackendPreference::LocalParallel => self
                .local
                .filter(|e| e.is_available())
                .map(Backend::LocalParallel),
            BackendPreference::Direct => None,
        }
    }

    /// Build every target of `agenda`.
    ///
    /// With `clean`, every target's declared outputs are deleted before
    /// anything is built, and a graph batch that produces no work is an error.
    pub fn build(
        &mut self,
        agenda: &BuildAgenda,
        preference: BackendPreference,
        clean: bool,
    ) -> Result<BuildReport> {
        let started = Instant::now();
        record_event(
            self.ctx,
            &Event::new(EventAction::BuildStart).with_details(json!({
                "targets": agenda.targets.iter().map(BuildTarget::caption).collect::<Vec<_>>(),
                "backend": format!("{:?}", preference),
                "clean": clean,
                "allow_retries": agenda.allow_retries,
                "special_test_flag": agenda.special_test_flag,
            })),
        );

        let result = self.run(agenda, preference, clean);

        let details = match &result {
            Ok(report) => json!({
                "success": true,
                "products": report.product_count(),
                "duration_ms": started.elapsed().as_millis() as u64,
            }),
            Err(e) => json!({
                "success": false,
                "error": e.to_string(),
                "exit_code": e.exit_code(),
                "duration_ms": started.elapsed().as_millis() as u64,
            }),
        };
        record_event(
            self.ctx,
            &Event::new(EventAction::BuildFinish).with_details(details),
        );

        result
    }

    fn run(
        &mut self,
        agenda: &BuildAgenda,
        preference: BackendPreference,
        clean: bool,
    ) -> Result<BuildReport> {
        let backend = self.resolve_backend(preference);
        if backend.is_none() && preference != BackendPreference::Direct {
            println!(
                "No {:?} backend is available; building every target directly.",
                preference
            );
        }

        let (mut direct, graph): (Vec<usize>, Vec<usize>) = (0..agenda.targets.len())
            .partition(|&i| self.is_direct(&agenda.targets[i], backend.is_some()));
        // Stable, so agenda order holds within each group.
        direct.sort_by_key(|&i| !self.config.is_bootstrap_target(&agenda.targets[i].name));

        if clean {
            self.clean(&agenda.targets)?;
        }

        let mut results: Vec<Option<TargetResult>> = vec![None; agenda.targets.len()];
        for &i in &direct {
            results[i] = Some(self.build_direct(&agenda.targets[i])?);
        }

        let mut dispatch = None;
        if let Some(backend) = backend
            && !graph.is_empty()
        {
            let items = graph
                .iter()
                .map(|&i| self.generate(&agenda.targets[i]))
                .collect::<Result<Vec<_>>>()?;
            let combination = self.combine(&items)?;

            let dispatcher = Dispatcher::new(
                self.ctx,
                self.driver,
                RetryPolicy::from_config(self.config, agenda.allow_retries),
                self.options,
            );
            let report = dispatcher.execute(&combination, &items, backend, &mut self.registry, clean)?;

            for (&i, products) in graph.iter().zip(&report.products) {
                results[i] = Some(TargetResult {
                    target: agenda.targets[i].clone(),
                    mode: BuildMode::Graph,
                    products: products.clone(),
                });
            }
            dispatch = Some(report);
        }

        Ok(BuildReport {
            results: results.into_iter().flatten().collect(),
            dispatch,
        })
    }

    fn is_direct(&self, target: &BuildTarget, have_backend: bool) -> bool {
        !have_backend
            || self.config.is_bootstrap_target(&target.name)
            || !self.config.is_distributed_platform(&target.platform)
    }

    /// Delete the declared outputs of `targets`, except ones already registered.
    ///
    /// Matching is exact: on a case-sensitive filesystem a file differing
    /// from a registered product only by case is still deleted.
    fn clean(&self, targets: &[BuildTarget]) -> Result<()> {
        for target in targets {
            let manifest = self.driver.query_manifest(target)?;

            let mut removed = 0;
            for product in &manifest.build_products {
                if !self.registry.contains_exact(product) && remove_if_exists(product)? {
                    removed += 1;
                }
            }

            record_event(
                self.ctx,
                &Event::new(EventAction::Clean)
                    .with_target(target.caption())
                    .with_details(json!({ "removed": removed })),
            );
        }
        Ok(())
    }

    fn build_direct(&mut self, target: &BuildTarget) -> Result<TargetResult> {
        println!("Building {} directly...", target);
        let started = Instant::now();
        let build = self.driver.build_direct(target)?;

        record_event(
            self.ctx,
            &Event::new(EventAction::DirectBuild)
                .with_target(target.caption())
                .with_details(json!({
                    "exit_code": build.exit_code,
                    "bootstrap": self.config.is_bootstrap_target(&target.name),
                    "duration_ms": started.elapsed().as_millis() as u64,
                })),
        );

        if !build.is_success() {
            return Err(MeldError::DirectBuildFailure {
                target: target.caption(),
                exit_code: build.exit_code,
            });
        }

        let products = reconcile(target, &build.manifest, &mut self.registry, self.driver)?;
        Ok(TargetResult {
            target: target.clone(),
            mode: BuildMode::Direct,
            products,
        })
    }

    fn generate(&self, target: &BuildTarget) -> Result<GraphItem> {
        println!("Generating action graph for {}...", target);
        let export = self.driver.generate_graph(target)?;

        record_event(
            self.ctx,
            &Event::new(EventAction::GraphGenerate)
                .with_target(target.caption())
                .with_details(json!({
                    "files": export.graph.files.len(),
                    "tasks": export.graph.task_count(),
                    "products": export.manifest.build_products.len(),
                })),
        );

        Ok(GraphItem {
            target: target.clone(),
            manifest: export.manifest,
            graph: export.graph,
        })
    }

    fn combine(&self, items: &[GraphItem]) -> Result<Combination> {
        let started = Instant::now();
        let combination = combine(items)?;
        let stats = combination.stats;

        println!(
            "Combined {} action file(s): {} of {} tasks kept, {} of {} tools kept.",
            stats.files,
            combination.graph.task_count(),
            stats.input_tasks,
            combination.graph.tool_count(),
            stats.input_tools
        );
        record_event(
            self.ctx,
            &Event::new(EventAction::Combine).with_details(json!({
                "files": stats.files,
                "input_tools": stats.input_tools,
                "input_tasks": stats.input_tasks,
                "tools": combination.graph.tool_count(),
                "tasks": combination.graph.task_count(),
                "reused_tools": stats.reused_tools,
                "aliased_tasks": stats.aliased_tasks,
                "duration_ms": started.elapsed().as_millis() as u64,
            })),
        );

        Ok(combination)
    }
}
