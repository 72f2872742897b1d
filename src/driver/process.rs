//! Compiler driver run as a subprocess.
//!
//! Every mode invokes `driver_program` with a rendered argument template.
//! Available template variables:
//!
//! | Variable          | Value                                              |
//! |-------------------|----------------------------------------------------|
//! | `{target}`        | Target name                                        |
//! | `{platform}`      | Platform identifier                                |
//! | `{configuration}` | Configuration identifier                           |
//! | `{project}`       | Project file path, or nothing                      |
//! | `{args}`          | The target's extra arguments, split as written     |
//! | `{manifest}`      | Where the driver must write the target's manifest  |
//! | `{export_dir}`    | Where the driver must export action files          |
//!
//! Path-like values are quoted so they stay one argument. Driver output is
//! saved under the logs directory; exported action files and manifests are
//! archived there too, under unique names, so a failed build leaves every
//! input behind for inspection.

use super::command::{CommandOutput, run_logged};
use super::template::{quote_arg, render_argv};
use super::{CompilerDriver, DirectBuild, GraphExport};
use crate::agenda::BuildTarget;
use crate::config::Config;
use crate::context::BuildContext;
use crate::error::{MeldError, Result};
use crate::fs::{clear_dir, remove_if_exists};
use crate::graph::{ActionFile, ActionGraph, load_action_file};
use crate::manifest::Manifest;
use globset::{Glob, GlobMatcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Compiler driver backed by an external program.
#[derive(Debug, Clone)]
pub struct ProcessDriver {
    ctx: BuildContext,
    config: Config,
}

impl ProcessDriver {
    pub fn new(ctx: &BuildContext, config: &Config) -> Self {
        Self {
            ctx: ctx.clone(),
            config: config.clone(),
        }
    }

    fn variables(&self, target: &BuildTarget) -> HashMap<String, String> {
        let project = target
            .project
            .as_ref()
            .map(|p| quote_arg(&p.display().to_string()))
            .unwrap_or_default();

        super::template::vars([
            ("target", quote_arg(&target.name)),
            ("platform", quote_arg(&target.platform)),
            ("configuration", quote_arg(&target.configuration)),
            ("project", project),
            ("args", target.args.clone()),
            (
                "manifest",
                quote_arg(&self.ctx.manifest_path().display().to_string()),
            ),
            (
                "export_dir",
                quote_arg(&self.ctx.export_dir.display().to_string()),
            ),
        ])
    }

    /// Run the driver with the template from config field `what`.
    fn invoke(&self, what: &str, template: &str, target: &BuildTarget) -> Result<CommandOutput> {
        let mut argv = vec![self.config.driver_program.clone()];
        argv.extend(render_argv(what, template, &self.variables(target))?);

        let log = self
            .ctx
            .unique_log_path(&format!("Driver-{}", target.caption()), "log");
        run_logged(&argv, &self.ctx.root, &log)
    }

    /// Like [`Self::invoke`], but a nonzero exit is a driver failure.
    fn invoke_checked(
        &self,
        what: &str,
        template: &str,
        target: &BuildTarget,
    ) -> Result<CommandOutput> {
        let out = self.invoke(what, template, target)?;
        if !out.is_success() {
            return Err(MeldError::DriverError(format!(
                "'{}' failed for {} (exit code {}); see log '{}'",
                out.command,
                target,
                out.exit_code,
                out.log_path.display()
            )));
        }
        Ok(out)
    }

    /// Read the manifest the driver just wrote, archive a copy, and delete it.
    fn take_manifest(&self) -> Result<Manifest> {
        let path = self.ctx.manifest_path();
        let manifest = Manifest::load(&path)?;

        let archived = self.ctx.unique_log_path("Manifest", "json");
        if let Err(e) = std::fs::copy(&path, &archived) {
            eprintln!(
                "Warning: failed to archive manifest to '{}': {}",
                archived.display(),
                e
            );
        }

        remove_if_exists(&path)?;
        Ok(manifest)
    }

    fn export_matcher(&self) -> Result<GlobMatcher> {
        Glob::new(&self.config.export_glob)
            .map(|g| g.compile_matcher())
            .map_err(|e| {
                MeldError::UserError(format!(
                    "invalid export_glob '{}': {}",
                    self.config.export_glob, e
                ))
            })
    }

    /// Move every exported action file into the logs directory and load them, in name order.
    fn collect_exports(&self) -> Result<Vec<ActionFile>> {
        let matcher = self.export_matcher()?;
        let entries = std::fs::read_dir(&self.ctx.export_dir).map_err(|e| {
            MeldError::DriverError(format!(
                "failed to read export directory '{}': {}",
                self.ctx.export_dir.display(),
                e
            ))
        })?;

        let mut exported: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| path.file_name().is_some_and(|name| matcher.is_match(name)))
            .collect();
        exported.sort();

        let mut files = Vec::with_capacity(exported.len());
        for source in exported {
            let archived = self.ctx.unique_log_path("DriverExport", "graph.json");
            archive_export(&source, &archived)?;
            files.push(load_action_file(&archived)?);
        }
        Ok(files)
    }
}

/// Copy an exported action file to `archived`, then delete the export.
fn archive_export(source: &Path, archived: &Path) -> Result<()> {
    std::fs::copy(source, archived).map_err(|e| {
        MeldError::DriverError(format!(
            "failed to archive action file '{}' to '{}': {}",
            source.display(),
            archived.display(),
            e
        ))
    })?;
    remove_if_exists(source)?;
    Ok(())
}

impl CompilerDriver for ProcessDriver {
    fn generate_graph(&self, target: &BuildTarget) -> Result<GraphExport> {
        clear_dir(&self.ctx.export_dir)?;
        remove_if_exists(self.ctx.manifest_path())?;

        self.invoke_checked(
            "driver_generate_args",
            &self.config.driver_generate_args,
            target,
        )?;

        let manifest = self.take_manifest()?;
        let files = self.collect_exports()?;
        clear_dir(&self.ctx.export_dir)?;

        Ok(GraphExport {
            graph: ActionGraph::new(files),
            manifest,
        })
    }

    fn build_direct(&self, target: &BuildTarget) -> Result<DirectBuild> {
        let manifest = self.query_manifest(target)?;
        let out = self.invoke("driver_build_args", &self.config.driver_build_args, target)?;

        if !out.is_success() {
            eprintln!(
                "Driver build of {} exited with {}; see log '{}'",
                target,
                out.exit_code,
                out.log_path.display()
            );
        }

        Ok(DirectBuild {
            exit_code: out.exit_code,
            manifest,
        })
    }

    fn query_manifest(&self, target: &BuildTarget) -> Result<Manifest> {
        remove_if_exists(self.ctx.manifest_path())?;
        self.invoke_checked(
            "driver_manifest_args",
            &self.config.driver_manifest_args,
            target,
        )?;
        self.take_manifest()
    }

    fn post_build(&self, target: &BuildTarget) -> Result<()> {
        let Some(hook) = self.config.post_build_hook(&target.platform) else {
            return Ok(());
        };

        let what = format!("post_build_hooks.{}", target.platform);
        let argv = render_argv(&what, hook, &self.variables(target))?;
        let log = self
            .ctx
            .unique_log_path(&format!("PostBuild-{}", target.caption()), "log");
        let out = run_logged(&argv, &self.ctx.root, &log)?;

        if !out.is_success() {
            return Err(MeldError::DriverError(format!(
                "post-build hook for {} failed (exit code {}); see log '{}'",
                target,
                out.exit_code,
                out.log_path.display()
            )));
        }
        Ok(())
    }
}
