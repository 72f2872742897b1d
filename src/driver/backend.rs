//! Execution backends run as subprocesses.

use super::command::run_logged;
use super::template::{quote_arg, render_argv, vars};
use super::{BackendRun, DistributedBackend, LocalExecutor};
use crate::config::Config;
use crate::context::BuildContext;
use crate::error::{MeldError, Result};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

/// Search `PATH` for an executable named `name`.
///
/// On Windows `name.exe` is tried as well.
pub fn find_on_path(name: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .flat_map(|dir| executable_candidates(&dir, name))
        .find(|candidate| candidate.is_file())
}

#[cfg(windows)]
fn executable_candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    vec![dir.join(name), dir.join(format!("{}.exe", name))]
}

#[cfg(not(windows))]
fn executable_candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    vec![dir.join(name)]
}

fn graph_vars(graph_file: &Path) -> HashMap<String, String> {
    vars([("graph_file", quote_arg(&graph_file.display().to_string()))])
}

/// The distributed build console, e.g. `xgConsole`.
#[derive(Debug, Clone)]
pub struct ProcessBackend {
    ctx: BuildContext,
    name: String,
    program: Option<PathBuf>,
    args_template: String,
    stop_on_errors_arg: String,
}

impl ProcessBackend {
    /// Locate the console from config: the explicit path if set, otherwise `PATH`.
    pub fn new(ctx: &BuildContext, config: &Config) -> Self {
        let program = match &config.distributed_tool {
            Some(path) => Some(PathBuf::from(path)),
            None => find_on_path(&config.distributed_tool_name),
        };

        Self {
            ctx: ctx.clone(),
            name: config.distributed_tool_name.clone(),
            program,
            args_template: config.distributed_args.clone(),
            stop_on_errors_arg: config.stop_on_errors_arg.clone(),
        }
    }

    pub fn program(&self) -> Option<&Path> {
        self.program.as_deref()
    }

    fn argv(&self, program: &Path, graph_file: &Path, stop_on_errors: bool) -> Result<Vec<String>> {
        let mut argv = vec![program.display().to_string()];
        argv.extend(render_argv(
            "distributed_args",
            &self.args_template,
            &graph_vars(graph_file),
        )?);
        if stop_on_errors && !self.stop_on_errors_arg.is_empty() {
            argv.push(self.stop_on_errors_arg.clone());
        }
        Ok(argv)
    }
}

impl DistributedBackend for ProcessBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.program.as_ref().is_some_and(|p| p.is_file())
    }

    fn run(&self, graph_file: &Path, stop_on_errors: bool) -> Result<BackendRun> {
        let program = self.program.as_deref().ok_or_else(|| {
            MeldError::UserError(format!(
                "distributed backend '{}' was not found on PATH\n\
                 Fix: install it or set distributed_tool in .meld/config.yaml.",
                self.name
            ))
        })?;

        let argv = self.argv(program, graph_file, stop_on_errors)?;
        let log = self.ctx.unique_log_path(&self.name, "log");
        let out = run_logged(&argv, &self.ctx.root, &log)?;

        Ok(BackendRun {
            exit_code: out.exit_code,
            output: out.output,
            log_path: Some(out.log_path),
        })
    }
}

/// The local parallel executor, configured as a command template.
#[derive(Debug, Clone)]
pub struct ProcessLocalExecutor {
    ctx: BuildContext,
    command: Option<String>,
}

impl ProcessLocalExecutor {
    pub fn new(ctx: &BuildContext, config: &Config) -> Self {
        Self {
            ctx: ctx.clone(),
            command: config
                .local_executor
                .clone()
                .filter(|c| !c.trim().is_empty()),
        }
    }
}

impl LocalExecutor for ProcessLocalExecutor {
    fn is_available(&self) -> bool {
        let Some(command) = &self.command else {
            return false;
        };
        let Ok(words) = shell_words::split(command) else {
            return false;
        };
        match words.first() {
            Some(program) => Path::new(program).is_file() || find_on_path(program).is_some(),
            None => false,
        }
    }

    fn run(&self, graph_file: &Path) -> Result<i32> {
        let command = self.command.as_deref().ok_or_else(|| {
            MeldError::UserError(
                "no local executor configured\n\
                 Fix: set local_executor in .meld/config.yaml."
                    .to_string(),
            )
        })?;

        let argv = render_argv("local_executor", command, &graph_vars(graph_file))?;
        let log = self.ctx.unique_log_path("LocalExecutor", "log");
        let out = run_logged(&argv, &self.ctx.root, &log)?;
        Ok(out.exit_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, BuildContext) {
        let temp = TempDir::new().unwrap();
        let ctx = BuildContext::at(temp.path());
        ctx.ensure_dirs().unwrap();
        (temp, ctx)
    }

    #[test]
    fn backend_without_program_is_unavailable() {
        let (_temp, ctx) = setup();
        let config = Config {
            distributed_tool_name: "no_such_console_xyz_123".to_string(),
            ..Config::default()
        };

        let backend = ProcessBackend::new(&ctx, &config);

        assert!(!backend.is_available());
        let err = backend.run(&ctx.graph_file(), false).unwrap_err();
        assert!(err.to_string().contains("was not found on PATH"));
    }

    #[test]
    fn backend_argv_appends_stop_on_errors() {
        let (_temp, ctx) = setup();
        let backend = ProcessBackend::new(&ctx, &Config::default());
        let graph = Path::new("/b/.meld/logs/combined.graph.json");

        let argv = backend.argv(Path::new("xgConsole"), graph, true).unwrap();

        assert_eq!(
            argv,
            vec![
                "xgConsole",
                "/b/.meld/logs/combined.graph.json",
                "/Rebuild",
                "/MaxCPUS=200",
                "/StopOnErrors"
            ]
        );
        let argv = backend.argv(Path::new("xgConsole"), graph, false).unwrap();
        assert_eq!(argv.last().map(String::as_str), Some("/MaxCPUS=200"));
    }

    #[cfg(unix)]
    #[test]
    fn backend_run_captures_exit_code_and_output() {
        let (temp, ctx) = setup();
        let console = temp.path().join("console.sh");
        std::fs::write(&console, "#!/bin/sh\necho \"------Project: $1\"\nexit 0\n").unwrap();
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&console, std::fs::Permissions::from_mode(0o755)).unwrap();

        let config = Config {
            distributed_tool: Some(console.display().to_string()),
            distributed_args: "{graph_file}".to_string(),
            ..Config::default()
        };
        let backend = ProcessBackend::new(&ctx, &config);
        assert!(backend.is_available());

        let run = backend.run(&ctx.graph_file(), false).unwrap();

        assert_eq!(run.exit_code, 0);
        assert!(run.output.contains("------Project:"));
        assert!(run.log_path.unwrap().is_file());
    }

    #[test]
    fn local_executor_unconfigured_is_unavailable() {
        let (_temp, ctx) = setup();
        let executor = ProcessLocalExecutor::new(&ctx, &Config::default());

        assert!(!executor.is_available());
        assert!(executor.run(&ctx.graph_file()).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn local_executor_returns_exit_code() {
        let (_temp, ctx) = setup();
        let config = Config {
            local_executor: Some("sh -c \"exit 5\" {graph_file}".to_string()),
            ..Config::default()
        };
        let executor = ProcessLocalExecutor::new(&ctx, &config);

        assert!(executor.is_available());
        assert_eq!(executor.run(&ctx.graph_file()).unwrap(), 5);
    }
}
