//! Running a collaborator program with its output captured to a log file.

use crate::error::{MeldError, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

/// Result of running a collaborator command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code of the process (-1 if terminated by a signal).
    pub exit_code: i32,
    /// Combined stdout and stderr, stdout first.
    pub output: String,
    /// Path to the log file holding the output.
    pub log_path: PathBuf,
    pub duration: Duration,
    /// The command line, for logging.
    pub command: String,
}

impl CommandOutput {
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Run `argv` in `working_dir` and save its output to `log_path`.
///
/// Fails only if the program cannot be started or the log cannot be written.
pub fn run_logged(argv: &[String], working_dir: &Path, log_path: &Path) -> Result<CommandOutput> {
    let Some((program, args)) = argv.split_first() else {
        return Err(MeldError::UserError("command is empty".to_string()));
    };
    let command_line = shell_words::join(argv);

    let start = Instant::now();
    let output = Command::new(program)
        .args(args)
        .current_dir(working_dir)
        .output()
        .map_err(|e| {
            MeldError::UserError(format!(
                "failed to execute '{}': {}\n\
                 Fix: ensure the program is installed and in PATH, or set its path in .meld/config.yaml.",
                program, e
            ))
        })?;
    let duration = start.elapsed();

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    let log = format!("$ {}\n{}", command_line, combined);
    crate::fs::atomic_write_file(log_path, &log)?;

    Ok(CommandOutput {
        exit_code: output.status.code().unwrap_or(-1),
        output: combined,
        log_path: log_path.to_path_buf(),
        duration,
        command: command_line,
    })
}
