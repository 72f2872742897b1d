//! Meld: combine per-target action graphs into one and run it on a
//! distributed or local executor.
//!
//! This is the main entry point for the `meld` CLI. It parses arguments,
//! dispatches to the appropriate command handler, and handles errors with
//! proper exit codes.

mod cli;
mod commands;
pub mod agenda;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod fs;
pub mod graph;
pub mod manifest;
pub mod orchestrator;

#[cfg(test)]
mod test_support;

use cli::Cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    match commands::dispatch(cli.command) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
