//! Command implementations for meld.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations.

mod build;
mod combine;
mod init;

use crate::cli::Command;
use crate::error::Result;

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Init(args) => init::cmd_init(args),
        Command::Build(args) => build::cmd_build(args),
        Command::Combine(args) => combine::cmd_combine(args),
    }
}
