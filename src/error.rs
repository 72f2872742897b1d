//! Error types for meld.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.
//! Every error carries enough context (target, path, exit code) to be reported
//! verbatim.

use crate::exit_codes;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for meld operations.
#[derive(Error, Debug)]
pub enum MeldError {
    /// User provided invalid arguments, config, or agenda, or a local I/O step failed.
    #[error("{0}")]
    UserError(String),

    /// The compiler driver could not be invoked or its output could not be read.
    #[error("compiler driver failed: {0}")]
    DriverError(String),

    /// A task depends on an action that has not been declared earlier in its file.
    #[error(
        "action not found '{action}' in {file}\n\
         The action file is not topologically sorted; dependencies must be declared before their dependents."
    )]
    ActionNotFound { action: String, file: String },

    /// The combined graph had no tasks although prior outputs were deleted.
    #[error(
        "no actions were produced for {targets} ({files} action file(s) combined) although all prior outputs were deleted"
    )]
    EmptyGraph { targets: String, files: usize },

    /// The distributed backend failed to reach its coordinator before doing any work.
    #[error("{tool} failed with connection exit code {exit_code} before any project started")]
    TransientConnectionFailure { tool: String, exit_code: i32 },

    /// The backend failed in a way that is not retried within an attempt.
    #[error("{tool} failed (exit code {exit_code}); see log '{log}'")]
    FatalBackendFailure {
        tool: String,
        exit_code: i32,
        log: String,
    },

    /// The last distributed attempt failed.
    #[error("distributed build failed after {attempts} attempt(s): {source}")]
    DistributedBuildFailed {
        attempts: u32,
        #[source]
        source: Box<MeldError>,
    },

    /// The backend reported success but a promised output does not exist.
    #[error("BUILD FAILED {target}: '{}' was in the manifest but was not produced", path.display())]
    MissingDeclaredOutput { target: String, path: PathBuf },

    /// A direct-mode driver invocation returned nonzero.
    #[error("direct build of {target} failed (exit code {exit_code})")]
    DirectBuildFailure { target: String, exit_code: i32 },
}

impl MeldError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            MeldError::UserError(_) => exit_codes::USER_ERROR,
            MeldError::DriverError(_) => exit_codes::DRIVER_FAILURE,
            MeldError::ActionNotFound { .. } | MeldError::EmptyGraph { .. } => exit_codes::GRAPH_FAILURE,
            MeldError::TransientConnectionFailure { .. }
            | MeldError::FatalBackendFailure { .. }
            | MeldError::DistributedBuildFailed { .. } => exit_codes::BACKEND_FAILURE,
            MeldError::MissingDeclaredOutput { .. } => exit_codes::MISSING_OUTPUT,
            MeldError::DirectBuildFailure { .. } => exit_codes::DIRECT_BUILD_FAILURE,
        }
    }
}

/// Result type alias for meld operations.
pub type Result<T> = std::result::Result<T, MeldError>;
