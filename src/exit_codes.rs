//! Exit code constants for the meld CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, config, agenda)
//! - 2: Malformed or unexpectedly empty action graph
//! - 3: Execution backend failure
//! - 4: Declared output missing after a reported success
//! - 5: Direct build failure
//! - 6: Compiler driver failure

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, unreadable config or agenda.
pub const USER_ERROR: i32 = 1;

/// The combined graph could not be built or was empty under a forced clean.
pub const GRAPH_FAILURE: i32 = 2;

/// The distributed backend or local executor failed.
pub const BACKEND_FAILURE: i32 = 3;

/// A declared output was not produced.
pub const MISSING_OUTPUT: i32 = 4;

/// A target built in direct mode returned a nonzero exit code.
pub const DIRECT_BUILD_FAILURE: i32 = 5;

/// The compiler driver could not be run or produced unreadable output.
pub const DRIVER_FAILURE: i32 = 6;
