//! Filesystem utilities for meld.
//!
//! Atomic writes for everything meld persists, and tolerant deletion for
//! purging outputs and emptying the export directory.

pub mod atomic;
mod remove;

pub use atomic::atomic_write;
pub use atomic::atomic_write_file;
pub use remove::{clear_dir, remove_if_exists};
