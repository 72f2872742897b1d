//! Declared build outputs and their reconciliation.
//!
//! A [`Manifest`] is what the compiler driver promises a target will produce.
//! After execution, [`reconcile`] checks every promise was kept, registers the
//! outputs in the [`ProductRegistry`] and runs the target's post-build hook.

mod reconcile;
mod registry;


pub use reconcile::reconcile;
pub use registry::ProductRegistry;

use crate::error::{MeldError, Result};
use crate::fs::remove_if_exists;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Outputs one target declares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    /// Files the build must produce.
    pub build_products: Vec<PathBuf>,
    /// Static libraries, tracked separately and never verified.
    pub library_build_products: Vec<PathBuf>,
}

impl Manifest {
    pub fn new<I, P>(build_products: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            build_products: build_products.into_iter().map(Into::into).collect(),
            library_build_products: Vec::new(),
        }
    }

    pub fn with_library_products<I, P>(mut self, products: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.library_build_products = products.into_iter().map(Into::into).collect();
        self
    }

    /// Read a manifest written by the compiler driver.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(MeldError::DriverError(format!(
                "manifest '{}' does not exist",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            MeldError::DriverError(format!(
                "failed to read manifest '{}': {}",
                path.display(),
                e
            ))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            MeldError::DriverError(format!(
                "failed to parse manifest '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// First declared build product that does not exist on disk.
    pub fn first_missing(&self) -> Option<&Path> {
        self.build_products
            .iter()
            .map(PathBuf::as_path)
            .find(|p| !p.exists())
    }

    /// Delete every declared build product. Returns how many files were removed.
    pub fn delete_build_products(&self) -> Result<usize> {
        let mut removed = 0;
        for product in &self.build_products {
            if remove_if_exists(product)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
