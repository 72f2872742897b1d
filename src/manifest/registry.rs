//! The set of build products registered so far.

use std::path::{Path, PathBuf};

/// Registered build products, in registration order.
///
/// Registration is idempotent. Paths compare case-insensitively, since the
/// driver may spell one file differently across targets on case-insensitive
/// filesystems.
#[derive(Debug, Clone, Default)]
pub struct ProductRegistry {
    products: Vec<PathBuf>,
    library_products: Vec<PathBuf>,
}

impl ProductRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a build product. Returns `false` if it was already registered.
    pub fn add_product(&mut self, path: &Path) -> bool {
        insert_unique(&mut self.products, path)
    }

    /// Record a library product. Returns `false` if it was already recorded.
    pub fn add_library_product(&mut self, path: &Path) -> bool {
        insert_unique(&mut self.library_products, path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.products.iter().any(|p| same_product(p, path))
    }

    /// True only if `path` was registered with exactly this spelling.
    pub fn contains_exact(&self, path: &Path) -> bool {
        self.products.iter().any(|p| p == path)
    }

    pub fn products(&self) -> &[PathBuf] {
        &self.products
    }

    pub fn library_products(&self) -> &[PathBuf] {
        &self.library_products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

fn insert_unique(list: &mut Vec<PathBuf>, path: &Path) -> bool {
    if list.iter().any(|p| same_product(p, path)) {
        return false;
    }
    list.push(path.to_path_buf());
    true
}

fn same_product(a: &Path, b: &Path) -> bool {
    a.to_string_lossy()
        .eq_ignore_ascii_case(&b.to_string_lossy())
}
