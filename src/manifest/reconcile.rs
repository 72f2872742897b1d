use super::{Manifest, ProductRegistry};
use crate::agenda::BuildTarget;
use crate::driver::CompilerDriver;
use crate::error::{MeldError, Result};
use std::path::PathBuf;

/// Verify, register and finalize one target's declared outputs.
///
/// Every build product is checked before any is registered, so a failure
/// leaves the registry untouched for this target. The post-build hook runs
/// once, only after verification succeeded.
///
/// Returns the target's build products in manifest order.
pub fn reconcile(
    target: &BuildTarget,
    manifest: &Manifest,
    registry: &mut ProductRegistry,
    driver: &dyn CompilerDriver,
) -> Result<Vec<PathBuf>> {
    if let Some(missing) = manifest.first_missing() {
        return Err(MeldError::MissingDeclaredOutput {
            target: target.caption(),
            path: missing.to_path_buf(),
        });
    }

    for product in &manifest.build_products {
        registry.add_product(product);
    }
    for library in &manifest.library_build_products {
        registry.add_library_product(library);
    }

    driver.post_build(target)?;

    Ok(manifest.build_products.clone())
}
