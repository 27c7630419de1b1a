//! Content loaders for reading game data from files.
//!
//! Loaders convert RON files into [`ContentCatalog`], which implements the
//! catalog oracle consumed by combat and the runtime.

pub mod catalog;
pub mod factory;

pub use catalog::{CatalogFile, CatalogLoader, ContentCatalog};
pub use factory::ContentFactory;

use std::path::Path;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}
