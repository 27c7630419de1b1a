//! Content factory for building the catalog from data files.

use std::path::{Path, PathBuf};

use crate::loaders::{CatalogLoader, ContentCatalog, LoadResult};

/// Catalog shipped with the crate.
const BUNDLED_CATALOG: &str = include_str!("../../data/catalog.ron");

/// Content factory that loads game content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// └── catalog.ron
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    /// Creates a new content factory pointing to a data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Load the catalog from `catalog.ron`.
    pub fn load_catalog(&self) -> LoadResult<ContentCatalog> {
        let path = self.data_dir.join("catalog.ron");
        CatalogLoader::load(&path)
    }

    /// Parse the catalog compiled into this crate.
    pub fn bundled() -> LoadResult<ContentCatalog> {
        CatalogLoader::parse(BUNDLED_CATALOG)
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use game_core::CatalogOracle;

    use super::*;

    #[test]
    fn test_factory_paths() {
        let factory = ContentFactory::new("/tmp/data");
        assert_eq!(factory.data_dir(), Path::new("/tmp/data"));
    }

    #[test]
    fn bundled_catalog_is_valid() {
        let catalog = ContentFactory::bundled().unwrap();

        assert_eq!(
            catalog.dungeon_ids(),
            vec!["ember_spire", "goblin_warren", "sunken_crypt"]
        );
        let king = catalog.monster_by_id("goblin_king").unwrap();
        assert!(king.boss);
        assert_eq!(catalog.loadout(&king.skills).unwrap().len(), 5);
    }

    #[test]
    fn data_dir_catalog_matches_bundled() {
        let factory = ContentFactory::new(concat!(env!("CARGO_MANIFEST_DIR"), "/data"));
        let catalog = factory.load_catalog().unwrap();
        assert_eq!(
            catalog.skill_count(),
            ContentFactory::bundled().unwrap().skill_count()
        );
    }

    #[test]
    fn missing_directory_reports_path() {
        let err = ContentFactory::new("/nonexistent/content")
            .load_catalog()
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/content"));
    }
}
