//! Data-driven content definitions and loaders.
//!
//! This crate houses the static catalog (skills, monsters, dungeons) and the
//! loaders that read it from RON:
//! - Skills with their effect units
//! - Monster templates
//! - Dungeon definitions
//!
//! Content is consumed by the runtime through [`game_core::CatalogOracle`] and
//! never appears in session state.

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{CatalogFile, CatalogLoader, ContentCatalog, ContentFactory, LoadResult};
