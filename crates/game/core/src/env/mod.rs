//! Traits describing read-only catalog data.
//!
//! The catalog exposes skill, monster, and dungeon definitions. Combat code
//! reads it through [`CatalogOracle`] so the rules never depend on how the
//! content is stored.
mod catalog;
mod rng;

pub use catalog::{CatalogOracle, DungeonDefinition, FieldEffect, MonsterTemplate};
pub use rng::{Dice, PcgRng, RngOracle, compute_seed};

use crate::config::CombatConfig;

/// Read-only collaborators a combat round needs.
#[derive(Clone, Copy)]
pub struct CombatEnv<'a> {
    pub catalog: &'a dyn CatalogOracle,
    pub config: &'a CombatConfig,
}

impl<'a> CombatEnv<'a> {
    pub fn new(catalog: &'a dyn CatalogOracle, config: &'a CombatConfig) -> Self {
        Self { catalog, config }
    }
}
