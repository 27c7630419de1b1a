//! Catalog definitions and oracle interface.
//!
//! Templates are plain data that can be deserialized from RON content files.
//! Skills are referenced by id and resolved through the oracle when an actor
//! is spawned, so a bad reference surfaces as a [`CombatError`] at spawn time
//! rather than mid-round.

use crate::error::CombatError;
use crate::skill::Skill;
use crate::state::{Actor, ActorId, ActorKind, ActorStats};

/// Read access to skill, monster, and dungeon definitions.
pub trait CatalogOracle: Send + Sync {
    fn monster_by_id(&self, id: &str) -> Option<MonsterTemplate>;

    fn skill_by_id(&self, id: &str) -> Option<Skill>;

    fn dungeon_by_id(&self, id: &str) -> Option<DungeonDefinition>;

    /// Resolves a list of skill ids into a loadout.
    fn loadout(&self, skill_ids: &[String]) -> Result<Vec<Skill>, CombatError> {
        skill_ids
            .iter()
            .map(|id| {
                self.skill_by_id(id)
                    .ok_or_else(|| CombatError::SkillMissing(id.clone()))
            })
            .collect()
    }
}

/// Monster definition.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MonsterTemplate {
    pub id: String,
    pub name: String,
    pub level: u32,
    pub stats: ActorStats,
    #[cfg_attr(feature = "serde", serde(default))]
    pub skills: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub boss: bool,
    pub exp: u64,
    pub gold: u64,
}

impl MonsterTemplate {
    /// Builds a fresh monster actor with its loadout resolved.
    pub fn spawn(&self, id: ActorId, catalog: &dyn CatalogOracle) -> Result<Actor, CombatError> {
        let kind = ActorKind::Monster {
            template: self.id.clone(),
            boss: self.boss,
            exp: self.exp,
            gold: self.gold,
        };
        let loadout = catalog.loadout(&self.skills)?;
        Ok(Actor::new(id, self.name.clone(), kind, self.stats).with_loadout(loadout))
    }
}

/// Environmental modifier applied during every round's end phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum FieldEffect {
    /// Every living actor loses a share of max hp.
    Scorching,
    /// Players are poisoned.
    Miasma,
    /// Players regenerate.
    Sanctuary,
}

/// Dungeon definition driving exploration and encounter generation.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DungeonDefinition {
    pub id: String,
    pub name: String,
    /// Minimum player level for admission into this dungeon's encounters.
    pub min_level: u32,
    /// Exploration steps; the boss waits on the last one.
    pub steps: u32,
    /// Percent chance of a monster encounter per step.
    pub encounter_chance: u32,
    /// Percent of max hp restored by a rest event.
    #[cfg_attr(feature = "serde", serde(default = "default_rest_heal"))]
    pub rest_heal_percent: u32,
    pub monster_pool: Vec<String>,
    pub min_group: u32,
    pub max_group: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub boss: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub field: Option<FieldEffect>,
}

#[cfg(feature = "serde")]
fn default_rest_heal() -> u32 {
    30
}
