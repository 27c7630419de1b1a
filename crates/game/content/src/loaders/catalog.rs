//! Catalog loader.
//!
//! Loads skills, monsters, and dungeons from a single RON file and validates
//! every cross reference before handing out a [`ContentCatalog`].

use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, bail, ensure};
use game_core::{CatalogOracle, DungeonDefinition, MonsterTemplate, Skill, SkillEffect};
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

/// Catalog structure for RON files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(default)]
    pub monsters: Vec<MonsterTemplate>,
    #[serde(default)]
    pub dungeons: Vec<DungeonDefinition>,
}

/// Loader for the catalog RON file.
pub struct CatalogLoader;

impl CatalogLoader {
    /// Load and validate a catalog from a RON file.
    pub fn load(path: &Path) -> LoadResult<ContentCatalog> {
        let content = read_file(path)?;
        Self::parse(&content)
            .map_err(|e| anyhow!("Failed to load catalog {}: {}", path.display(), e))
    }

    /// Parse and validate a catalog from RON text.
    ///
    /// Unknown effect tags fail here, during deserialization.
    pub fn parse(content: &str) -> LoadResult<ContentCatalog> {
        let file: CatalogFile = ron::from_str(content)
            .map_err(|e| anyhow!("Failed to parse catalog RON: {}", e))?;
        ContentCatalog::from_file(file)
    }
}

/// Validated in-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct ContentCatalog {
    skills: HashMap<String, Skill>,
    monsters: HashMap<String, MonsterTemplate>,
    dungeons: HashMap<String, DungeonDefinition>,
}

impl ContentCatalog {
    /// Builds a catalog, rejecting duplicates and dangling references.
    pub fn from_file(file: CatalogFile) -> LoadResult<Self> {
        let mut catalog = Self::default();

        for skill in file.skills {
            let id = skill.id.clone();
            ensure!(!skill.effects.is_empty(), "skill '{}' has no effects", id);
            if catalog.skills.insert(id.clone(), skill).is_some() {
                bail!("duplicate skill id '{}'", id);
            }
        }
        for monster in file.monsters {
            let id = monster.id.clone();
            if catalog.monsters.insert(id.clone(), monster).is_some() {
                bail!("duplicate monster id '{}'", id);
            }
        }
        for dungeon in file.dungeons {
            let id = dungeon.id.clone();
            if catalog.dungeons.insert(id.clone(), dungeon).is_some() {
                bail!("duplicate dungeon id '{}'", id);
            }
        }

        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> LoadResult<()> {
        for skill in self.skills.values() {
            for effect in &skill.effects {
                if let SkillEffect::Summon(summon) = effect {
                    ensure!(
                        self.monsters.contains_key(&summon.monster),
                        "skill '{}' summons unknown monster '{}'",
                        skill.id,
                        summon.monster
                    );
                }
            }
        }

        for monster in self.monsters.values() {
            ensure!(monster.stats.max_hp > 0, "monster '{}' has no hp", monster.id);
            for skill in &monster.skills {
                ensure!(
                    self.skills.contains_key(skill),
                    "monster '{}' references unknown skill '{}'",
                    monster.id,
                    skill
                );
            }
        }

        for dungeon in self.dungeons.values() {
            ensure!(dungeon.steps > 0, "dungeon '{}' has no steps", dungeon.id);
            ensure!(
                !dungeon.monster_pool.is_empty(),
                "dungeon '{}' has an empty monster pool",
                dungeon.id
            );
            ensure!(
                dungeon.min_group >= 1 && dungeon.min_group <= dungeon.max_group,
                "dungeon '{}' has an invalid group size {}..={}",
                dungeon.id,
                dungeon.min_group,
                dungeon.max_group
            );
            ensure!(
                dungeon.encounter_chance <= 100,
                "dungeon '{}' encounter chance above 100",
                dungeon.id
            );
            for monster in dungeon.monster_pool.iter().chain(dungeon.boss.iter()) {
                ensure!(
                    self.monsters.contains_key(monster),
                    "dungeon '{}' references unknown monster '{}'",
                    dungeon.id,
                    monster
                );
            }
        }

        Ok(())
    }

    /// Dungeon ids in lexical order.
    pub fn dungeon_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.dungeons.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn skill_count(&self) -> usize {
        self.skills.len()
    }

    pub fn monster_count(&self) -> usize {
        self.monsters.len()
    }
}

impl CatalogOracle for ContentCatalog {
    fn monster_by_id(&self, id: &str) -> Option<MonsterTemplate> {
        self.monsters.get(id).cloned()
    }

    fn skill_by_id(&self, id: &str) -> Option<Skill> {
        self.skills.get(id).cloned()
    }

    fn dungeon_by_id(&self, id: &str) -> Option<DungeonDefinition> {
        self.dungeons.get(id).cloned()
    }
}
