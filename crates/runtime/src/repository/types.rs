//! Persisted record types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use game_core::{ActorStats, CatalogOracle, CombatError, CombatOutcome, PlayerProfile, UserId};

use super::{RepositoryError, Result};

/// Days an encounter history record is kept before it may be purged.
pub const ENCOUNTER_RETENTION_DAYS: i64 = 7;

/// A user's character as stored between sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorRecord {
    pub user: UserId,
    pub name: String,
    pub level: u32,
    pub hp: u32,
    pub stats: ActorStats,
    /// Skill ids, resolved through the catalog when entering combat.
    pub skills: Vec<String>,
    pub exp: u64,
    pub gold: u64,
    /// Stamped when an admission into someone else's encounter commits.
    pub last_intervention_at: Option<DateTime<Utc>>,
}

impl ActorRecord {
    pub fn new(
        user: UserId,
        name: impl Into<String>,
        level: u32,
        stats: ActorStats,
        skills: Vec<String>,
    ) -> Self {
        Self {
            user,
            name: name.into(),
            level,
            hp: stats.max_hp,
            stats,
            skills,
            exp: 0,
            gold: 0,
            last_intervention_at: None,
        }
    }

    #[must_use]
    pub fn with_gold(mut self, gold: u64) -> Self {
        self.gold = gold;
        self
    }

    pub fn debit(&mut self, amount: u64) -> Result<()> {
        self.gold = self
            .gold
            .checked_sub(amount)
            .ok_or(RepositoryError::InsufficientFunds {
                user: self.user,
                required: amount,
                available: self.gold,
            })?;
        Ok(())
    }

    pub fn credit(&mut self, exp: u64, gold: u64) {
        self.exp = self.exp.saturating_add(exp);
        self.gold = self.gold.saturating_add(gold);
    }

    /// Seconds left before another admission is allowed, if any.
    pub fn cooldown_remaining(&self, now: DateTime<Utc>, cooldown_secs: u64) -> Option<u64> {
        let stamped = self.last_intervention_at?;
        let ready_at = stamped + Duration::seconds(i64::try_from(cooldown_secs).ok()?);
        (ready_at > now).then(|| (ready_at - now).num_seconds().max(1) as u64)
    }

    /// Resolves the loadout and builds the combat profile.
    ///
    /// A character knocked out in an earlier encounter enters with 1 hp.
    pub fn profile(
        &self,
        catalog: &dyn CatalogOracle,
    ) -> std::result::Result<PlayerProfile, CombatError> {
        Ok(PlayerProfile {
            user: self.user,
            name: self.name.clone(),
            level: self.level,
            hp: self.hp.clamp(1, self.stats.max_hp.max(1)),
            stats: self.stats,
            loadout: catalog.loadout(&self.skills)?,
        })
    }
}

/// One finished encounter in the history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterRecord {
    /// Encounter leader.
    pub actor: UserId,
    /// Dungeon id.
    pub location: String,
    /// Name of the leading monster.
    pub monster: String,
    pub result: CombatOutcome,
    pub participants: u32,
    pub total_damage: u64,
    pub rounds: u32,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl EncounterRecord {
    /// Builds a record stamped at `created_at`, expiring after the retention
    /// window.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        actor: UserId,
        location: impl Into<String>,
        monster: impl Into<String>,
        result: CombatOutcome,
        participants: u32,
        total_damage: u64,
        rounds: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            actor,
            location: location.into(),
            monster: monster.into(),
            result,
            participants,
            total_damage,
            rounds,
            created_at,
            expires_at: created_at + Duration::days(ENCOUNTER_RETENTION_DAYS),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
