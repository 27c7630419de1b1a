//! Combat actors: players and monsters sharing one stat model.

use crate::skill::Skill;
use crate::state::{ActorId, Side, StatusEffects, StatusKind, UserId};

/// Percent of attack removed per Weaken stack.
const WEAKEN_PERCENT_PER_STACK: u32 = 10;
/// Weaken never removes more than this share of attack.
const WEAKEN_PERCENT_CAP: u32 = 50;
/// Percent of defense added per Fortify stack.
const FORTIFY_PERCENT_PER_STACK: u32 = 10;

/// Base combat statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActorStats {
    pub max_hp: u32,
    pub attack: u32,
    pub defense: u32,
    pub speed: u32,
}

impl ActorStats {
    pub const fn new(max_hp: u32, attack: u32, defense: u32, speed: u32) -> Self {
        Self {
            max_hp,
            attack,
            defense,
            speed,
        }
    }
}

/// Who controls the actor, plus the data that depends on it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActorKind {
    Player {
        user: UserId,
        level: u32,
    },
    Monster {
        template: String,
        boss: bool,
        exp: u64,
        gold: u64,
    },
}

/// Percent modifiers granted by passive stat buffs. Applied once per combat.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatBonus {
    pub attack_percent: u32,
    pub defense_percent: u32,
}

/// Everything needed to put a player into an encounter.
///
/// Built by the runtime from the persisted actor record and the catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerProfile {
    pub user: UserId,
    pub name: String,
    pub level: u32,
    /// Current hp; clamped to `stats.max_hp` on spawn.
    pub hp: u32,
    pub stats: ActorStats,
    pub loadout: Vec<Skill>,
}

/// A combatant inside a [`CombatContext`](crate::combat::CombatContext).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    pub kind: ActorKind,
    pub hp: u32,
    pub stats: ActorStats,
    pub statuses: StatusEffects,
    /// Skill queue. Active skills are used in rotation.
    pub loadout: Vec<Skill>,
    cursor: usize,
    pub bonus: StatBonus,
    /// Passive stat buffs already applied this combat.
    pub buffs_applied: bool,
    /// One-shot revive already consumed.
    pub revive_used: bool,
}

impl Actor {
    pub fn new(id: ActorId, name: impl Into<String>, kind: ActorKind, stats: ActorStats) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            hp: stats.max_hp,
            stats,
            statuses: StatusEffects::empty(),
            loadout: Vec::new(),
            cursor: 0,
            bonus: StatBonus::default(),
            buffs_applied: false,
            revive_used: false,
        }
    }

    pub fn from_profile(id: ActorId, profile: PlayerProfile) -> Self {
        let kind = ActorKind::Player {
            user: profile.user,
            level: profile.level,
        };
        Self::new(id, profile.name, kind, profile.stats)
            .with_hp(profile.hp)
            .with_loadout(profile.loadout)
    }

    #[must_use]
    pub fn with_hp(mut self, hp: u32) -> Self {
        self.hp = hp.min(self.stats.max_hp);
        self
    }

    #[must_use]
    pub fn with_loadout(mut self, loadout: Vec<Skill>) -> Self {
        self.loadout = loadout;
        self
    }

    pub fn side(&self) -> Side {
        match self.kind {
            ActorKind::Player { .. } => Side::Players,
            ActorKind::Monster { .. } => Side::Monsters,
        }
    }

    pub fn user(&self) -> Option<UserId> {
        match self.kind {
            ActorKind::Player { user, .. } => Some(user),
            ActorKind::Monster { .. } => None,
        }
    }

    pub fn is_boss(&self) -> bool {
        matches!(self.kind, ActorKind::Monster { boss: true, .. })
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Attack after stat buffs and Weaken.
    pub fn effective_attack(&self) -> u32 {
        let weaken = (u32::from(self.statuses.stacks(StatusKind::Weaken))
            * WEAKEN_PERCENT_PER_STACK)
            .min(WEAKEN_PERCENT_CAP);
        let percent = (100 + self.bonus.attack_percent).saturating_sub(weaken);
        scale(self.stats.attack, percent)
    }

    /// Defense after stat buffs and Fortify.
    pub fn effective_defense(&self) -> u32 {
        let fortify =
            u32::from(self.statuses.stacks(StatusKind::Fortify)) * FORTIFY_PERCENT_PER_STACK;
        scale(self.stats.defense, 100 + self.bonus.defense_percent + fortify)
    }

    /// Damage this actor deals to `target` with a skill of the given power
    /// (100 = plain attack). Never below 1.
    pub fn damage_against(&self, target: &Actor, power: u32) -> u32 {
        let raw = scale(self.effective_attack(), power);
        raw.saturating_sub(target.effective_defense() / 2).max(1)
    }

    /// Removes up to `amount` hp and returns the hp actually lost.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        let lost = amount.min(self.hp);
        self.hp -= lost;
        lost
    }

    /// Restores up to `amount` hp (capped at max) and returns the hp gained.
    pub fn heal(&mut self, amount: u32) -> u32 {
        if !self.is_alive() {
            return 0;
        }
        let gained = amount.min(self.stats.max_hp - self.hp.min(self.stats.max_hp));
        self.hp += gained;
        gained
    }

    /// `percent` of max hp, at least 1.
    pub fn max_hp_percent(&self, percent: u32) -> u32 {
        scale(self.stats.max_hp, percent).max(1)
    }

    /// Pops the next active skill from the rotating queue.
    ///
    /// Passive-only skills are skipped. Returns `None` when the loadout has no
    /// active skill at all.
    pub fn next_skill(&mut self) -> Option<Skill> {
        let len = self.loadout.len();
        for offset in 0..len {
            let index = (self.cursor + offset) % len;
            if self.loadout[index].is_active() {
                self.cursor = (index + 1) % len;
                return Some(self.loadout[index].clone());
            }
        }
        None
    }
}

fn scale(value: u32, percent: u32) -> u32 {
    ((u64::from(value) * u64::from(percent)) / 100) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skill::{DirectDamageEffect, SkillEffect, StatBuffEffect};

    fn fighter() -> Actor {
        Actor::new(
            ActorId(1),
            "fighter",
            ActorKind::Player {
                user: UserId(7),
                level: 5,
            },
            ActorStats::new(100, 20, 10, 60),
        )
    }

    #[test]
    fn weaken_is_capped_and_fortify_stacks() {
        let mut actor = fighter();
        actor.statuses.apply(StatusKind::Weaken, 9, 3);
        actor.statuses.apply(StatusKind::Fortify, 2, 3);

        assert_eq!(actor.effective_attack(), 10);
        assert_eq!(actor.effective_defense(), 12);
    }

    #[test]
    fn damage_is_never_below_one() {
        let weak = fighter();
        let mut wall = fighter();
        wall.stats.defense = 500;

        assert_eq!(weak.damage_against(&wall, 100), 1);
    }

    #[test]
    fn heal_is_capped_and_dead_actors_stay_dead() {
        let mut actor = fighter().with_hp(95);
        assert_eq!(actor.heal(20), 5);

        actor.take_damage(500);
        assert!(!actor.is_alive());
        assert_eq!(actor.heal(20), 0);
    }

    #[test]
    fn skill_queue_rotates_over_active_skills() {
        let strike = Skill::new(
            "strike",
            "Strike",
            vec![SkillEffect::DirectDamage(DirectDamageEffect::single(100))],
        );
        let guard = Skill::new(
            "guard",
            "Guard",
            vec![SkillEffect::StatBuff(StatBuffEffect {
                attack_percent: 0,
                defense_percent: 20,
            })],
        );
        let bash = Skill::new(
            "bash",
            "Bash",
            vec![SkillEffect::DirectDamage(DirectDamageEffect::single(140))],
        );
        let mut actor = fighter().with_loadout(vec![strike, guard, bash]);

        let picked: Vec<String> = (0..4)
            .filter_map(|_| actor.next_skill())
            .map(|skill| skill.id)
            .collect();

        assert_eq!(picked, ["strike", "bash", "strike", "bash"]);
    }
}
