//! Effect unit implementations.
//!
//! Each unit exposes one method per hook it participates in. A unit that has
//! nothing to do (missing prerequisite, failed proc, dead target) returns
//! `Ok(None)` and leaves the roster untouched.

use crate::error::CombatError;
use crate::skill::{EffectContext, EffectLine, SummonRequest};
use crate::state::{Actor, Side, StatusKind};

/// Monsters a single side may field at once, summons included.
const MAX_SIDE_SIZE: usize = 8;

// ============================================================================
// Action units
// ============================================================================

/// Damage scaled from the caster's attack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DirectDamageEffect {
    /// 100 = plain attack.
    pub power: u32,
    /// Hits every living opponent instead of the chosen target.
    #[cfg_attr(feature = "serde", serde(default))]
    pub area: bool,
}

impl DirectDamageEffect {
    pub const fn single(power: u32) -> Self {
        Self { power, area: false }
    }

    pub fn action(&self, ctx: &mut EffectContext<'_>) -> Result<Option<EffectLine>, CombatError> {
        let targets = if self.area {
            let side = ctx.caster()?.side().opponent();
            ctx.roster.living(side)
        } else {
            ctx.live_target()?.into_iter().collect()
        };

        let mut parts = Vec::with_capacity(targets.len());
        for target in targets {
            let dealt = ctx.strike(target, self.power)?;
            parts.push(format!("{} for {}", ctx.name(target), dealt));
        }
        if parts.is_empty() {
            return Ok(None);
        }

        let text = format!("{} hits {}", ctx.name(ctx.caster), parts.join(", "));
        Ok(Some(EffectLine::new(ctx.caster, text)))
    }
}

/// Applies stacks of a status to the target (or the caster).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ApplyStatusEffect {
    pub status: StatusKind,
    pub stacks: u8,
    pub duration: u8,
    #[cfg_attr(feature = "serde", serde(default))]
    pub on_self: bool,
}

impl ApplyStatusEffect {
    pub fn action(&self, ctx: &mut EffectContext<'_>) -> Result<Option<EffectLine>, CombatError> {
        let recipient = if self.on_self {
            Some(ctx.caster)
        } else {
            ctx.live_target()?
        };
        let Some(recipient) = recipient else {
            return Ok(None);
        };

        let actor = ctx.actor_mut(recipient)?;
        if !actor.is_alive() {
            return Ok(None);
        }
        let Some(entry) = actor.statuses.apply(self.status, self.stacks, self.duration) else {
            return Ok(None);
        };

        let text = format!(
            "{} suffers {} x{} ({} rounds)",
            actor.name, self.status, entry.stacks, entry.remaining
        );
        Ok(Some(EffectLine::new(ctx.caster, text)))
    }
}

/// Bonus damage from a status built up on the target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComboEffect {
    pub requires: StatusKind,
    pub min_stacks: u8,
    /// Power added per stack.
    pub power_per_stack: u32,
    /// Whether the stacks are used up by the hit.
    #[cfg_attr(feature = "serde", serde(default = "always"))]
    pub consume: bool,
}

#[cfg(feature = "serde")]
fn always() -> bool {
    true
}

#[cfg(feature = "serde")]
fn guaranteed() -> u32 {
    100
}

impl ComboEffect {
    pub fn action(&self, ctx: &mut EffectContext<'_>) -> Result<Option<EffectLine>, CombatError> {
        let Some(target) = ctx.live_target()? else {
            return Ok(None);
        };
        if ctx.actor(target)?.statuses.stacks(self.requires) < self.min_stacks.max(1) {
            return Ok(None);
        }

        let stacks = if self.consume {
            ctx.actor_mut(target)?.statuses.consume(self.requires)
        } else {
            ctx.actor(target)?.statuses.stacks(self.requires)
        };
        let power = self.power_per_stack * u32::from(stacks);
        let dealt = ctx.strike(target, power)?;

        let verb = if self.consume { "detonates" } else { "exploits" };
        let text = format!(
            "{} {} {} {} on {} for {}",
            ctx.name(ctx.caster),
            verb,
            stacks,
            self.requires,
            ctx.name(target),
            dealt
        );
        Ok(Some(EffectLine::new(ctx.caster, text)))
    }
}

/// Calls reinforcements onto the monster side.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SummonEffect {
    pub monster: String,
    pub count: u8,
}

impl SummonEffect {
    pub fn action(&self, ctx: &mut EffectContext<'_>) -> Result<Option<EffectLine>, CombatError> {
        let side = ctx.caster()?.side();
        if side != Side::Monsters {
            return Ok(None);
        }

        let fielded = ctx.roster.living(side).len() + ctx.report.summons.len();
        let count = usize::from(self.count).min(MAX_SIDE_SIZE.saturating_sub(fielded));
        if count == 0 {
            return Ok(None);
        }

        for _ in 0..count {
            ctx.report.summons.push(SummonRequest {
                side,
                template: self.monster.clone(),
            });
        }
        let text = format!("{} summons {} x{}", ctx.name(ctx.caster), self.monster, count);
        Ok(Some(EffectLine::new(ctx.caster, text)))
    }
}

// ============================================================================
// Pre-action units
// ============================================================================

/// Passive percent bonus, applied on the owner's first pre-action of a combat.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatBuffEffect {
    #[cfg_attr(feature = "serde", serde(default))]
    pub attack_percent: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub defense_percent: u32,
}

impl StatBuffEffect {
    pub fn pre_action(
        &self,
        ctx: &mut EffectContext<'_>,
    ) -> Result<Option<EffectLine>, CombatError> {
        let caster = ctx.caster;
        let actor = ctx.actor_mut(caster)?;
        if actor.buffs_applied {
            return Ok(None);
        }
        actor.bonus.attack_percent += self.attack_percent;
        actor.bonus.defense_percent += self.defense_percent;

        let text = format!(
            "{} steels themselves (+{}% atk, +{}% def)",
            actor.name, self.attack_percent, self.defense_percent
        );
        Ok(Some(EffectLine::new(caster, text)))
    }
}

/// Free opening hit in the first round of a combat.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FirstStrikeEffect {
    pub power: u32,
    /// Percent chance to strike. 100 always strikes.
    #[cfg_attr(feature = "serde", serde(default = "guaranteed"))]
    pub chance: u32,
}

impl FirstStrikeEffect {
    pub fn pre_action(
        &self,
        ctx: &mut EffectContext<'_>,
    ) -> Result<Option<EffectLine>, CombatError> {
        if ctx.round != 1 {
            return Ok(None);
        }
        if self.chance < 100 && !ctx.dice.chance(self.chance) {
            return Ok(None);
        }
        let side = ctx.caster()?.side().opponent();
        let living = ctx.roster.living(side);
        if living.is_empty() {
            return Ok(None);
        }
        let target = living[ctx.dice.pick(living.len())];
        let dealt = ctx.strike(target, self.power)?;

        let text = format!(
            "{} strikes first at {} for {}",
            ctx.name(ctx.caster),
            ctx.name(target),
            dealt
        );
        Ok(Some(EffectLine::new(ctx.caster, text)))
    }
}

// ============================================================================
// Post-action units
// ============================================================================

/// Chance to retaliate against an attacker. Runs for the defender, with the
/// attacker as target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CounterAttackEffect {
    pub power: u32,
    /// Percent chance per hit received.
    pub chance: u32,
}

impl CounterAttackEffect {
    pub fn post_action(
        &self,
        ctx: &mut EffectContext<'_>,
    ) -> Result<Option<EffectLine>, CombatError> {
        let Some(attacker) = ctx.target else {
            return Ok(None);
        };
        if !ctx.caster()?.is_alive() || !ctx.actor(attacker)?.is_alive() {
            return Ok(None);
        }
        if !ctx.dice.chance(self.chance) {
            return Ok(None);
        }

        let dealt = ctx.strike(attacker, self.power)?;
        let text = format!(
            "{} counters {} for {}",
            ctx.name(ctx.caster),
            ctx.name(attacker),
            dealt
        );
        Ok(Some(EffectLine::new(ctx.caster, text)))
    }
}

/// Chance to follow up on another living opponent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChainAttackEffect {
    pub power: u32,
    pub chance: u32,
}

impl ChainAttackEffect {
    pub fn post_action(
        &self,
        ctx: &mut EffectContext<'_>,
    ) -> Result<Option<EffectLine>, CombatError> {
        if !ctx.caster()?.is_alive() {
            return Ok(None);
        }
        let side = ctx.caster()?.side().opponent();
        let living = ctx.roster.living(side);
        let next = living
            .iter()
            .copied()
            .find(|id| Some(*id) != ctx.target)
            .or_else(|| living.first().copied());
        let Some(next) = next else {
            return Ok(None);
        };
        if !ctx.dice.chance(self.chance) {
            return Ok(None);
        }

        let dealt = ctx.strike(next, self.power)?;
        let text = format!(
            "{} chains into {} for {}",
            ctx.name(ctx.caster),
            ctx.name(next),
            dealt
        );
        Ok(Some(EffectLine::new(ctx.caster, text)))
    }
}

/// Heals the owner after each of its actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegenerationEffect {
    /// Percent of max hp.
    pub percent: u32,
}

impl RegenerationEffect {
    pub fn post_action(
        &self,
        ctx: &mut EffectContext<'_>,
    ) -> Result<Option<EffectLine>, CombatError> {
        let caster = ctx.caster;
        let amount = {
            let actor = ctx.caster()?;
            if !actor.is_alive() {
                return Ok(None);
            }
            actor.max_hp_percent(self.percent)
        };
        let gained = ctx.heal(caster, caster, amount)?;
        if gained == 0 {
            return Ok(None);
        }
        let text = format!("{} regenerates {}", ctx.name(caster), gained);
        Ok(Some(EffectLine::new(caster, text)))
    }
}

// ============================================================================
// Damage-path units
// ============================================================================

/// Brings the owner back once per combat.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReviveEffect {
    /// Percent of max hp restored.
    pub percent: u32,
}

impl ReviveEffect {
    /// Called when `actor` has just dropped to 0 hp.
    pub fn on_death(&self, actor: &mut Actor) -> Option<EffectLine> {
        if actor.revive_used || actor.is_alive() {
            return None;
        }
        actor.revive_used = true;
        actor.hp = actor.max_hp_percent(self.percent).min(actor.stats.max_hp);
        actor.statuses.clear_debuffs();
        Some(EffectLine::new(
            actor.id,
            format!("{} rises again with {} hp", actor.name, actor.hp),
        ))
    }
}
