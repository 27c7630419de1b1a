//! Skill effect system.
//!
//! A skill is a named list of effect units. Every unit belongs to one hook
//! point of an actor's turn:
//!
//! - [`HookPoint::PreAction`]: start of the round, for every unit in the
//!   actor's loadout (passive buffs, first strikes)
//! - [`HookPoint::Action`]: only the units of the skill being used
//! - [`HookPoint::PostAction`]: after the action, for every unit in the
//!   loadout, plus counter-attacks of the actors that were hit
//!
//! Revive is not bound to a hook. It fires from the damage path whenever its
//! owner drops to 0 hp.
//!
//! # Architecture
//!
//! Individual effect types are structs with one method per hook they support.
//! [`SkillEffect`] wraps them in a closed enum for serialization and static
//! dispatch, so an unknown effect tag fails at content load time.

mod context;
mod effects;
mod kinds;
mod resolver;

pub use context::{ActionReport, ActionTally, EffectContext, EffectLine, SummonRequest};
pub(crate) use context::apply_damage;
pub use effects::{
    ApplyStatusEffect, ChainAttackEffect, ComboEffect, CounterAttackEffect, DirectDamageEffect,
    FirstStrikeEffect, RegenerationEffect, ReviveEffect, StatBuffEffect, SummonEffect,
};
pub use kinds::SkillEffect;
pub use resolver::SkillEffectResolver;

/// Point in an actor's turn where an effect unit runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum HookPoint {
    PreAction,
    Action,
    PostAction,
}

/// A named bundle of effect units.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Skill {
    pub id: String,
    pub name: String,
    pub effects: Vec<SkillEffect>,
}

impl Skill {
    pub fn new(id: impl Into<String>, name: impl Into<String>, effects: Vec<SkillEffect>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            effects,
        }
    }

    /// Plain single-target attack used when an actor has no active skill.
    pub fn basic_attack() -> Self {
        Self::new(
            "basic_attack",
            "Attack",
            vec![SkillEffect::DirectDamage(DirectDamageEffect::single(100))],
        )
    }

    /// True when the skill can be selected as an action.
    pub fn is_active(&self) -> bool {
        self.effects
            .iter()
            .any(|effect| effect.hook() == Some(HookPoint::Action))
    }

    pub fn units(&self, hook: HookPoint) -> impl Iterator<Item = &SkillEffect> {
        self.effects
            .iter()
            .filter(move |effect| effect.hook() == Some(hook))
    }
}
