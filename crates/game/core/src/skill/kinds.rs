use crate::error::CombatError;
use crate::skill::{
    ApplyStatusEffect, ChainAttackEffect, ComboEffect, CounterAttackEffect, DirectDamageEffect,
    EffectContext, EffectLine, FirstStrikeEffect, HookPoint, RegenerationEffect, ReviveEffect,
    StatBuffEffect, SummonEffect,
};

/// Closed set of effect units a skill can carry.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SkillEffect {
    DirectDamage(DirectDamageEffect),
    ApplyStatus(ApplyStatusEffect),
    Combo(ComboEffect),
    Summon(SummonEffect),
    StatBuff(StatBuffEffect),
    FirstStrike(FirstStrikeEffect),
    CounterAttack(CounterAttackEffect),
    ChainAttack(ChainAttackEffect),
    Regeneration(RegenerationEffect),
    Revive(ReviveEffect),
}

impl SkillEffect {
    /// Hook the unit runs at. `None` for units triggered from the damage path.
    pub const fn hook(&self) -> Option<HookPoint> {
        match self {
            Self::DirectDamage(_) | Self::ApplyStatus(_) | Self::Combo(_) | Self::Summon(_) => {
                Some(HookPoint::Action)
            }
            Self::StatBuff(_) | Self::FirstStrike(_) => Some(HookPoint::PreAction),
            Self::CounterAttack(_) | Self::ChainAttack(_) | Self::Regeneration(_) => {
                Some(HookPoint::PostAction)
            }
            Self::Revive(_) => None,
        }
    }

    /// Runs the unit at its hook point.
    ///
    /// Counter-attacks are not run here: they belong to the defender and are
    /// dispatched through [`SkillEffect::counter`].
    pub fn run(&self, ctx: &mut EffectContext<'_>) -> Result<Option<EffectLine>, CombatError> {
        match self {
            Self::DirectDamage(effect) => effect.action(ctx),
            Self::ApplyStatus(effect) => effect.action(ctx),
            Self::Combo(effect) => effect.action(ctx),
            Self::Summon(effect) => effect.action(ctx),
            Self::StatBuff(effect) => effect.pre_action(ctx),
            Self::FirstStrike(effect) => effect.pre_action(ctx),
            Self::ChainAttack(effect) => effect.post_action(ctx),
            Self::Regeneration(effect) => effect.post_action(ctx),
            Self::CounterAttack(_) | Self::Revive(_) => Ok(None),
        }
    }

    /// Runs a counter-attack unit for a defender; no-op for other units.
    pub fn counter(&self, ctx: &mut EffectContext<'_>) -> Result<Option<EffectLine>, CombatError> {
        match self {
            Self::CounterAttack(effect) => effect.post_action(ctx),
            _ => Ok(None),
        }
    }

    pub const fn tag(&self) -> &'static str {
        match self {
            Self::DirectDamage(_) => "direct_damage",
            Self::ApplyStatus(_) => "apply_status",
            Self::Combo(_) => "combo",
            Self::Summon(_) => "summon",
            Self::StatBuff(_) => "stat_buff",
            Self::FirstStrike(_) => "first_strike",
            Self::CounterAttack(_) => "counter_attack",
            Self::ChainAttack(_) => "chain_attack",
            Self::Regeneration(_) => "regeneration",
            Self::Revive(_) => "revive",
        }
    }
}
