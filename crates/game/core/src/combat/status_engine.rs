use crate::combat::Roster;
use crate::env::FieldEffect;
use crate::error::CombatError;
use crate::skill::{EffectLine, apply_damage};
use crate::state::{Side, StatusKind};

const BURN_PERCENT_PER_STACK: u32 = 5;
const POISON_PERCENT_PER_STACK: u32 = 3;
const BLEED_PER_STACK: u32 = 4;
const REGENERATION_PERCENT_PER_STACK: u32 = 5;

const SCORCHING_PERCENT: u32 = 3;
const SANCTUARY_PERCENT: u32 = 5;
const MIASMA_DURATION: u8 = 2;

/// End-of-round processing of status effects and the field.
pub struct StatusEffectEngine;

impl StatusEffectEngine {
    /// Applies damage and healing over time, then the field effect, then
    /// decrements every status duration exactly once.
    pub fn end_phase(
        roster: &mut Roster,
        round: u32,
        field: Option<FieldEffect>,
    ) -> Result<Vec<EffectLine>, CombatError> {
        let mut lines = Vec::new();

        for id in roster.ids() {
            let Some(actor) = roster.actor(id) else {
                continue;
            };
            if !actor.is_alive() {
                continue;
            }

            let statuses = &actor.statuses;
            let burn = u32::from(statuses.stacks(StatusKind::Burn));
            let poison = u32::from(statuses.stacks(StatusKind::Poison));
            let bleed = u32::from(statuses.stacks(StatusKind::Bleed));
            let regen = u32::from(statuses.stacks(StatusKind::Regeneration));

            let mut damage = 0;
            if burn > 0 {
                damage += actor.max_hp_percent(burn * BURN_PERCENT_PER_STACK);
            }
            if poison > 0 {
                damage += actor.max_hp_percent(poison * POISON_PERCENT_PER_STACK);
            }
            damage += bleed * BLEED_PER_STACK;
            let healing = if regen > 0 {
                actor.max_hp_percent(regen * REGENERATION_PERCENT_PER_STACK)
            } else {
                0
            };
            let name = actor.name.clone();

            if damage > 0 {
                let lost = apply_damage(roster, round, id, damage, &mut lines)?;
                lines.push(EffectLine::new(
                    id,
                    format!("{name} takes {lost} from lingering wounds"),
                ));
            }
            if healing > 0
                && let Some(actor) = roster.actor_mut(id)
            {
                let gained = actor.heal(healing);
                if gained > 0 {
                    lines.push(EffectLine::new(id, format!("{name} regenerates {gained}")));
                }
            }
        }

        if let Some(field) = field {
            Self::apply_field(roster, round, field, &mut lines)?;
        }

        for id in roster.ids() {
            if let Some(actor) = roster.actor_mut(id) {
                for kind in actor.statuses.tick() {
                    if actor.is_alive() {
                        lines.push(EffectLine::new(id, format!("{}'s {} wears off", actor.name, kind)));
                    }
                }
            }
        }

        Ok(lines)
    }

    fn apply_field(
        roster: &mut Roster,
        round: u32,
        field: FieldEffect,
        lines: &mut Vec<EffectLine>,
    ) -> Result<(), CombatError> {
        match field {
            FieldEffect::Scorching => {
                for id in roster.ids() {
                    let amount = match roster.actor(id) {
                        Some(actor) if actor.is_alive() => actor.max_hp_percent(SCORCHING_PERCENT),
                        _ => continue,
                    };
                    apply_damage(roster, round, id, amount, lines)?;
                }
                lines.push(EffectLine::narration("The ground scorches everyone"));
            }
            FieldEffect::Miasma => {
                for id in roster.living(Side::Players) {
                    if let Some(actor) = roster.actor_mut(id)
                        && !actor.statuses.has(StatusKind::Poison)
                    {
                        actor.statuses.apply(StatusKind::Poison, 1, MIASMA_DURATION);
                        lines.push(EffectLine::new(id, format!("{} breathes miasma", actor.name)));
                    }
                }
            }
            FieldEffect::Sanctuary => {
                for id in roster.living(Side::Players) {
                    if let Some(actor) = roster.actor_mut(id) {
                        let amount = actor.max_hp_percent(SANCTUARY_PERCENT);
                        actor.heal(amount);
                    }
                }
                lines.push(EffectLine::narration("The sanctuary mends the party"));
            }
        }
        Ok(())
    }
}
