use crate::combat::Roster;
use crate::env::Dice;
use crate::error::CombatError;
use crate::skill::{ActionReport, EffectContext, HookPoint, Skill};
use crate::state::ActorId;

/// Runs effect units at the three hook points of an actor's turn.
pub struct SkillEffectResolver;

impl SkillEffectResolver {
    /// Runs every pre-action unit in the actor's loadout.
    ///
    /// Passive stat buffs are marked as applied afterwards, so they take
    /// effect once per combat.
    pub fn pre_action(
        roster: &mut Roster,
        dice: &mut Dice,
        round: u32,
        actor: ActorId,
    ) -> Result<ActionReport, CombatError> {
        let mut report = ActionReport::new();
        let mut ctx = EffectContext {
            roster,
            dice,
            round,
            caster: actor,
            target: None,
            report: &mut report,
        };

        let loadout = ctx.caster()?.loadout.clone();
        for unit in loadout.iter().flat_map(|skill| skill.units(HookPoint::PreAction)) {
            let line = unit.run(&mut ctx)?;
            ctx.report.push_line(line);
        }
        ctx.actor_mut(actor)?.buffs_applied = true;

        Ok(report)
    }

    /// Uses `skill` against `target`, then runs post-action units of the
    /// actor's loadout and counter-attacks of everyone it hit.
    pub fn act(
        roster: &mut Roster,
        dice: &mut Dice,
        round: u32,
        actor: ActorId,
        skill: &Skill,
        target: Option<ActorId>,
    ) -> Result<ActionReport, CombatError> {
        let mut report = ActionReport::new();
        let mut ctx = EffectContext {
            roster,
            dice,
            round,
            caster: actor,
            target,
            report: &mut report,
        };

        for unit in skill.units(HookPoint::Action) {
            let line = unit.run(&mut ctx)?;
            ctx.report.push_line(line);
        }

        let loadout = ctx.caster()?.loadout.clone();
        for unit in loadout
            .iter()
            .flat_map(|skill| skill.units(HookPoint::PostAction))
        {
            let line = unit.run(&mut ctx)?;
            ctx.report.push_line(line);
        }

        let hits = ctx.report.hits.clone();
        for defender in hits.into_iter().filter(|id| *id != actor) {
            let counters = ctx.actor(defender)?.loadout.clone();
            ctx.caster = defender;
            ctx.target = Some(actor);
            for unit in counters
                .iter()
                .flat_map(|skill| skill.units(HookPoint::PostAction))
            {
                let line = unit.counter(&mut ctx)?;
                ctx.report.push_line(line);
            }
        }

        Ok(report)
    }
}
