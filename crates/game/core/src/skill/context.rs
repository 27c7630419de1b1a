use std::collections::BTreeMap;
use std::fmt;

use crate::combat::Roster;
use crate::env::Dice;
use crate::error::CombatError;
use crate::skill::SkillEffect;
use crate::state::{Actor, ActorId, Side};

/// One human-readable line of combat narration.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectLine {
    /// Actor the line is about; `None` for field narration.
    pub actor: Option<ActorId>,
    pub text: String,
}

impl EffectLine {
    pub fn new(actor: ActorId, text: impl Into<String>) -> Self {
        Self {
            actor: Some(actor),
            text: text.into(),
        }
    }

    pub fn narration(text: impl Into<String>) -> Self {
        Self {
            actor: None,
            text: text.into(),
        }
    }
}

impl fmt::Display for EffectLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Damage and healing one actor produced during a single resolved step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionTally {
    pub actor: ActorId,
    pub damage: u32,
    pub healing: u32,
    /// True for the actor whose turn it was, false for assists such as
    /// counter-attacks or first strikes.
    pub acted: bool,
}

/// A monster spawn requested by a summon effect, fulfilled by the combat
/// context after the action resolves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SummonRequest {
    pub side: Side,
    pub template: String,
}

/// Accumulated output of one hook run.
#[derive(Clone, Debug, Default)]
pub struct ActionReport {
    pub lines: Vec<EffectLine>,
    /// Actors damaged by someone else, in hit order, deduplicated.
    pub hits: Vec<ActorId>,
    pub summons: Vec<SummonRequest>,
    dealt: BTreeMap<ActorId, u32>,
    healed: BTreeMap<ActorId, u32>,
}

impl ActionReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_line(&mut self, line: Option<EffectLine>) {
        if let Some(line) = line {
            self.lines.push(line);
        }
    }

    fn record_hit(&mut self, source: ActorId, target: ActorId, amount: u32) {
        *self.dealt.entry(source).or_default() += amount;
        if !self.hits.contains(&target) {
            self.hits.push(target);
        }
    }

    fn record_heal(&mut self, source: ActorId, amount: u32) {
        *self.healed.entry(source).or_default() += amount;
    }

    pub fn damage_by(&self, actor: ActorId) -> u32 {
        self.dealt.get(&actor).copied().unwrap_or(0)
    }

    pub fn healing_by(&self, actor: ActorId) -> u32 {
        self.healed.get(&actor).copied().unwrap_or(0)
    }

    /// Per-actor tallies. The acting actor (if any) always comes first and is
    /// present even when it produced nothing.
    pub fn tallies(&self, acting: Option<ActorId>) -> Vec<ActionTally> {
        let mut tallies = Vec::new();
        if let Some(actor) = acting {
            tallies.push(ActionTally {
                actor,
                damage: self.damage_by(actor),
                healing: self.healing_by(actor),
                acted: true,
            });
        }

        let mut others: Vec<ActorId> = self
            .dealt
            .keys()
            .chain(self.healed.keys())
            .copied()
            .filter(|id| Some(*id) != acting)
            .collect();
        others.sort();
        others.dedup();

        tallies.extend(others.into_iter().map(|actor| ActionTally {
            actor,
            damage: self.damage_by(actor),
            healing: self.healing_by(actor),
            acted: false,
        }));
        tallies
    }
}

/// Mutable view handed to effect units while they run.
pub struct EffectContext<'a> {
    pub roster: &'a mut Roster,
    pub dice: &'a mut Dice,
    pub round: u32,
    /// Actor owning the running unit.
    pub caster: ActorId,
    /// Chosen target of the current action, if any.
    pub target: Option<ActorId>,
    pub report: &'a mut ActionReport,
}

impl<'a> EffectContext<'a> {
    pub fn actor(&self, id: ActorId) -> Result<&Actor, CombatError> {
        self.roster
            .actor(id)
            .ok_or_else(|| CombatError::actor_missing(id, self.round))
    }

    pub fn actor_mut(&mut self, id: ActorId) -> Result<&mut Actor, CombatError> {
        let round = self.round;
        self.roster
            .actor_mut(id)
            .ok_or_else(|| CombatError::actor_missing(id, round))
    }

    pub fn caster(&self) -> Result<&Actor, CombatError> {
        self.actor(self.caster)
    }

    pub fn name(&self, id: ActorId) -> String {
        self.roster
            .actor(id)
            .map_or_else(|| id.to_string(), |actor| actor.name.clone())
    }

    /// The chosen target while it is alive, otherwise the first living
    /// opponent of the caster.
    pub fn live_target(&self) -> Result<Option<ActorId>, CombatError> {
        if let Some(target) = self.target
            && self.actor(target)?.is_alive()
        {
            return Ok(Some(target));
        }
        let side = self.caster()?.side().opponent();
        Ok(self.roster.living(side).first().copied())
    }

    /// Caster attacks `target` with the given power. Returns hp removed.
    pub fn strike(&mut self, target: ActorId, power: u32) -> Result<u32, CombatError> {
        let amount = {
            let attacker = self.caster()?;
            let defender = self.actor(target)?;
            if !attacker.is_alive() || !defender.is_alive() {
                return Ok(0);
            }
            attacker.damage_against(defender, power)
        };
        self.damage(Some(self.caster), target, amount)
    }

    /// Removes hp from `target`, crediting `source` when it is another actor.
    pub fn damage(
        &mut self,
        source: Option<ActorId>,
        target: ActorId,
        amount: u32,
    ) -> Result<u32, CombatError> {
        let lost = apply_damage(self.roster, self.round, target, amount, &mut self.report.lines)?;
        if let Some(source) = source
            && source != target
            && lost > 0
        {
            self.report.record_hit(source, target, lost);
        }
        Ok(lost)
    }

    /// Restores hp to `target`, crediting `source`.
    pub fn heal(&mut self, source: ActorId, target: ActorId, amount: u32) -> Result<u32, CombatError> {
        let gained = self.actor_mut(target)?.heal(amount);
        if gained > 0 {
            self.report.record_heal(source, gained);
        }
        Ok(gained)
    }
}

/// Shared damage path for skills and the end phase.
///
/// An actor dropping to 0 hp triggers the first unused revive unit in its
/// loadout.
pub(crate) fn apply_damage(
    roster: &mut Roster,
    round: u32,
    target: ActorId,
    amount: u32,
    lines: &mut Vec<EffectLine>,
) -> Result<u32, CombatError> {
    let actor = roster
        .actor_mut(target)
        .ok_or_else(|| CombatError::actor_missing(target, round))?;
    if !actor.is_alive() {
        return Ok(0);
    }

    let lost = actor.take_damage(amount);
    if actor.is_alive() {
        return Ok(lost);
    }

    lines.push(EffectLine::new(target, format!("{} falls", actor.name)));

    let revive = actor.loadout.iter().find_map(|skill| {
        skill.effects.iter().find_map(|effect| match effect {
            SkillEffect::Revive(revive) => Some(*revive),
            _ => None,
        })
    });
    if let Some(revive) = revive {
        lines.extend(revive.on_death(actor));
    }
    Ok(lost)
}
