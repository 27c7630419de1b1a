use std::collections::BTreeMap;

use crate::combat::{Roster, StatusEffectEngine, phase_order};
use crate::config::CombatConfig;
use crate::env::{CatalogOracle, CombatEnv, Dice, FieldEffect, MonsterTemplate};
use crate::error::CombatError;
use crate::reward::RewardPool;
use crate::skill::{ActionReport, ActionTally, EffectLine, Skill, SkillEffectResolver};
use crate::state::{Actor, ActorId, ActorKind, PlayerProfile, Side, StatusKind, UserId};

/// How an encounter ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum CombatOutcome {
    Victory,
    Defeat,
    Fled,
}

/// Result of a flee attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum FleeOutcome {
    Escaped,
    Failed,
    /// A living boss makes escape impossible.
    BossBlocks,
}

/// Everything that happened in one round.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoundReport {
    pub round: u32,
    /// Phase order the round was resolved in.
    pub order: Vec<ActorId>,
    pub lines: Vec<EffectLine>,
    /// Per-actor damage and healing, in resolution order.
    pub tallies: Vec<ActionTally>,
    pub outcome: Option<CombatOutcome>,
}

/// State of one running encounter and its round scheduler.
///
/// Players join only between rounds through [`CombatContext::admit_player`].
/// Summoned monsters join mid-round with an empty gauge and act from the next
/// round on. Every actor ever spawned keeps a gauge entry.
#[derive(Clone, Debug)]
pub struct CombatContext {
    round: u32,
    roster: Roster,
    gauges: BTreeMap<ActorId, u32>,
    field: Option<FieldEffect>,
    created_at: u64,
    dice: Dice,
    fled: bool,
    player_damage: u64,
}

impl CombatContext {
    /// Creates an empty encounter. Most callers want [`CombatContext::start`].
    pub fn new(seed: u64, created_at: u64, field: Option<FieldEffect>) -> Self {
        Self {
            round: 1,
            roster: Roster::new(),
            gauges: BTreeMap::new(),
            field,
            created_at,
            dice: Dice::new(seed),
            fled: false,
            player_damage: 0,
        }
    }

    /// Builds an encounter between `leader` and a monster group.
    pub fn start(
        seed: u64,
        created_at: u64,
        leader: PlayerProfile,
        group: &[MonsterTemplate],
        field: Option<FieldEffect>,
        catalog: &dyn CatalogOracle,
    ) -> Result<Self, CombatError> {
        let mut context = Self::new(seed, created_at, field);
        context.admit_player(leader);
        for template in group {
            context.spawn_monster(template, catalog)?;
        }
        Ok(context)
    }

    // ========================================================================
    // Roster changes (round boundaries only)
    // ========================================================================

    /// Adds a player with an empty gauge. It takes part from the next round.
    pub fn admit_player(&mut self, profile: PlayerProfile) -> ActorId {
        let id = self.roster.allocate_id();
        self.roster.insert(Actor::from_profile(id, profile));
        self.gauges.insert(id, 0);
        id
    }

    pub fn spawn_monster(
        &mut self,
        template: &MonsterTemplate,
        catalog: &dyn CatalogOracle,
    ) -> Result<ActorId, CombatError> {
        let id = self.roster.allocate_id();
        let actor = template.spawn(id, catalog)?;
        self.roster.insert(actor);
        self.gauges.insert(id, 0);
        Ok(id)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn gauges(&self) -> &BTreeMap<ActorId, u32> {
        &self.gauges
    }

    pub fn gauge(&self, id: ActorId) -> Option<u32> {
        self.gauges.get(&id).copied()
    }

    pub fn field(&self) -> Option<FieldEffect> {
        self.field
    }

    /// Unix millis at construction.
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn seed(&self) -> u64 {
        self.dice.seed()
    }

    pub fn player_count(&self) -> usize {
        self.roster.players().len()
    }

    pub fn actor_for_user(&self, user: UserId) -> Option<ActorId> {
        self.roster
            .players()
            .iter()
            .find(|actor| actor.user() == Some(user))
            .map(|actor| actor.id)
    }

    /// Total damage dealt by the player side so far.
    pub fn player_damage(&self) -> u64 {
        self.player_damage
    }

    pub fn boss_alive(&self) -> bool {
        self.roster
            .monsters()
            .iter()
            .any(|actor| actor.is_boss() && actor.is_alive())
    }

    /// Exp and gold carried by every monster that took part.
    pub fn reward_pool(&self) -> RewardPool {
        self.roster
            .monsters()
            .iter()
            .fold(RewardPool::default(), |pool, actor| match actor.kind {
                ActorKind::Monster { exp, gold, .. } => RewardPool {
                    exp: pool.exp + exp,
                    gold: pool.gold + gold,
                },
                ActorKind::Player { .. } => pool,
            })
    }

    /// True when the other encounter started within `window_ms` of this one.
    pub fn started_within(&self, other_created_at: u64, window_ms: u64) -> bool {
        self.created_at.abs_diff(other_created_at) <= window_ms
    }

    pub fn outcome(&self) -> Option<CombatOutcome> {
        if self.fled {
            Some(CombatOutcome::Fled)
        } else if self.roster.is_wiped(Side::Players) {
            Some(CombatOutcome::Defeat)
        } else if self.roster.is_wiped(Side::Monsters) {
            Some(CombatOutcome::Victory)
        } else {
            None
        }
    }

    pub fn is_finished(&self) -> bool {
        self.outcome().is_some()
    }

    // ========================================================================
    // Round resolution
    // ========================================================================

    /// Resolves one full round: start, action, and end phases.
    ///
    /// The round counter only advances while the encounter is still running.
    pub fn run_round(&mut self, env: CombatEnv<'_>) -> Result<RoundReport, CombatError> {
        if self.is_finished() {
            return Err(CombatError::AlreadyFinished);
        }

        let round = self.round;
        let mut report = RoundReport {
            round,
            ..RoundReport::default()
        };

        // start phase
        for actor in self.roster.iter().filter(|actor| actor.is_alive()) {
            let gauge = self.gauges.entry(actor.id).or_insert(0);
            *gauge = gauge.saturating_add(actor.stats.speed);
        }
        let order = phase_order(&self.roster, &mut self.dice);
        report.order = order.clone();
        for &id in &order {
            if !self.is_alive(id)? {
                continue;
            }
            let pre = SkillEffectResolver::pre_action(&mut self.roster, &mut self.dice, round, id)?;
            self.absorb(&mut report, pre, None, env)?;
        }

        // action phase
        if !self.is_finished() {
            for &id in &order {
                self.take_turn(id, &mut report, env)?;
                if self.is_finished() {
                    break;
                }
            }
        }
        if !self.is_finished() {
            for &id in &order {
                if !self.is_alive(id)? || self.gauge(id).unwrap_or(0) < CombatConfig::BONUS_ACTION_GAUGE
                {
                    continue;
                }
                if let Some(gauge) = self.gauges.get_mut(&id) {
                    *gauge -= CombatConfig::BONUS_ACTION_GAUGE;
                }
                report
                    .lines
                    .push(EffectLine::new(id, format!("{} moves again", self.name(id))));
                self.take_turn(id, &mut report, env)?;
                if self.is_finished() {
                    break;
                }
            }
        }

        // end phase
        if !self.is_finished() {
            let lines = StatusEffectEngine::end_phase(&mut self.roster, round, self.field)?;
            report.lines.extend(lines);
        }

        report.outcome = self.outcome();
        if report.outcome.is_none() {
            self.round += 1;
        }
        Ok(report)
    }

    /// Tries to leave the encounter. A living boss blocks every attempt.
    pub fn attempt_flee(&mut self) -> FleeOutcome {
        if self.is_finished() {
            return FleeOutcome::Failed;
        }
        if self.boss_alive() {
            return FleeOutcome::BossBlocks;
        }

        let players = average_speed(&self.roster, Side::Players);
        let monsters = average_speed(&self.roster, Side::Monsters);
        let chance = (50 + players - monsters).clamp(10, 90) as u32;
        if self.dice.chance(chance) {
            self.fled = true;
            FleeOutcome::Escaped
        } else {
            FleeOutcome::Failed
        }
    }

    /// Ends the encounter without a winner, as if the party had fled.
    pub fn abandon(&mut self) {
        self.fled = true;
    }

    fn is_alive(&self, id: ActorId) -> Result<bool, CombatError> {
        self.roster
            .actor(id)
            .map(Actor::is_alive)
            .ok_or_else(|| CombatError::actor_missing(id, self.round))
    }

    fn name(&self, id: ActorId) -> String {
        self.roster
            .actor(id)
            .map_or_else(|| id.to_string(), |actor| actor.name.clone())
    }

    fn take_turn(
        &mut self,
        id: ActorId,
        report: &mut RoundReport,
        env: CombatEnv<'_>,
    ) -> Result<(), CombatError> {
        let round = self.round;
        let actor = self
            .roster
            .actor_mut(id)
            .ok_or_else(|| CombatError::actor_missing(id, round))?;
        if !actor.is_alive() {
            return Ok(());
        }
        if actor.statuses.consume(StatusKind::Stun) > 0 {
            let line = EffectLine::new(id, format!("{} is stunned", actor.name));
            report.lines.push(line);
            return Ok(());
        }

        let skill = actor.next_skill().unwrap_or_else(Skill::basic_attack);
        let line = EffectLine::new(id, format!("{} uses {}", actor.name, skill.name));
        report.lines.push(line);

        let target = self.choose_target(id)?;
        let action =
            SkillEffectResolver::act(&mut self.roster, &mut self.dice, round, id, &skill, target)?;
        self.absorb(report, action, Some(id), env)
    }

    /// Players focus the first living monster; monsters pick a random player.
    fn choose_target(&mut self, id: ActorId) -> Result<Option<ActorId>, CombatError> {
        let side = self
            .roster
            .actor(id)
            .map(Actor::side)
            .ok_or_else(|| CombatError::actor_missing(id, self.round))?;
        let living = self.roster.living(side.opponent());
        if living.is_empty() {
            return Ok(None);
        }
        Ok(Some(match side {
            Side::Players => living[0],
            Side::Monsters => living[self.dice.pick(living.len())],
        }))
    }

    fn absorb(
        &mut self,
        report: &mut RoundReport,
        action: ActionReport,
        acting: Option<ActorId>,
        env: CombatEnv<'_>,
    ) -> Result<(), CombatError> {
        for tally in action.tallies(acting) {
            if tally.damage == 0 && tally.healing == 0 && !tally.acted {
                continue;
            }
            let is_player = self
                .roster
                .actor(tally.actor)
                .is_some_and(|actor| actor.side() == Side::Players);
            if is_player {
                self.player_damage += u64::from(tally.damage);
            }
            report.tallies.push(tally);
        }

        for summon in &action.summons {
            let template = env
                .catalog
                .monster_by_id(&summon.template)
                .ok_or_else(|| CombatError::MonsterMissing(summon.template.clone()))?;
            self.spawn_monster(&template, env.catalog)?;
        }

        report.lines.extend(action.lines);
        Ok(())
    }
}

fn average_speed(roster: &Roster, side: Side) -> i64 {
    let living: Vec<i64> = roster
        .side(side)
        .iter()
        .filter(|actor| actor.is_alive())
        .map(|actor| i64::from(actor.stats.speed))
        .collect();
    if living.is_empty() {
        return 0;
    }
    living.iter().sum::<i64>() / living.len() as i64
}
