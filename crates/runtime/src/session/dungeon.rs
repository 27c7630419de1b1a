//! Per-user dungeon run.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use game_core::{
    Actor, ActorId, ChannelId, CombatContext, ContributionTracker, Dice, DungeonDefinition,
    RoundReport, UserId, compute_seed,
};

use crate::api::SessionError;

/// What the session is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    /// A step was taken and its event is being resolved.
    Event,
    Combat,
    Rest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum ContentMode {
    Exploration,
    /// Every floor is a fight. Outsiders may not intervene.
    Tower,
    Raid,
}

/// How a stop request will be honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopRequest {
    /// Nothing is in progress; the caller should end the session now.
    Immediate,
    /// The current event finishes first.
    Deferred,
}

/// Why a session was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum EndReason {
    /// Last step cleared.
    Completed,
    Defeated,
    /// The owner asked to leave.
    Stopped,
    /// The runtime shut down.
    Cancelled,
    /// Round resolution failed and the session was torn down.
    Fault,
}

/// Accepted admission waiting for the next round boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingAdmission {
    pub requested_at: DateTime<Utc>,
    /// Step distance between requester and leader when the request was made.
    pub distance: u32,
    sequence: u64,
}

/// What the next step holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepEvent {
    Encounter { monsters: Vec<String>, boss: bool },
    Rest,
}

/// Everything left over once an encounter is discarded.
#[derive(Debug, Clone)]
pub struct ClosedEncounter {
    pub context: CombatContext,
    /// Contribution per user, taken exactly once from the tracker.
    pub scores: BTreeMap<UserId, f64>,
    pub participants: HashMap<UserId, ActorId>,
}

/// One user's dungeon run.
///
/// Owned by the registry behind an async mutex and driven by a single
/// session worker. Other tasks only read it or queue admissions.
#[derive(Debug)]
pub struct DungeonSession {
    user: UserId,
    channel: ChannelId,
    dungeon: DungeonDefinition,
    mode: ContentMode,
    status: SessionStatus,
    step: u32,
    seed: u64,
    encounters: u32,
    combat: Option<CombatContext>,
    participants: HashMap<UserId, ActorId>,
    contribution: ContributionTracker<UserId>,
    pending: HashMap<UserId, PendingAdmission>,
    next_sequence: u64,
    allow_intervention: bool,
    pending_exit: bool,
    ended: bool,
}

impl DungeonSession {
    pub fn new(
        user: UserId,
        channel: ChannelId,
        dungeon: DungeonDefinition,
        mode: ContentMode,
        seed: u64,
    ) -> Self {
        Self {
            user,
            channel,
            dungeon,
            mode,
            status: SessionStatus::Idle,
            step: 0,
            seed,
            encounters: 0,
            combat: None,
            participants: HashMap::new(),
            contribution: ContributionTracker::new(),
            pending: HashMap::new(),
            next_sequence: 0,
            allow_intervention: mode != ContentMode::Tower,
            pending_exit: false,
            ended: false,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn user(&self) -> UserId {
        self.user
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn dungeon(&self) -> &DungeonDefinition {
        &self.dungeon
    }

    pub fn mode(&self) -> ContentMode {
        self.mode
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Exploration step counter; doubles as the position in the instance.
    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn combat(&self) -> Option<&CombatContext> {
        self.combat.as_ref()
    }

    pub fn combat_mut(&mut self) -> Option<&mut CombatContext> {
        self.combat.as_mut()
    }

    pub fn is_in_combat(&self) -> bool {
        self.combat.is_some()
    }

    pub fn participants(&self) -> &HashMap<UserId, ActorId> {
        &self.participants
    }

    pub fn is_participant(&self, user: UserId) -> bool {
        self.participants.contains_key(&user)
    }

    pub fn contribution(&self) -> &ContributionTracker<UserId> {
        &self.contribution
    }

    pub fn pending(&self) -> &HashMap<UserId, PendingAdmission> {
        &self.pending
    }

    pub fn is_pending(&self, user: UserId) -> bool {
        self.pending.contains_key(&user)
    }

    pub fn allows_intervention(&self) -> bool {
        self.allow_intervention
    }

    pub fn set_allow_intervention(&mut self, allow: bool) {
        self.allow_intervention = allow;
    }

    pub fn pending_exit(&self) -> bool {
        self.pending_exit
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// True once the last step has been resolved.
    pub fn is_cleared(&self) -> bool {
        self.status == SessionStatus::Idle && self.step >= self.dungeon.steps
    }

    /// The leader's combatant, while in combat.
    pub fn leader_actor(&self) -> Option<&Actor> {
        let combat = self.combat.as_ref()?;
        let id = combat.actor_for_user(self.user)?;
        combat.roster().actor(id)
    }

    pub fn ensure_active(&self) -> Result<(), SessionError> {
        if self.ended {
            return Err(SessionError::Ended(self.user));
        }
        Ok(())
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Asks the session to stop.
    ///
    /// While an event is in progress the exit is deferred to the next safe
    /// boundary. An idle session can be ended right away by the caller.
    pub fn request_stop(&mut self) -> Result<StopRequest, SessionError> {
        self.ensure_active()?;
        if self.status == SessionStatus::Idle {
            return Ok(StopRequest::Immediate);
        }
        self.pending_exit = true;
        Ok(StopRequest::Deferred)
    }

    /// Flags the session as ended. Never undone.
    pub(crate) fn mark_ended(&mut self) {
        self.ended = true;
    }

    /// Takes one step deeper. Only allowed from `Idle`.
    pub fn advance_step(&mut self) -> Result<u32, SessionError> {
        self.ensure_active()?;
        if self.status != SessionStatus::Idle {
            return Err(SessionError::NotIdle {
                status: self.status,
            });
        }
        self.step += 1;
        self.status = SessionStatus::Event;
        Ok(self.step)
    }

    /// Rolls what the current step holds.
    ///
    /// Deterministic in the session seed and step. The final step always
    /// fights, against the boss when the dungeon has one. Tower floors are
    /// always fights.
    pub fn plan_step(&self) -> StepEvent {
        let mut dice = Dice::new(compute_seed(self.seed, u64::from(self.step), 0, 0));
        let last = self.step >= self.dungeon.steps;

        if last && let Some(boss) = &self.dungeon.boss {
            return StepEvent::Encounter {
                monsters: vec![boss.clone()],
                boss: true,
            };
        }

        let fight = last
            || self.mode == ContentMode::Tower
            || dice.chance(self.dungeon.encounter_chance);
        if !fight || self.dungeon.monster_pool.is_empty() {
            return StepEvent::Rest;
        }

        let min = self.dungeon.min_group.max(1);
        let max = self.dungeon.max_group.max(min);
        let size = min as usize + dice.pick((max - min) as usize + 1);
        let monsters = (0..size)
            .map(|_| {
                let pool = &self.dungeon.monster_pool;
                pool[dice.pick(pool.len())].clone()
            })
            .collect();
        StepEvent::Encounter {
            monsters,
            boss: false,
        }
    }

    pub fn begin_rest(&mut self) {
        self.status = SessionStatus::Rest;
    }

    /// Closes the current event and returns to `Idle`.
    pub fn finish_event(&mut self) {
        self.status = SessionStatus::Idle;
    }

    /// Seed for the next encounter of this session.
    pub fn next_encounter_seed(&mut self) -> u64 {
        self.encounters += 1;
        compute_seed(self.seed, u64::from(self.step), self.encounters, 1)
    }

    // ========================================================================
    // Combat
    // ========================================================================

    /// Installs a freshly started encounter led by the session owner.
    pub fn enter_combat(&mut self, context: CombatContext) -> Result<(), SessionError> {
        self.ensure_active()?;
        if self.combat.is_some() {
            return Err(SessionError::AlreadyInCombat);
        }

        self.participants.clear();
        self.pending.clear();
        self.contribution = ContributionTracker::new();
        if let Some(leader) = context.actor_for_user(self.user) {
            self.participants.insert(self.user, leader);
        }
        self.contribution.enroll(self.user);
        self.combat = Some(context);
        self.status = SessionStatus::Combat;
        Ok(())
    }

    /// Feeds a resolved round into the contribution tracker, in action order.
    pub fn record_round(&mut self, report: &RoundReport) {
        let Some(combat) = self.combat.as_ref() else {
            return;
        };
        for tally in &report.tallies {
            let Some(user) = combat.roster().actor(tally.actor).and_then(Actor::user) else {
                continue;
            };
            if tally.acted {
                self.contribution.record(user, tally.damage, tally.healing);
            } else {
                self.contribution
                    .record_assist(user, tally.damage, tally.healing);
            }
        }
    }

    /// Discards the encounter and hands out contribution exactly once.
    ///
    /// Returns `None` when there is no encounter to leave.
    pub fn leave_combat(&mut self) -> Option<ClosedEncounter> {
        let context = self.combat.take()?;
        self.pending.clear();
        self.status = SessionStatus::Event;
        Some(ClosedEncounter {
            context,
            scores: self.contribution.take(),
            participants: std::mem::take(&mut self.participants),
        })
    }

    pub(crate) fn enqueue_admission(&mut self, user: UserId, distance: u32, now: DateTime<Utc>) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.pending.insert(
            user,
            PendingAdmission {
                requested_at: now,
                distance,
                sequence,
            },
        );
    }

    /// Drains queued admissions in request order.
    pub(crate) fn take_pending(&mut self) -> Vec<(UserId, PendingAdmission)> {
        let mut pending: Vec<_> = self.pending.drain().collect();
        pending.sort_by_key(|(_, admission)| admission.sequence);
        pending
    }

    pub(crate) fn add_participant(&mut self, user: UserId, actor: ActorId) {
        self.participants.insert(user, actor);
        self.contribution.enroll(user);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_core::FieldEffect;

    fn dungeon(boss: Option<&str>) -> DungeonDefinition {
        DungeonDefinition {
            id: "cellar".into(),
            name: "Cellar".into(),
            min_level: 1,
            steps: 3,
            encounter_chance: 50,
            rest_heal_percent: 30,
            monster_pool: vec!["rat".into(), "spider".into()],
            min_group: 1,
            max_group: 3,
            boss: boss.map(String::from),
            field: None::<FieldEffect>,
        }
    }

    fn session(mode: ContentMode) -> DungeonSession {
        DungeonSession::new(UserId(1), ChannelId(9), dungeon(Some("rat_king")), mode, 42)
    }

    #[test]
    fn stop_is_immediate_when_idle_and_deferred_otherwise() {
        let mut session = session(ContentMode::Exploration);
        assert_eq!(session.request_stop().unwrap(), StopRequest::Immediate);
        assert!(!session.pending_exit());

        session.advance_step().unwrap();
        assert_eq!(session.request_stop().unwrap(), StopRequest::Deferred);
        assert!(session.pending_exit());
    }

    #[test]
    fn ended_session_rejects_work() {
        let mut session = session(ContentMode::Exploration);
        session.mark_ended();
        assert_eq!(
            session.request_stop(),
            Err(SessionError::Ended(UserId(1)))
        );
        assert_eq!(session.advance_step(), Err(SessionError::Ended(UserId(1))));
    }

    #[test]
    fn steps_only_advance_from_idle() {
        let mut session = session(ContentMode::Exploration);
        assert_eq!(session.advance_step().unwrap(), 1);
        assert!(matches!(
            session.advance_step(),
            Err(SessionError::NotIdle {
                status: SessionStatus::Event
            })
        ));
        session.finish_event();
        assert_eq!(session.advance_step().unwrap(), 2);
    }

    #[test]
    fn final_step_meets_the_boss() {
        let mut session = session(ContentMode::Exploration);
        for _ in 0..3 {
            session.advance_step().unwrap();
            session.finish_event();
        }
        assert_eq!(
            session.plan_step(),
            StepEvent::Encounter {
                monsters: vec!["rat_king".into()],
                boss: true
            }
        );
    }

    #[test]
    fn tower_floors_always_fight_within_group_bounds() {
        let mut session = session(ContentMode::Tower);
        assert!(!session.allows_intervention());
        for _ in 0..2 {
            session.advance_step().unwrap();
            match session.plan_step() {
                StepEvent::Encounter { monsters, boss } => {
                    assert!(!boss);
                    assert!((1..=3).contains(&monsters.len()));
                }
                StepEvent::Rest => panic!("tower floors never rest"),
            }
            session.finish_event();
        }
    }

    #[test]
    fn zero_minimum_group_stays_within_maximum() {
        let mut definition = dungeon(None);
        definition.encounter_chance = 100;
        definition.min_group = 0;
        definition.max_group = 2;
        definition.steps = 40;
        let mut session =
            DungeonSession::new(UserId(1), ChannelId(9), definition, ContentMode::Exploration, 3);
        for _ in 0..40 {
            session.advance_step().unwrap();
            match session.plan_step() {
                StepEvent::Encounter { monsters, .. } => {
                    assert!((1..=2).contains(&monsters.len()), "{} monsters", monsters.len());
                }
                StepEvent::Rest => panic!("every step should fight"),
            }
            session.finish_event();
        }
    }

    #[test]
    fn pending_admissions_drain_in_request_order() {
        let mut session = session(ContentMode::Exploration);
        let now = Utc::now();
        for user in [5, 3, 8] {
            session.enqueue_admission(UserId(user), 0, now);
        }
        let order: Vec<UserId> = session
            .take_pending()
            .into_iter()
            .map(|(user, _)| user)
            .collect();
        assert_eq!(order, vec![UserId(5), UserId(3), UserId(8)]);
        assert!(session.pending().is_empty());
    }

    #[test]
    fn leaving_combat_without_an_encounter_is_a_no_op() {
        let mut session = session(ContentMode::Exploration);
        assert!(session.leave_combat().is_none());
    }
}
