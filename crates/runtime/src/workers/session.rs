//! Session worker: one task per running dungeon session.
//!
//! Drives exploration steps, rest events, and encounters for a single user.
//! The session lock is held only for synchronous state changes; prompts and
//! pacing delays happen with the lock released so that admissions, stop
//! requests, and observers can get in between rounds.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use game_core::{
    CatalogOracle, CombatContext, CombatEnv, CombatError, CombatOutcome, FieldEffect,
    FleeOutcome, GameError, UserId,
};

use crate::api::{
    Choice, DecisionProvider, Prompt, Result, RuntimeError, SessionError, ask_with_timeout,
};
use crate::events::{CombatEvent, EventBus, SessionEvent};
use crate::intervention::InterventionService;
use crate::repository::{ActorRecord, ActorRepository};
use crate::reward::RewardService;
use crate::runtime::RuntimeConfig;
use crate::session::{ClosedEncounter, EndReason, SessionHandle, SessionRegistry, StepEvent};

/// How often an idle worker checks whether its user left another encounter.
const ENGAGED_POLL: Duration = Duration::from_millis(50);

/// Shared services handed to every session worker.
#[derive(Clone)]
pub(crate) struct Services {
    pub registry: Arc<SessionRegistry>,
    pub intervention: Arc<InterventionService>,
    pub rewards: Arc<RewardService>,
    pub actors: Arc<dyn ActorRepository>,
    pub catalog: Arc<dyn CatalogOracle>,
    pub decisions: Arc<dyn DecisionProvider>,
    pub events: EventBus,
    pub config: RuntimeConfig,
}

pub(crate) struct SessionWorker {
    user: UserId,
    session: SessionHandle,
    services: Services,
    cancel: CancellationToken,
}

impl SessionWorker {
    pub fn new(
        user: UserId,
        session: SessionHandle,
        services: Services,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            user,
            session,
            services,
            cancel,
        }
    }

    /// Main worker loop. Always ends its own session through the registry,
    /// never a newer session of the same user.
    pub async fn run(self) {
        let reason = self.explore().await;
        debug!(target: "runtime::worker", user = %self.user, %reason, "session worker finished");
        self.services.registry.end_handle(&self.session, reason).await;
    }

    async fn explore(&self) -> EndReason {
        loop {
            if self.cancel.is_cancelled() {
                return EndReason::Cancelled;
            }

            let planned = {
                let mut session = self.session.lock().await;
                if session.is_ended() || session.pending_exit() {
                    return EndReason::Stopped;
                }
                if session.is_cleared() {
                    return EndReason::Completed;
                }
                if self.services.registry.begin_own_event(self.user) {
                    match session.advance_step() {
                        Ok(step) => Some((step, session.plan_step())),
                        Err(error) => {
                            warn!(target: "runtime::worker", user = %self.user, %error, "cannot advance");
                            return EndReason::Stopped;
                        }
                    }
                } else {
                    None
                }
            };
            let Some((step, event)) = planned else {
                debug!(target: "runtime::worker", user = %self.user, "fighting in another encounter, waiting");
                if !self.pause(self.services.config.step_delay.max(ENGAGED_POLL)).await {
                    return EndReason::Cancelled;
                }
                continue;
            };
            self.services.events.publish(SessionEvent::StepAdvanced {
                user: self.user,
                step,
            });

            match event {
                StepEvent::Rest => self.rest().await,
                StepEvent::Encounter { monsters, boss } => {
                    debug!(target: "runtime::worker", user = %self.user, step, boss, ?monsters, "encounter");
                    if let Some(reason) = self.encounter(step, monsters).await {
                        return reason;
                    }
                }
            }

            {
                let mut session = self.session.lock().await;
                session.finish_event();
                if session.is_ended() {
                    return EndReason::Stopped;
                }
                self.services.registry.finish_own_event(self.user);
                if session.pending_exit() {
                    return EndReason::Stopped;
                }
            }

            if !self.pause(self.services.config.step_delay).await {
                return EndReason::Cancelled;
            }
        }
    }

    /// Sleeps unless cancelled first. Returns `false` on cancellation.
    async fn pause(&self, delay: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    async fn rest(&self) {
        let percent = {
            let mut session = self.session.lock().await;
            session.begin_rest();
            session.dungeon().rest_heal_percent
        };

        let mut healed = 0;
        let result = self
            .services
            .actors
            .transact(self.user, &mut |record: &mut ActorRecord| {
                let before = record.hp;
                let amount = record.stats.max_hp.saturating_mul(percent) / 100;
                record.hp = record.hp.saturating_add(amount).min(record.stats.max_hp);
                healed = record.hp - before;
                Ok(())
            });
        match result {
            Ok(_) => self.services.events.publish(SessionEvent::Rested {
                user: self.user,
                healed,
            }),
            Err(error) => warn!(target: "runtime::worker", user = %self.user, %error, "rest failed"),
        }
    }

    /// Runs one encounter to its end and settles it.
    ///
    /// Returns a reason when the session must end because of it.
    async fn encounter(&self, step: u32, monsters: Vec<String>) -> Option<EndReason> {
        let (dungeon, names, created_at) = {
            let mut session = self.session.lock().await;
            let seed = session.next_encounter_seed();
            let field = session.dungeon().field;
            let dungeon = session.dungeon().id.clone();

            let context = match self.build_context(seed, &monsters, field) {
                Ok(context) => context,
                Err(error) => {
                    error!(target: "runtime::worker", user = %self.user, %error, "encounter setup failed");
                    return Some(EndReason::Fault);
                }
            };
            let names: Vec<String> = context
                .roster()
                .monsters()
                .iter()
                .map(|actor| actor.name.clone())
                .collect();
            let created_at = context.created_at();
            if let Err(error) = session.enter_combat(context) {
                warn!(target: "runtime::worker", user = %self.user, %error, "cannot enter combat");
                return Some(EndReason::Stopped);
            }
            (dungeon, names, created_at)
        };

        info!(target: "runtime::worker", user = %self.user, step, monsters = ?names, "encounter started");
        self.services.events.publish(CombatEvent::EncounterStarted {
            leader: self.user,
            monsters: names.clone(),
            created_at,
        });

        let prompt = Prompt::EncounterStart {
            dungeon: dungeon.clone(),
            step,
            monsters: names,
        };
        let mut closed = None;
        if self.ask(&prompt).await == Choice::Flee {
            closed = self.try_flee().await?;
        }

        let closed = match closed {
            Some(closed) => closed,
            None => self.fight().await?,
        };
        self.settle(&dungeon, closed)
    }

    fn build_context(
        &self,
        seed: u64,
        monsters: &[String],
        field: Option<FieldEffect>,
    ) -> Result<CombatContext> {
        let catalog = self.services.catalog.as_ref();
        let record = self
            .services
            .actors
            .load(self.user)?
            .ok_or(SessionError::ActorNotFound(self.user))?;
        let profile = record.profile(catalog)?;
        let templates = monsters
            .iter()
            .map(|id| {
                catalog
                    .monster_by_id(id)
                    .ok_or_else(|| CombatError::MonsterMissing(id.clone()))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let created_at = Utc::now().timestamp_millis().max(0) as u64;
        CombatContext::start(seed, created_at, profile, &templates, field, catalog)
            .map_err(RuntimeError::from)
    }

    async fn ask(&self, prompt: &Prompt) -> Choice {
        ask_with_timeout(
            self.services.decisions.as_ref(),
            self.user,
            prompt,
            self.services.config.decision_timeout,
        )
        .await
    }

    /// Attempts to flee. `Some(Some(closed))` when the party escaped,
    /// `Some(None)` when the fight goes on.
    async fn try_flee(&self) -> Option<Option<ClosedEncounter>> {
        let mut session = self.session.lock().await;
        if session.is_ended() {
            return None;
        }
        let outcome = session.combat_mut()?.attempt_flee();
        self.services.events.publish(CombatEvent::FleeAttempted {
            leader: self.user,
            escaped: outcome == FleeOutcome::Escaped,
        });
        debug!(target: "runtime::worker", user = %self.user, %outcome, "flee attempt");
        if outcome != FleeOutcome::Escaped {
            return Some(None);
        }
        self.services.intervention.discard_pending(&mut session);
        Some(session.leave_combat())
    }

    /// Round loop. Admissions commit at the top of every round, before the
    /// phase order is built.
    ///
    /// `None` means the session was torn down under us or failed.
    async fn fight(&self) -> Option<ClosedEncounter> {
        let max_rounds = self.services.config.combat.max_rounds;
        loop {
            let mut session = self.session.lock().await;
            if session.is_ended() {
                return None;
            }
            if self.cancel.is_cancelled() {
                if let Some(combat) = session.combat_mut() {
                    combat.abandon();
                }
                self.services.intervention.discard_pending(&mut session);
                return session.leave_combat();
            }

            self.services.intervention.commit_pending(&mut session);

            let env = CombatEnv::new(
                self.services.catalog.as_ref(),
                &self.services.config.combat,
            );
            let combat = session.combat_mut()?;
            let report = match combat.run_round(env) {
                Ok(report) => report,
                Err(error) => {
                    drop(session);
                    self.fault(&error).await;
                    return None;
                }
            };
            let over = report.outcome.is_some() || report.round >= max_rounds;
            if report.outcome.is_none() && over {
                info!(target: "runtime::worker", user = %self.user, round = report.round, "round limit reached");
                combat.abandon();
            }
            session.record_round(&report);

            let vitals = session
                .leader_actor()
                .map(|actor| (actor.hp, actor.stats.max_hp));
            let round = report.round;
            self.services.events.publish(CombatEvent::RoundResolved {
                leader: self.user,
                report,
            });

            if over {
                self.services.intervention.discard_pending(&mut session);
                return session.leave_combat();
            }
            drop(session);

            let (hp, max_hp) = vitals.unwrap_or((0, 0));
            match self.ask(&Prompt::RoundEnd { round, hp, max_hp }).await {
                Choice::Flee => {
                    if let Some(escaped) = self.try_flee().await? {
                        return Some(escaped);
                    }
                }
                Choice::Stop => self.defer_stop().await,
                Choice::Fight | Choice::Continue => {}
            }

            if !self.pause(self.services.config.round_delay).await {
                debug!(target: "runtime::worker", user = %self.user, "cancelled between rounds");
            }
        }
    }

    async fn defer_stop(&self) {
        let deferred = self.session.lock().await.request_stop();
        if deferred.is_ok() {
            self.services
                .events
                .publish(SessionEvent::StopDeferred { user: self.user });
        }
    }

    async fn fault(&self, error: &CombatError) {
        error!(
            target: "runtime::worker",
            user = %self.user,
            code = error.error_code(),
            severity = error.severity().as_str(),
            %error,
            "round resolution failed, ending session"
        );
        self.services
            .registry
            .end_handle(&self.session, EndReason::Fault)
            .await;
    }

    fn settle(&self, dungeon: &str, closed: ClosedEncounter) -> Option<EndReason> {
        let settlement = self
            .services
            .rewards
            .settle(self.user, dungeon, &closed, Utc::now());
        self.services.events.publish(CombatEvent::EncounterEnded {
            leader: self.user,
            outcome: settlement.outcome,
            rounds: closed.context.round(),
        });
        self.services.events.publish(CombatEvent::RewardsPaid {
            leader: self.user,
            shares: settlement.shares,
            failures: settlement.failures,
        });

        // participants are free only once the result is out
        let released = self.services.registry.release_encounter(self.user);
        debug!(target: "runtime::worker", user = %self.user, released, "engagements released");

        (settlement.outcome == CombatOutcome::Defeat).then_some(EndReason::Defeated)
    }
}
