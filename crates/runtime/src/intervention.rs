//! Mid-combat admission of outside players.
//!
//! A request is validated against the target encounter and only queued.
//! The session worker commits queued requests at the next round boundary,
//! charging the proximity cost and stamping the cooldown in one
//! repository transaction before the newcomer is added to the encounter.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use game_core::{ActorId, CatalogOracle, CombatConfig, ProximityTier, UserId, distance};

use crate::events::{AdmissionEvent, EventBus};
use crate::instance::SharedInstanceManager;
use crate::repository::{ActorRecord, ActorRepository, RepositoryError};
use crate::session::{DungeonSession, PendingAdmission, SessionRegistry};

/// Why an admission request was refused. Nothing was changed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionRejection {
    #[error("{0} has no active session")]
    SessionNotFound(UserId),

    #[error("that session has already ended")]
    SessionEnded,

    #[error("that session does not accept interventions")]
    InterventionDisabled,

    #[error("that session is not in combat")]
    NotInCombat,

    #[error("admission closes after round {limit}, encounter is at round {round}")]
    WindowClosed { round: u32, limit: u32 },

    #[error("you are leading this encounter")]
    OwnEncounter,

    #[error("you are already fighting in this encounter")]
    AlreadyParticipant,

    #[error("your request is already pending")]
    AlreadyPending,

    #[error("the party is full ({limit} players)")]
    PartyFull { limit: usize },

    #[error("{0} has no stored character")]
    UnknownActor(UserId),

    #[error("intervention on cooldown for {remaining_secs}s")]
    Cooldown { remaining_secs: u64 },

    #[error("dungeon requires level {required}, you are level {actual}")]
    LevelTooLow { required: u32, actual: u32 },

    #[error("you are not in the same dungeon instance")]
    NotInSharedInstance,

    #[error("you are in combat yourself")]
    RequesterInCombat,

    #[error("you are already fighting in another encounter")]
    AlreadyEngaged,

    #[error("joining costs {required} gold, you have {available}")]
    InsufficientGold { required: u64, available: u64 },

    #[error("character store unavailable: {0}")]
    Unavailable(String),
}

/// Accepted request, queued for the next round boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionDecision {
    pub target: UserId,
    /// Round the request was accepted in.
    pub round: u32,
    pub distance: u32,
    pub tier: ProximityTier,
    /// Gold charged at commit.
    pub cost: u64,
    pub notify_after_secs: u64,
}

/// Why a queued request was not committed. Nothing was charged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DropReason {
    #[error("the encounter is over")]
    EncounterClosed,

    #[error("the party is full")]
    PartyFull,

    #[error("already fighting in another encounter")]
    AlreadyEngaged,

    #[error("busy with an event of their own session")]
    RequesterBusy,

    #[error("character no longer exists")]
    ActorVanished,

    #[error("joining costs {required} gold, only {available} left")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("loadout could not be built: {0}")]
    Loadout(String),

    #[error("character store unavailable: {0}")]
    Repository(String),
}

/// Result of committing one queued request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionOutcome {
    Committed {
        user: UserId,
        actor: ActorId,
        cost: u64,
    },
    Dropped {
        user: UserId,
        reason: DropReason,
    },
}

impl AdmissionOutcome {
    pub fn user(&self) -> UserId {
        match self {
            AdmissionOutcome::Committed { user, .. } | AdmissionOutcome::Dropped { user, .. } => {
                *user
            }
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, AdmissionOutcome::Committed { .. })
    }
}

pub struct InterventionService {
    registry: Arc<SessionRegistry>,
    instances: Arc<SharedInstanceManager>,
    actors: Arc<dyn ActorRepository>,
    catalog: Arc<dyn CatalogOracle>,
    config: CombatConfig,
    events: EventBus,
}

impl InterventionService {
    pub fn new(
        registry: Arc<SessionRegistry>,
        instances: Arc<SharedInstanceManager>,
        actors: Arc<dyn ActorRepository>,
        catalog: Arc<dyn CatalogOracle>,
        config: CombatConfig,
        events: EventBus,
    ) -> Self {
        Self {
            registry,
            instances,
            actors,
            catalog,
            config,
            events,
        }
    }

    /// Validates a request by `requester` to join the encounter led by
    /// `target` and queues it.
    ///
    /// Checks run in a fixed order and the first failure is reported.
    /// The requester's own session is inspected and released before the
    /// target session is locked.
    pub async fn request_admission(
        &self,
        requester: UserId,
        target: UserId,
    ) -> Result<AdmissionDecision, AdmissionRejection> {
        let now = Utc::now();
        let handle = self
            .registry
            .get(target)
            .ok_or(AdmissionRejection::SessionNotFound(target))?;

        let (requester_step, requester_in_combat) = if requester == target {
            (0, false)
        } else {
            match self.registry.get(requester) {
                Some(own) => {
                    let own = own.lock().await;
                    (own.step(), own.is_in_combat() && !own.is_ended())
                }
                None => (0, false),
            }
        };
        let engaged = self.registry.engagement(requester).is_some();
        let record = self
            .actors
            .load(requester)
            .map_err(|e| AdmissionRejection::Unavailable(e.to_string()))?;

        let mut session = handle.lock().await;

        if session.is_ended() {
            return Err(AdmissionRejection::SessionEnded);
        }
        if !session.allows_intervention() {
            return Err(AdmissionRejection::InterventionDisabled);
        }

        let combat = session
            .combat()
            .filter(|combat| !combat.is_finished())
            .ok_or(AdmissionRejection::NotInCombat)?;

        let round = combat.round();
        if round > self.config.admission_window_rounds {
            return Err(AdmissionRejection::WindowClosed {
                round,
                limit: self.config.admission_window_rounds,
            });
        }

        if requester == session.user() {
            return Err(AdmissionRejection::OwnEncounter);
        }
        if session.is_participant(requester) || combat.actor_for_user(requester).is_some() {
            return Err(AdmissionRejection::AlreadyParticipant);
        }
        if session.is_pending(requester) {
            return Err(AdmissionRejection::AlreadyPending);
        }

        if combat.player_count() + session.pending().len() >= self.config.max_party_size {
            return Err(AdmissionRejection::PartyFull {
                limit: self.config.max_party_size,
            });
        }

        let record = record.ok_or(AdmissionRejection::UnknownActor(requester))?;
        if let Some(remaining_secs) =
            record.cooldown_remaining(now, self.config.intervention_cooldown_secs)
        {
            return Err(AdmissionRejection::Cooldown { remaining_secs });
        }

        let required = session.dungeon().min_level;
        if record.level < required {
            return Err(AdmissionRejection::LevelTooLow {
                required,
                actual: record.level,
            });
        }

        if !self.instances.shares_instance(requester, target) {
            return Err(AdmissionRejection::NotInSharedInstance);
        }
        if requester_in_combat {
            return Err(AdmissionRejection::RequesterInCombat);
        }
        if engaged {
            return Err(AdmissionRejection::AlreadyEngaged);
        }

        let distance = distance(requester_step, session.step());
        let tier = ProximityTier::classify(distance);
        let cost = tier.admission_cost();
        if record.gold < cost {
            return Err(AdmissionRejection::InsufficientGold {
                required: cost,
                available: record.gold,
            });
        }

        session.enqueue_admission(requester, distance, now);
        drop(session);

        let decision = AdmissionDecision {
            target,
            round,
            distance,
            tier,
            cost,
            notify_after_secs: tier.notification_delay_secs(),
        };
        tracing::info!(
            target: "runtime::intervention",
            requester = %requester,
            target = %target,
            round,
            tier = %tier,
            cost,
            "admission queued"
        );
        self.events.publish(AdmissionEvent::Requested {
            requester,
            target,
            tier,
            notify_after_secs: decision.notify_after_secs,
        });
        Ok(decision)
    }

    /// Commits every queued request of `session`, in request order.
    ///
    /// Only call at a round boundary, with the session locked by its worker.
    pub fn commit_pending(&self, session: &mut DungeonSession) -> Vec<AdmissionOutcome> {
        let pending = session.take_pending();
        if pending.is_empty() {
            return Vec::new();
        }

        let leader = session.user();
        let now = Utc::now();
        pending
            .into_iter()
            .map(|(user, admission)| {
                let outcome = match self.commit_one(session, user, admission, now) {
                    Ok((actor, cost)) => AdmissionOutcome::Committed { user, actor, cost },
                    Err(reason) => AdmissionOutcome::Dropped { user, reason },
                };
                self.announce(leader, &outcome);
                outcome
            })
            .collect()
    }

    /// Drops every queued request because the encounter is closing.
    pub fn discard_pending(&self, session: &mut DungeonSession) -> Vec<AdmissionOutcome> {
        let leader = session.user();
        session
            .take_pending()
            .into_iter()
            .map(|(user, _)| {
                let outcome = AdmissionOutcome::Dropped {
                    user,
                    reason: DropReason::EncounterClosed,
                };
                self.announce(leader, &outcome);
                outcome
            })
            .collect()
    }

    /// One all-or-nothing commit.
    ///
    /// Every fallible step runs before the repository transaction; the
    /// engagement reservation is released if the transaction fails. After
    /// the transaction only infallible inserts remain.
    ///
    /// The reservation also fails while the requester resolves a step of
    /// their own session, which may have started after the request.
    fn commit_one(
        &self,
        session: &mut DungeonSession,
        user: UserId,
        admission: PendingAdmission,
        now: DateTime<Utc>,
    ) -> Result<(ActorId, u64), DropReason> {
        let leader = session.user();
        let max_party = self.config.max_party_size;

        let combat = session
            .combat_mut()
            .filter(|combat| !combat.is_finished())
            .ok_or(DropReason::EncounterClosed)?;
        if combat.player_count() >= max_party {
            return Err(DropReason::PartyFull);
        }
        if combat.actor_for_user(user).is_some() {
            return Err(DropReason::AlreadyEngaged);
        }

        let record = self
            .actors
            .load(user)
            .map_err(|e| DropReason::Repository(e.to_string()))?
            .ok_or(DropReason::ActorVanished)?;
        let profile = record
            .profile(self.catalog.as_ref())
            .map_err(|e| DropReason::Loadout(e.to_string()))?;
        let cost = ProximityTier::classify(admission.distance).admission_cost();

        if !self.registry.try_engage(user, leader) {
            return Err(if self.registry.is_busy(user) {
                DropReason::RequesterBusy
            } else {
                DropReason::AlreadyEngaged
            });
        }
        let charged = self.actors.transact(user, &mut |record: &mut ActorRecord| {
            record.debit(cost)?;
            record.last_intervention_at = Some(now);
            Ok(())
        });
        if let Err(error) = charged {
            self.registry.release(user);
            return Err(match error {
                RepositoryError::InsufficientFunds {
                    required,
                    available,
                    ..
                } => DropReason::InsufficientFunds {
                    required,
                    available,
                },
                RepositoryError::ActorNotFound(_) => DropReason::ActorVanished,
                other => DropReason::Repository(other.to_string()),
            });
        }

        let actor = combat.admit_player(profile);
        session.add_participant(user, actor);
        Ok((actor, cost))
    }

    fn announce(&self, leader: UserId, outcome: &AdmissionOutcome) {
        match outcome {
            AdmissionOutcome::Committed { user, actor, cost } => {
                tracing::info!(
                    target: "runtime::intervention",
                    requester = %user,
                    leader = %leader,
                    actor = %actor,
                    cost,
                    "admission committed"
                );
                self.events.publish(AdmissionEvent::Committed {
                    requester: *user,
                    target: leader,
                    actor: *actor,
                    cost: *cost,
                });
            }
            AdmissionOutcome::Dropped { user, reason } => {
                tracing::info!(
                    target: "runtime::intervention",
                    requester = %user,
                    leader = %leader,
                    %reason,
                    "admission dropped"
                );
                self.events.publish(AdmissionEvent::Dropped {
                    requester: *user,
                    target: leader,
                    reason: reason.to_string(),
                });
            }
        }
    }
}
