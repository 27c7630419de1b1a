//! Live sessions keyed by user.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use game_core::UserId;

use super::{DungeonSession, EndReason};
use crate::events::{EventBus, SessionEvent};
use crate::instance::SharedInstanceManager;
use crate::repository::ActorRepository;

/// Shared, lockable session. The owning worker is the only writer of
/// exploration and combat state.
pub type SessionHandle = Arc<tokio::sync::Mutex<DungeonSession>>;

#[derive(Default)]
struct Sessions {
    live: HashMap<UserId, SessionHandle>,
    /// Participant -> leader of the encounter it fights in.
    engagements: HashMap<UserId, UserId>,
    /// Users resolving a step event (rest or fight) of their own session.
    busy: HashSet<UserId>,
}

/// Single source of truth for which users have a running session and which
/// encounter each user is fighting in.
///
/// Every mutation happens under one mutex that is never held across an
/// await. Session locks are always taken after the registry lock has been
/// released.
pub struct SessionRegistry {
    inner: Mutex<Sessions>,
    actors: Arc<dyn ActorRepository>,
    instances: Arc<SharedInstanceManager>,
    events: EventBus,
}

impl SessionRegistry {
    pub fn new(
        actors: Arc<dyn ActorRepository>,
        instances: Arc<SharedInstanceManager>,
        events: EventBus,
    ) -> Self {
        Self {
            inner: Mutex::new(Sessions::default()),
            actors,
            instances,
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Sessions> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts the session built by `build` unless `user` already has one.
    ///
    /// `build` only runs when the slot is free.
    pub fn create(
        &self,
        user: UserId,
        build: impl FnOnce() -> DungeonSession,
    ) -> Option<SessionHandle> {
        let mut inner = self.lock();
        if inner.live.contains_key(&user) {
            return None;
        }
        let handle = Arc::new(tokio::sync::Mutex::new(build()));
        inner.live.insert(user, Arc::clone(&handle));
        Some(handle)
    }

    pub fn get(&self, user: UserId) -> Option<SessionHandle> {
        self.lock().live.get(&user).cloned()
    }

    pub fn contains(&self, user: UserId) -> bool {
        self.lock().live.contains_key(&user)
    }

    /// Snapshot of every live session.
    pub fn sessions(&self) -> Vec<(UserId, SessionHandle)> {
        self.lock()
            .live
            .iter()
            .map(|(user, handle)| (*user, Arc::clone(handle)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tears the session of `user` down.
    ///
    /// Marks it ended, discards a running encounter without payout, saves
    /// the hp of everyone still fighting in it, releases the encounter's
    /// engagements and the instance membership, and removes the registry
    /// entry. Returns `false` when there was nothing to end. Must not be
    /// called while holding the session's lock.
    pub async fn end(&self, user: UserId, reason: EndReason) -> bool {
        let handle = {
            let mut inner = self.lock();
            let Some(handle) = inner.live.remove(&user) else {
                return false;
            };
            inner.release_owner(user);
            handle
        };
        self.teardown(user, &handle, reason).await;
        true
    }

    /// Like [`end`](Self::end), but only when `handle` is still the live
    /// session of its owner.
    ///
    /// A worker whose session was already ended (and possibly replaced by a
    /// new one for the same user) must not touch the replacement.
    pub async fn end_handle(&self, handle: &SessionHandle, reason: EndReason) -> bool {
        let user = {
            let mut inner = self.lock();
            let Some(user) = inner
                .live
                .iter()
                .find(|(_, live)| Arc::ptr_eq(live, handle))
                .map(|(user, _)| *user)
            else {
                return false;
            };
            inner.live.remove(&user);
            inner.release_owner(user);
            user
        };
        self.teardown(user, handle, reason).await;
        true
    }

    async fn teardown(&self, user: UserId, handle: &SessionHandle, reason: EndReason) {
        let survivors = {
            let mut session = handle.lock().await;
            session.mark_ended();
            match session.leave_combat() {
                Some(closed) => {
                    tracing::info!(
                        target: "runtime::session",
                        user = %user,
                        round = closed.context.round(),
                        participants = closed.participants.len(),
                        "encounter discarded at session end"
                    );
                    closed
                        .participants
                        .iter()
                        .filter_map(|(participant, actor)| {
                            let hp = closed.context.roster().actor(*actor)?.hp;
                            Some((*participant, hp))
                        })
                        .collect()
                }
                None => Vec::new(),
            }
        };

        for (participant, hp) in survivors {
            if participant != user {
                tracing::warn!(
                    target: "runtime::session",
                    user = %participant,
                    leader = %user,
                    hp,
                    "participant dropped from discarded encounter without reward"
                );
            }
            self.persist_hp(participant, hp.max(1));
        }
        self.instances.leave(user);

        tracing::info!(target: "runtime::session", user = %user, %reason, "session ended");
        self.events.publish(SessionEvent::Ended { user, reason });
    }

    fn persist_hp(&self, user: UserId, hp: u32) {
        let result = self.actors.load(user).and_then(|record| match record {
            Some(mut record) => {
                record.hp = hp;
                self.actors.save(&record)
            }
            None => Ok(()),
        });
        if let Err(error) = result {
            tracing::warn!(
                target: "runtime::session",
                user = %user,
                %error,
                "failed to persist final character state"
            );
        }
    }

    // ========================================================================
    // Engagements
    // ========================================================================

    /// Leader of the encounter `user` currently fights in as a participant.
    pub fn engagement(&self, user: UserId) -> Option<UserId> {
        self.lock().engagements.get(&user).copied()
    }

    /// Reserves `participant` for the encounter led by `leader`.
    ///
    /// Returns `false` when the participant is already engaged elsewhere.
    pub(crate) fn try_engage(&self, participant: UserId, leader: UserId) -> bool {
        let mut inner = self.lock();
        if inner.engagements.contains_key(&participant) || inner.busy.contains(&participant) {
            return false;
        }
        inner.engagements.insert(participant, leader);
        true
    }

    pub(crate) fn release(&self, participant: UserId) {
        self.lock().engagements.remove(&participant);
    }

    /// Frees every participant of the encounter led by `leader`.
    pub(crate) fn release_encounter(&self, leader: UserId) -> usize {
        let mut inner = self.lock();
        let before = inner.engagements.len();
        inner.engagements.retain(|_, engaged| *engaged != leader);
        before - inner.engagements.len()
    }

    /// Reserves `user` for a step event of their own session.
    ///
    /// Fails while the user fights in someone else's encounter. While the
    /// reservation is held no admission of `user` can commit.
    pub fn begin_own_event(&self, user: UserId) -> bool {
        let mut inner = self.lock();
        if inner.engagements.contains_key(&user) {
            return false;
        }
        inner.busy.insert(user)
    }

    pub fn finish_own_event(&self, user: UserId) {
        self.lock().busy.remove(&user);
    }

    /// True while `user` resolves a step event of their own session.
    pub fn is_busy(&self, user: UserId) -> bool {
        self.lock().busy.contains(&user)
    }
}

impl Sessions {
    /// Drops every engagement led by `owner` and the owner's own reservation.
    fn release_owner(&mut self, owner: UserId) {
        self.engagements.retain(|_, leader| *leader != owner);
        self.busy.remove(&owner);
    }
}
