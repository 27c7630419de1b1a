//! Mid-combat admission: validation order, round-boundary commits, and the
//! all-or-nothing charge.

mod common;

use chrono::Utc;
use game_core::{CombatEnv, ProximityTier, UserId};
use runtime::{
    ActorRepository, AdmissionOutcome, AdmissionRejection, ContentMode, DropReason,
};

use common::{CHANNEL, World, hero};

const LEADER: UserId = UserId(1);
const HELPER: UserId = UserId(2);

/// Admission requested during round 1 of a two-player fight.
///
/// The request only queues; the newcomer joins when the next round boundary
/// commits it, with an empty gauge, charged and on cooldown.
#[tokio::test]
async fn request_is_queued_then_committed_at_round_boundary() {
    let world = World::new([hero(1, 0), hero(2, 500), hero(3, 150)]);
    let session = world.open(1, "arena", ContentMode::Exploration, 5).await;
    world.instances.join(HELPER, CHANNEL, "arena");
    world.instances.join(UserId(3), CHANNEL, "arena");
    world.engage(&session, "dummy").await;

    // ----------------------------------------------------------------
    // A second player is already in the party
    // ----------------------------------------------------------------
    world
        .intervention
        .request_admission(HELPER, LEADER)
        .await
        .expect("helper request should be accepted");
    {
        let mut guard = session.lock().await;
        let outcomes = world.intervention.commit_pending(&mut guard);
        assert!(outcomes.iter().all(AdmissionOutcome::is_committed));
        assert_eq!(guard.combat().unwrap().player_count(), 2);
    }

    // ----------------------------------------------------------------
    // Third player asks during round 1
    // ----------------------------------------------------------------
    let decision = world
        .intervention
        .request_admission(UserId(3), LEADER)
        .await
        .expect("request should be accepted");
    assert_eq!(decision.round, 1);
    assert_eq!(decision.distance, 5);
    assert_eq!(decision.tier, ProximityTier::Nearby);
    assert_eq!(decision.cost, 100);
    assert_eq!(decision.notify_after_secs, 3);

    let mut guard = session.lock().await;
    assert!(guard.is_pending(UserId(3)));
    assert_eq!(guard.combat().unwrap().player_count(), 2);
    assert_eq!(
        world.actors.load(UserId(3)).unwrap().unwrap().gold,
        150,
        "nothing is charged before commit"
    );

    let env = CombatEnv::new(world.catalog.as_ref(), &world.config);
    let report = guard.combat_mut().unwrap().run_round(env).unwrap();
    assert_eq!(report.round, 1);
    assert_eq!(report.outcome, None);
    assert!(
        guard.combat().unwrap().actor_for_user(UserId(3)).is_none(),
        "queued player takes no part in the round it asked in"
    );

    // ----------------------------------------------------------------
    // Round boundary
    // ----------------------------------------------------------------
    let outcomes = world.intervention.commit_pending(&mut guard);
    assert_eq!(outcomes.len(), 1);
    let AdmissionOutcome::Committed { user, actor, cost } = outcomes[0].clone() else {
        panic!("expected a commit, got {:?}", outcomes[0]);
    };
    assert_eq!(user, UserId(3));
    assert_eq!(cost, 100);

    let combat = guard.combat().unwrap();
    assert_eq!(combat.player_count(), 3);
    assert_eq!(combat.gauge(actor), Some(0));
    assert_eq!(combat.actor_for_user(UserId(3)), Some(actor));
    assert!(guard.is_participant(UserId(3)));
    assert!(!guard.is_pending(UserId(3)));

    let record = world.actors.load(UserId(3)).unwrap().unwrap();
    assert_eq!(record.gold, 50);
    assert!(record.last_intervention_at.is_some());
    assert_eq!(world.registry.engagement(UserId(3)), Some(LEADER));

    let env = CombatEnv::new(world.catalog.as_ref(), &world.config);
    let report = guard.combat_mut().unwrap().run_round(env).unwrap();
    assert_eq!(report.round, 2);
    assert!(report.order.contains(&actor));
}

#[tokio::test]
async fn missing_and_idle_targets_are_rejected() {
    let world = World::new([hero(1, 0), hero(2, 500)]);
    world.instances.join(HELPER, CHANNEL, "arena");

    assert_eq!(
        world.intervention.request_admission(HELPER, LEADER).await,
        Err(AdmissionRejection::SessionNotFound(LEADER))
    );

    let _session = world.open(1, "arena", ContentMode::Exploration, 1).await;
    assert_eq!(
        world.intervention.request_admission(HELPER, LEADER).await,
        Err(AdmissionRejection::NotInCombat)
    );
}

#[tokio::test]
async fn tower_sessions_refuse_interventions() {
    let world = World::new([hero(1, 0), hero(2, 500)]);
    let session = world.open(1, "arena", ContentMode::Tower, 1).await;
    world.instances.join(HELPER, CHANNEL, "arena");
    world.engage(&session, "dummy").await;

    assert_eq!(
        world.intervention.request_admission(HELPER, LEADER).await,
        Err(AdmissionRejection::InterventionDisabled)
    );
}

#[tokio::test]
async fn window_closes_after_third_round() {
    let world = World::new([hero(1, 0), hero(2, 500)]);
    let session = world.open(1, "arena", ContentMode::Exploration, 1).await;
    world.instances.join(HELPER, CHANNEL, "arena");
    world.engage(&session, "dummy").await;

    {
        let mut guard = session.lock().await;
        for _ in 0..3 {
            let env = CombatEnv::new(world.catalog.as_ref(), &world.config);
            guard.combat_mut().unwrap().run_round(env).unwrap();
        }
        assert_eq!(guard.combat().unwrap().round(), 4);
    }

    assert_eq!(
        world.intervention.request_admission(HELPER, LEADER).await,
        Err(AdmissionRejection::WindowClosed { round: 4, limit: 3 })
    );
}

#[tokio::test]
async fn duplicate_and_self_requests_are_rejected() {
    let world = World::new([hero(1, 0), hero(2, 500)]);
    let session = world.open(1, "arena", ContentMode::Exploration, 1).await;
    world.instances.join(HELPER, CHANNEL, "arena");
    world.engage(&session, "dummy").await;

    assert_eq!(
        world.intervention.request_admission(LEADER, LEADER).await,
        Err(AdmissionRejection::OwnEncounter)
    );

    world
        .intervention
        .request_admission(HELPER, LEADER)
        .await
        .expect("first request should be accepted");
    assert_eq!(
        world.intervention.request_admission(HELPER, LEADER).await,
        Err(AdmissionRejection::AlreadyPending)
    );

    world.intervention.commit_pending(&mut *session.lock().await);
    assert_eq!(
        world.intervention.request_admission(HELPER, LEADER).await,
        Err(AdmissionRejection::AlreadyParticipant)
    );
}

#[tokio::test]
async fn party_counts_pending_requests() {
    let world = World::new((1..=5).map(|user| hero(user, 500)));
    let session = world.open(1, "arena", ContentMode::Exploration, 1).await;
    for user in 2..=5 {
        world.instances.join(UserId(user), CHANNEL, "arena");
    }
    world.engage(&session, "dummy").await;

    for user in 2..=4 {
        world
            .intervention
            .request_admission(UserId(user), LEADER)
            .await
            .expect("party has room");
    }
    assert_eq!(
        world.intervention.request_admission(UserId(5), LEADER).await,
        Err(AdmissionRejection::PartyFull { limit: 4 })
    );
}

#[tokio::test]
async fn requester_checks_run_in_order() {
    let mut cooling = hero(3, 500);
    cooling.last_intervention_at = Some(Utc::now());
    let mut novice = hero(4, 500);
    novice.level = 1;
    let world = World::new([hero(1, 0), hero(2, 500), cooling, novice, hero(5, 500), hero(6, 0)]);
    let session = world.open(1, "arena", ContentMode::Exploration, 5).await;
    for user in [3, 4, 6] {
        world.instances.join(UserId(user), CHANNEL, "arena");
    }
    world.engage(&session, "dummy").await;

    assert_eq!(
        world.intervention.request_admission(UserId(9), LEADER).await,
        Err(AdmissionRejection::UnknownActor(UserId(9)))
    );
    assert!(matches!(
        world.intervention.request_admission(UserId(3), LEADER).await,
        Err(AdmissionRejection::Cooldown { remaining_secs }) if remaining_secs > 0
    ));
    assert_eq!(
        world.intervention.request_admission(UserId(4), LEADER).await,
        Err(AdmissionRejection::LevelTooLow {
            required: 2,
            actual: 1
        })
    );
    // user 5 never joined the instance
    assert_eq!(
        world.intervention.request_admission(UserId(5), LEADER).await,
        Err(AdmissionRejection::NotInSharedInstance)
    );
    assert_eq!(
        world.intervention.request_admission(UserId(6), LEADER).await,
        Err(AdmissionRejection::InsufficientGold {
            required: 100,
            available: 0
        })
    );

    let guard = session.lock().await;
    assert!(guard.pending().is_empty(), "rejections queue nothing");
}

#[tokio::test]
async fn requester_in_own_fight_is_rejected() {
    let world = World::new([hero(1, 0), hero(2, 500)]);
    let session = world.open(1, "arena", ContentMode::Exploration, 1).await;
    let own = world.open(2, "arena", ContentMode::Exploration, 1).await;
    world.engage(&session, "dummy").await;
    world.engage(&own, "dummy").await;

    assert_eq!(
        world.intervention.request_admission(HELPER, LEADER).await,
        Err(AdmissionRejection::RequesterInCombat)
    );
}

#[tokio::test]
async fn engaged_player_cannot_join_a_second_encounter() {
    let world = World::new([hero(1, 0), hero(2, 500), hero(3, 0)]);
    let first = world.open(1, "arena", ContentMode::Exploration, 1).await;
    let second = world.open(3, "arena", ContentMode::Exploration, 1).await;
    world.instances.join(HELPER, CHANNEL, "arena");
    world.engage(&first, "dummy").await;
    world.engage(&second, "dummy").await;

    world
        .intervention
        .request_admission(HELPER, LEADER)
        .await
        .expect("first request should be accepted");
    world.intervention.commit_pending(&mut *first.lock().await);
    assert_eq!(world.registry.engagement(HELPER), Some(LEADER));

    assert_eq!(
        world.intervention.request_admission(HELPER, UserId(3)).await,
        Err(AdmissionRejection::AlreadyEngaged)
    );

    // ending the first encounter's session frees the helper
    world
        .registry
        .end(LEADER, runtime::EndReason::Stopped)
        .await;
    assert_eq!(world.registry.engagement(HELPER), None);
    world
        .intervention
        .request_admission(HELPER, UserId(3))
        .await
        .expect("helper is free again");
}

/// Gold spent between request and commit drops the admission and charges
/// nothing.
#[tokio::test]
async fn funds_spent_before_commit_drop_the_admission() {
    let world = World::new([hero(1, 0), hero(2, 150)]);
    let session = world.open(1, "arena", ContentMode::Exploration, 5).await;
    world.instances.join(HELPER, CHANNEL, "arena");
    world.engage(&session, "dummy").await;

    world
        .intervention
        .request_admission(HELPER, LEADER)
        .await
        .expect("request should be accepted");
    world.actors.debit(HELPER, 100).expect("debit should succeed");

    let mut guard = session.lock().await;
    let outcomes = world.intervention.commit_pending(&mut guard);
    assert_eq!(
        outcomes,
        vec![AdmissionOutcome::Dropped {
            user: HELPER,
            reason: DropReason::InsufficientFunds {
                required: 100,
                available: 50
            },
        }]
    );

    let record = world.actors.load(HELPER).unwrap().unwrap();
    assert_eq!(record.gold, 50);
    assert_eq!(record.last_intervention_at, None);
    assert_eq!(world.registry.engagement(HELPER), None);
    assert_eq!(guard.combat().unwrap().player_count(), 1);
    assert!(!guard.is_participant(HELPER));
}

#[tokio::test]
async fn closing_encounter_drops_queued_requests() {
    let world = World::new([hero(1, 0), hero(2, 500)]);
    let session = world.open(1, "arena", ContentMode::Exploration, 1).await;
    world.instances.join(HELPER, CHANNEL, "arena");
    world.engage(&session, "dummy").await;
    world
        .intervention
        .request_admission(HELPER, LEADER)
        .await
        .expect("request should be accepted");

    let mut guard = session.lock().await;
    let outcomes = world.intervention.discard_pending(&mut guard);
    assert_eq!(
        outcomes,
        vec![AdmissionOutcome::Dropped {
            user: HELPER,
            reason: DropReason::EncounterClosed,
        }]
    );
    assert_eq!(world.actors.load(HELPER).unwrap().unwrap().gold, 500);
}

/// A requester who starts a step of their own session after asking is not
/// pulled into the leader's fight, and once admitted cannot start one.
#[tokio::test]
async fn own_step_and_admission_never_overlap() {
    let world = World::new([hero(1, 0), hero(2, 500)]);
    let session = world.open(1, "arena", ContentMode::Exploration, 1).await;
    let own = world.open(2, "arena", ContentMode::Exploration, 1).await;
    world.engage(&session, "dummy").await;

    world
        .intervention
        .request_admission(HELPER, LEADER)
        .await
        .expect("idle helper should be accepted");

    // ----------------------------------------------------------------
    // Helper steps deeper before the boundary
    // ----------------------------------------------------------------
    assert!(world.registry.begin_own_event(HELPER));
    own.lock().await.advance_step().expect("idle session should advance");

    let outcomes = world.intervention.commit_pending(&mut *session.lock().await);
    assert_eq!(
        outcomes,
        vec![AdmissionOutcome::Dropped {
            user: HELPER,
            reason: DropReason::RequesterBusy,
        }]
    );
    assert_eq!(world.registry.engagement(HELPER), None);
    assert_eq!(world.actors.load(HELPER).unwrap().unwrap().gold, 500);
    assert!(
        session
            .lock()
            .await
            .combat()
            .unwrap()
            .actor_for_user(HELPER)
            .is_none()
    );

    // ----------------------------------------------------------------
    // Helper goes idle, is admitted, and is then held back
    // ----------------------------------------------------------------
    own.lock().await.finish_event();
    world.registry.finish_own_event(HELPER);
    world
        .intervention
        .request_admission(HELPER, LEADER)
        .await
        .expect("idle helper should be accepted again");
    let outcomes = world.intervention.commit_pending(&mut *session.lock().await);
    assert!(outcomes.iter().all(AdmissionOutcome::is_committed));

    assert_eq!(world.registry.engagement(HELPER), Some(LEADER));
    assert!(
        !world.registry.begin_own_event(HELPER),
        "a user fights in at most one encounter"
    );
}

/// Ending a leader mid-fight writes back the hp of everyone fighting there.
#[tokio::test]
async fn ending_a_leader_mid_fight_keeps_participant_hp() {
    let mut wounded = hero(2, 500);
    wounded.hp = 200;
    let world = World::new([hero(1, 0), wounded]);
    let session = world.open(1, "arena", ContentMode::Exploration, 1).await;
    world.instances.join(HELPER, CHANNEL, "arena");
    world.engage(&session, "dummy").await;

    world
        .intervention
        .request_admission(HELPER, LEADER)
        .await
        .expect("request should be accepted");
    let outcomes = world.intervention.commit_pending(&mut *session.lock().await);
    assert!(outcomes.iter().all(AdmissionOutcome::is_committed));

    // the stored record drifts while the fight runs
    let mut record = world.actors.load(HELPER).unwrap().unwrap();
    record.hp = 500;
    world.actors.save(&record).unwrap();

    assert!(world.registry.end(LEADER, runtime::EndReason::Stopped).await);

    assert_eq!(world.actors.load(HELPER).unwrap().unwrap().hp, 200);
    assert_eq!(world.registry.engagement(HELPER), None);
}
