//! Scripted two-player run through a shared dungeon instance.
//!
//! Ayla explores the dungeon on her own. Brann waits in the same instance
//! and steps into her first fight. Every runtime event is printed to stdout
//! as one JSON line.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast::{self, error::RecvError};

use game_core::{ActorStats, CatalogOracle, ChannelId, UserId};
use runtime::{
    ActorRecord, ActorRepository, CombatEvent, ContentMode, Event, InMemoryActorRepo, Runtime,
    RuntimeConfig, SessionEvent, Topic,
};

const LEADER: UserId = UserId(1);
const HELPER: UserId = UserId(2);
const CHANNEL: ChannelId = ChannelId(1);
const DUNGEON: &str = "goblin_warren";

fn party() -> Vec<ActorRecord> {
    vec![
        ActorRecord::new(
            LEADER,
            "Ayla",
            6,
            ActorStats::new(160, 22, 9, 55),
            vec!["slash".into(), "ignite".into(), "detonate".into(), "mending".into()],
        )
        .with_gold(40),
        ActorRecord::new(
            HELPER,
            "Brann",
            5,
            ActorStats::new(190, 17, 12, 45),
            vec!["heavy_blow".into(), "shield_wall".into(), "iron_skin".into()],
        )
        .with_gold(500),
    ]
}

pub async fn run(config: RuntimeConfig, catalog: Arc<dyn CatalogOracle>) -> Result<()> {
    let actors = Arc::new(InMemoryActorRepo::with_records(party()));
    let runtime = Runtime::builder()
        .config(config)
        .catalog(catalog)
        .actors(actors.clone())
        .build()
        .await?;

    let mut session_events = runtime.subscribe(Topic::Session);
    let mut combat_events = runtime.subscribe(Topic::Combat);
    let mut admission_events = runtime.subscribe(Topic::Admission);

    runtime
        .start_session(LEADER, CHANNEL, DUNGEON, ContentMode::Exploration)
        .context("failed to start the leader session")?;
    let instance = runtime.instances().join(HELPER, CHANNEL, DUNGEON);
    tracing::info!(%instance, "Brann is waiting in the instance");

    let mut helped = false;
    loop {
        let event = tokio::select! {
            event = next(&mut session_events) => event,
            event = next(&mut combat_events) => event,
            event = next(&mut admission_events) => event,
        };
        let Some(event) = event else {
            break;
        };
        println!("{}", serde_json::to_string(&event)?);

        match event {
            Event::Combat(CombatEvent::EncounterStarted { leader, .. })
                if leader == LEADER && !helped =>
            {
                helped = true;
                match runtime.request_admission(HELPER, LEADER).await {
                    Ok(decision) => tracing::info!(
                        tier = %decision.tier,
                        cost = decision.cost,
                        round = decision.round,
                        "Brann is on the way"
                    ),
                    Err(rejection) => tracing::warn!(%rejection, "Brann was turned away"),
                }
            }
            Event::Session(SessionEvent::Ended { user, reason }) if user == LEADER => {
                tracing::info!(%reason, "Ayla's run is over");
                break;
            }
            _ => {}
        }
    }

    runtime.join_session(LEADER).await?;
    for user in [LEADER, HELPER] {
        if let Some(record) = actors.load(user)? {
            println!("{}", serde_json::to_string(&record)?);
        }
    }
    for record in runtime.history(LEADER)? {
        println!("{}", serde_json::to_string(&record)?);
    }

    runtime.shutdown().await?;
    Ok(())
}

/// Next event on one topic, skipping over lag. `None` once the bus is gone.
async fn next(receiver: &mut broadcast::Receiver<Event>) -> Option<Event> {
    loop {
        match receiver.recv().await {
            Ok(event) => return Some(event),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event printer fell behind");
            }
            Err(RecvError::Closed) => return None,
        }
    }
}
