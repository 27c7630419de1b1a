//! Encounter settlement: reward payout and history.
//!
//! A closed encounter is settled once. On victory the monster pool is split
//! by contribution and each share is credited in its own transaction. A
//! failed credit is logged and reported without stopping the others.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use game_core::{
    ActorKind, CombatOutcome, Contributor, RewardPool, RewardShare, UserId, distribute,
};

use crate::repository::{ActorRecord, ActorRepository, EncounterLog, EncounterRecord};
use crate::session::ClosedEncounter;

/// A credit that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutFailure {
    pub user: UserId,
    pub error: String,
}

/// What settling one encounter produced.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub outcome: CombatOutcome,
    pub pool: RewardPool,
    pub shares: Vec<RewardShare<UserId>>,
    pub failures: Vec<PayoutFailure>,
    pub record: EncounterRecord,
}

pub struct RewardService {
    actors: Arc<dyn ActorRepository>,
    history: Arc<dyn EncounterLog>,
}

impl RewardService {
    pub fn new(actors: Arc<dyn ActorRepository>, history: Arc<dyn EncounterLog>) -> Self {
        Self { actors, history }
    }

    /// Settles an encounter led by `leader` in `dungeon`.
    ///
    /// Every participant's remaining hp is written back together with its
    /// credit. Knocked out participants are stored at 1 hp.
    pub fn settle(
        &self,
        leader: UserId,
        dungeon: &str,
        closed: &ClosedEncounter,
        now: DateTime<Utc>,
    ) -> Settlement {
        let context = &closed.context;
        let outcome = context.outcome().unwrap_or(CombatOutcome::Fled);
        let pool = context.reward_pool();

        let shares = if outcome == CombatOutcome::Victory {
            let contributors = self.contributors(leader, closed);
            let leader_level = contributors
                .iter()
                .find(|contributor| contributor.leader)
                .map_or(1, |contributor| contributor.level);
            distribute(pool, leader_level, &contributors)
        } else {
            Vec::new()
        };

        let mut failures = Vec::new();
        for (&user, &actor_id) in &closed.participants {
            let hp = context
                .roster()
                .actor(actor_id)
                .map_or(1, |actor| actor.hp.max(1));
            let (exp, gold) = shares
                .iter()
                .find(|share| share.key == user)
                .map_or((0, 0), |share| (share.exp, share.gold));

            let result = self.actors.transact(user, &mut |record: &mut ActorRecord| {
                record.hp = hp.min(record.stats.max_hp);
                record.credit(exp, gold);
                Ok(())
            });
            if let Err(error) = result {
                tracing::warn!(
                    target: "runtime::reward",
                    user = %user,
                    leader = %leader,
                    exp,
                    gold,
                    %error,
                    "payout failed"
                );
                failures.push(PayoutFailure {
                    user,
                    error: error.to_string(),
                });
            }
        }

        let monster = context
            .roster()
            .monsters()
            .first()
            .map_or_else(|| "unknown".to_string(), |actor| actor.name.clone());
        let record = EncounterRecord::new(
            leader,
            dungeon,
            monster,
            outcome,
            closed.participants.len() as u32,
            context.player_damage(),
            context.round(),
            now,
        );
        if let Err(error) = self.history.append(&record) {
            tracing::warn!(
                target: "runtime::reward",
                leader = %leader,
                %error,
                "failed to append encounter history"
            );
        }

        tracing::info!(
            target: "runtime::reward",
            leader = %leader,
            outcome = %outcome,
            exp = pool.exp,
            gold = pool.gold,
            shares = shares.len(),
            failures = failures.len(),
            "encounter settled"
        );

        Settlement {
            outcome,
            pool,
            shares,
            failures,
            record,
        }
    }

    fn contributors(&self, leader: UserId, closed: &ClosedEncounter) -> Vec<Contributor<UserId>> {
        let mut contributors: Vec<Contributor<UserId>> = closed
            .participants
            .iter()
            .filter_map(|(&user, &actor_id)| {
                let actor = closed.context.roster().actor(actor_id)?;
                let ActorKind::Player { level, .. } = actor.kind else {
                    return None;
                };
                Some(Contributor {
                    key: user,
                    level,
                    score: closed.scores.get(&user).copied().unwrap_or(0.0),
                    leader: user == leader,
                })
            })
            .collect();
        contributors.sort_by_key(|contributor| (!contributor.leader, contributor.key));
        contributors
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use game_content::CatalogLoader;
    use game_core::{ActorStats, CatalogOracle, CombatConfig, CombatContext, CombatEnv};

    use super::*;
    use crate::repository::{InMemoryActorRepo, InMemoryEncounterLog};

    const CATALOG: &str = r#"
(
    skills: [(id: "tap", name: "Tap", effects: [DirectDamage((power: 100))])],
    monsters: [
        (
            id: "rat",
            name: "Rat",
            level: 1,
            stats: (max_hp: 5, attack: 1, defense: 0, speed: 5),
            skills: ["tap"],
            exp: 12,
            gold: 6,
        ),
    ],
    dungeons: [],
)
"#;

    fn hero(user: u64) -> ActorRecord {
        ActorRecord::new(
            UserId(user),
            format!("hero-{user}"),
            5,
            ActorStats::new(500, 20, 5, 50),
            vec!["tap".into()],
        )
    }

    /// A won fight against one rat, fought by users 1 (leader) and 2.
    fn won_encounter(catalog: &dyn CatalogOracle) -> ClosedEncounter {
        let rat = catalog.monster_by_id("rat").expect("rat should exist");
        let leader = hero(1).profile(catalog).expect("leader loadout");
        let helper = hero(2).profile(catalog).expect("helper loadout");

        let mut context =
            CombatContext::start(5, 0, leader, &[rat], None, catalog).expect("fight should start");
        let helper_actor = context.admit_player(helper);
        let leader_actor = context
            .actor_for_user(UserId(1))
            .expect("leader should be seated");

        let config = CombatConfig::default();
        while !context.is_finished() {
            context
                .run_round(CombatEnv::new(catalog, &config))
                .expect("round should resolve");
        }
        assert_eq!(context.outcome(), Some(CombatOutcome::Victory));

        ClosedEncounter {
            context,
            scores: BTreeMap::from([(UserId(1), 10.0), (UserId(2), 10.0)]),
            participants: HashMap::from([(UserId(1), leader_actor), (UserId(2), helper_actor)]),
        }
    }

    #[test]
    fn missing_participant_does_not_block_other_payouts() {
        let catalog = CatalogLoader::parse(CATALOG).expect("catalog should parse");
        let closed = won_encounter(&catalog);

        // user 2 was deleted between admission and payout
        let actors = Arc::new(InMemoryActorRepo::with_records([hero(1)]));
        let history = Arc::new(InMemoryEncounterLog::new());
        let rewards = RewardService::new(actors.clone(), history.clone());

        let settlement = rewards.settle(UserId(1), "cellar", &closed, Utc::now());

        assert_eq!(settlement.outcome, CombatOutcome::Victory);
        assert_eq!(settlement.shares.len(), 2);
        assert_eq!(settlement.failures.len(), 1);
        assert_eq!(settlement.failures[0].user, UserId(2));

        let leader_share = settlement
            .shares
            .iter()
            .find(|share| share.key == UserId(1))
            .expect("leader should have a share");
        let stored = actors.load(UserId(1)).unwrap().unwrap();
        assert_eq!(stored.exp, leader_share.exp);
        assert_eq!(stored.gold, leader_share.gold);
        assert!(stored.gold > 0);
        assert_eq!(history.len(), 1);
    }
}
