//! Encounter resolution.
//!
//! [`CombatContext`] owns the roster and the action gauges and runs rounds in
//! three phases:
//!
//! 1. **start**: gauges grow by speed, phase order is drawn, pre-action hooks
//! 2. **action**: each living actor acts once in phase order, then actors
//!    holding a full bonus gauge act again
//! 3. **end**: [`StatusEffectEngine`] ticks statuses and the field
//!
//! Either side being wiped stops the action phase immediately.
mod context;
mod roster;
mod status_engine;
mod turns;

pub use context::{CombatContext, CombatOutcome, FleeOutcome, RoundReport};
pub use roster::Roster;
pub use status_engine::StatusEffectEngine;
pub use turns::{first_strike_percent, phase_order};

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::config::CombatConfig;
    use crate::env::{CatalogOracle, CombatEnv, DungeonDefinition, MonsterTemplate};
    use crate::error::CombatError;
    use crate::skill::{DirectDamageEffect, Skill, SkillEffect, SummonEffect};
    use crate::state::{ActorId, ActorStats, PlayerProfile, UserId};

    #[derive(Default)]
    struct TestCatalog {
        monsters: HashMap<String, MonsterTemplate>,
        skills: HashMap<String, Skill>,
    }

    impl TestCatalog {
        fn with_monster(mut self, template: MonsterTemplate) -> Self {
            self.monsters.insert(template.id.clone(), template);
            self
        }

        fn with_skill(mut self, skill: Skill) -> Self {
            self.skills.insert(skill.id.clone(), skill);
            self
        }
    }

    impl CatalogOracle for TestCatalog {
        fn monster_by_id(&self, id: &str) -> Option<MonsterTemplate> {
            self.monsters.get(id).cloned()
        }

        fn skill_by_id(&self, id: &str) -> Option<Skill> {
            self.skills.get(id).cloned()
        }

        fn dungeon_by_id(&self, _id: &str) -> Option<DungeonDefinition> {
            None
        }
    }

    fn template(id: &str, stats: ActorStats, boss: bool) -> MonsterTemplate {
        MonsterTemplate {
            id: id.into(),
            name: id.into(),
            level: 1,
            stats,
            skills: Vec::new(),
            boss,
            exp: 100,
            gold: 40,
        }
    }

    fn hero(user: u64, attack: u32, speed: u32) -> PlayerProfile {
        PlayerProfile {
            user: UserId(user),
            name: format!("hero{user}"),
            level: 10,
            hp: 200,
            stats: ActorStats::new(200, attack, 5, speed),
            loadout: vec![Skill::new(
                "slash",
                "Slash",
                vec![SkillEffect::DirectDamage(DirectDamageEffect::single(100))],
            )],
        }
    }

    fn gauge_keys_match_roster(context: &CombatContext) -> bool {
        let mut ids = context.roster().ids();
        ids.sort();
        let keys: Vec<ActorId> = context.gauges().keys().copied().collect();
        ids == keys
    }

    #[test]
    fn strong_party_wins_and_round_stops_advancing() {
        let catalog = TestCatalog::default();
        let config = CombatConfig::default();
        let env = CombatEnv::new(&catalog, &config);
        let rat = template("rat", ActorStats::new(30, 5, 0, 40), false);
        let mut context =
            CombatContext::start(7, 0, hero(1, 50, 60), &[rat.clone(), rat], None, &catalog)
                .unwrap();

        let mut last = None;
        for _ in 0..10 {
            let report = context.run_round(env).unwrap();
            assert!(gauge_keys_match_roster(&context));
            if report.outcome.is_some() {
                last = Some(report);
                break;
            }
        }

        let last = last.unwrap();
        assert_eq!(last.outcome, Some(CombatOutcome::Victory));
        assert_eq!(context.round(), last.round);
        assert_eq!(context.run_round(env).unwrap_err(), CombatError::AlreadyFinished);
        assert_eq!(context.reward_pool().exp, 200);
        assert!(context.player_damage() >= 60);
    }

    #[test]
    fn admitted_player_joins_next_round_only() {
        let catalog = TestCatalog::default();
        let config = CombatConfig::default();
        let env = CombatEnv::new(&catalog, &config);
        let ogre = template("ogre", ActorStats::new(5_000, 1, 0, 10), false);
        let mut context =
            CombatContext::start(3, 0, hero(1, 10, 40), &[ogre], None, &catalog).unwrap();

        let first = context.run_round(env).unwrap();
        let joined = context.admit_player(hero(2, 10, 40));

        assert_eq!(context.gauge(joined), Some(0));
        assert!(!first.order.contains(&joined));
        assert!(gauge_keys_match_roster(&context));

        let second = context.run_round(env).unwrap();
        assert!(second.order.contains(&joined));
        assert!(second.tallies.iter().any(|t| t.actor == joined && t.acted));
        assert_eq!(context.round(), 3);
    }

    #[test]
    fn fast_actor_banks_bonus_actions() {
        let catalog = TestCatalog::default();
        let config = CombatConfig::default();
        let env = CombatEnv::new(&catalog, &config);
        let ogre = template("ogre", ActorStats::new(5_000, 1, 0, 10), false);
        let mut context =
            CombatContext::start(3, 0, hero(1, 10, 130), &[ogre], None, &catalog).unwrap();
        let leader = ActorId(0);

        context.run_round(env).unwrap();
        assert_eq!(context.gauge(leader), Some(130));

        let report = context.run_round(env).unwrap();
        let turns = report
            .tallies
            .iter()
            .filter(|t| t.actor == leader && t.acted)
            .count();
        assert_eq!(turns, 2);
        assert_eq!(context.gauge(leader), Some(10));
    }

    #[test]
    fn boss_blocks_flee() {
        let catalog = TestCatalog::default();
        let dragon = template("dragon", ActorStats::new(900, 30, 10, 50), true);
        let mut context =
            CombatContext::start(1, 0, hero(1, 10, 40), &[dragon], None, &catalog).unwrap();

        assert_eq!(context.attempt_flee(), FleeOutcome::BossBlocks);
        assert!(!context.is_finished());
    }

    #[test]
    fn overwhelming_speed_escapes_eventually() {
        let catalog = TestCatalog::default();
        let snail = template("snail", ActorStats::new(90, 3, 0, 1), false);
        let mut context =
            CombatContext::start(1, 0, hero(1, 10, 200), &[snail], None, &catalog).unwrap();

        let escaped = (0..50).any(|_| context.attempt_flee() == FleeOutcome::Escaped);

        assert!(escaped);
        assert_eq!(context.outcome(), Some(CombatOutcome::Fled));
    }

    #[test]
    fn summons_receive_fresh_ids_and_gauges() {
        let call = Skill::new(
            "call_pack",
            "Call the Pack",
            vec![SkillEffect::Summon(SummonEffect {
                monster: "pup".into(),
                count: 2,
            })],
        );
        let mut alpha = template("alpha", ActorStats::new(5_000, 1, 0, 500), false);
        alpha.skills = vec!["call_pack".into()];
        let pup = template("pup", ActorStats::new(10, 1, 0, 10), false);
        let catalog = TestCatalog::default()
            .with_skill(call)
            .with_monster(pup)
            .with_monster(alpha.clone());
        let config = CombatConfig::default();
        let env = CombatEnv::new(&catalog, &config);
        let mut context =
            CombatContext::start(9, 0, hero(1, 1, 10), &[alpha], None, &catalog).unwrap();

        context.run_round(env).unwrap();

        assert!(context.roster().monsters().len() >= 3);
        assert!(gauge_keys_match_roster(&context));
        let pups: Vec<u32> = context
            .roster()
            .monsters()
            .iter()
            .filter(|m| m.name == "pup")
            .map(|m| context.gauge(m.id).unwrap())
            .collect();
        assert!(pups.iter().all(|gauge| *gauge == 0));
    }

    #[test]
    fn concurrent_start_detection() {
        let context = CombatContext::new(1, 100_000, None);
        assert!(context.started_within(120_000, 30_000));
        assert!(context.started_within(80_000, 30_000));
        assert!(!context.started_within(140_001, 30_000));
    }
}
