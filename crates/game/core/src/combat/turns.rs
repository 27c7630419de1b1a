//! Phase ordering for a combat round.
//!
//! Actors are inserted one at a time into the order. Each insertion walks the
//! current order from the front and compares the newcomer against the actor
//! at that slot with a single d100 draw: the newcomer goes first when the
//! roll lands within its first-strike percent.

use crate::combat::Roster;
use crate::config::CombatConfig;
use crate::env::Dice;
use crate::state::ActorId;

/// Percent chance that an actor with `speed_a` acts before one with `speed_b`.
///
/// `50 + clamp(speed_a - speed_b, -50, 50)`.
pub fn first_strike_percent(speed_a: u32, speed_b: u32) -> u32 {
    let advantage = (i64::from(speed_a) - i64::from(speed_b)).clamp(
        -CombatConfig::MAX_SPEED_ADVANTAGE,
        CombatConfig::MAX_SPEED_ADVANTAGE,
    );
    (50 + advantage) as u32
}

/// Builds this round's phase order over living actors.
pub fn phase_order(roster: &Roster, dice: &mut Dice) -> Vec<ActorId> {
    let mut order: Vec<(ActorId, u32)> = Vec::new();

    for actor in roster.iter().filter(|actor| actor.is_alive()) {
        let speed = actor.stats.speed;
        let slot = order
            .iter()
            .position(|&(_, placed)| dice.chance(first_strike_percent(speed, placed)))
            .unwrap_or(order.len());
        order.insert(slot, (actor.id, speed));
    }

    order.into_iter().map(|(id, _)| id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Actor, ActorKind, ActorStats, UserId};

    fn roster_with_speeds(speeds: &[u32]) -> Roster {
        let mut roster = Roster::new();
        for (index, speed) in speeds.iter().enumerate() {
            let id = roster.allocate_id();
            roster.insert(Actor::new(
                id,
                format!("p{index}"),
                ActorKind::Player {
                    user: UserId(index as u64),
                    level: 1,
                },
                ActorStats::new(10, 1, 0, *speed),
            ));
        }
        roster
    }

    #[test]
    fn advantage_is_clamped() {
        assert_eq!(first_strike_percent(80, 50), 80);
        assert_eq!(first_strike_percent(50, 80), 20);
        assert_eq!(first_strike_percent(200, 10), 100);
        assert_eq!(first_strike_percent(10, 200), 0);
        assert_eq!(first_strike_percent(40, 40), 50);
    }

    #[test]
    fn faster_actor_leads_about_eighty_percent_of_rounds() {
        let roster = roster_with_speeds(&[80, 50]);
        let mut dice = Dice::new(2024);
        let trials = 5_000;

        let fast_first = (0..trials)
            .filter(|_| phase_order(&roster, &mut dice)[0] == ActorId(0))
            .count();

        let ratio = fast_first as f64 / trials as f64;
        assert!((0.75..=0.85).contains(&ratio), "ratio was {ratio}");
    }

    #[test]
    fn overwhelming_speed_always_leads() {
        let roster = roster_with_speeds(&[10, 200]);
        let mut dice = Dice::new(5);
        for _ in 0..100 {
            assert_eq!(phase_order(&roster, &mut dice)[0], ActorId(1));
        }
    }

    #[test]
    fn order_covers_each_living_actor_once() {
        let mut roster = roster_with_speeds(&[30, 60, 90, 45]);
        roster.actor_mut(ActorId(2)).unwrap().hp = 0;
        let mut dice = Dice::new(11);

        let mut order = phase_order(&roster, &mut dice);
        order.sort();

        assert_eq!(order, vec![ActorId(0), ActorId(1), ActorId(3)]);
    }
}
