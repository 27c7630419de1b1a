/// Exp and gold to split among the participants of an encounter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RewardPool {
    pub exp: u64,
    pub gold: u64,
}

/// One participant as seen by the distributor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contributor<K> {
    pub key: K,
    pub level: u32,
    pub score: f64,
    /// The encounter leader is never carry-penalized.
    pub leader: bool,
}

/// Payout for one participant.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RewardShare<K> {
    pub key: K,
    /// Share of the pool before any penalty, 0.0..=1.0.
    pub ratio: f64,
    pub base_exp: u64,
    pub base_gold: u64,
    pub penalty_percent: u32,
    pub exp: u64,
    pub gold: u64,
}

/// Share at or above which a rewarded participant receives at least 1 exp
/// and 1 gold.
const MIN_SHARE_FOR_FLOOR: f64 = 0.05;

/// Reward multiplier (percent) for a participant `delta` levels above the
/// leader. Non-increasing in `delta`.
pub fn carry_penalty_percent(delta: i64) -> u32 {
    match delta {
        d if d < 5 => 100,
        5..=9 => 50,
        10..=14 => 20,
        _ => 0,
    }
}

/// Splits `pool` proportionally to contribution scores.
///
/// With no positive contribution at all the pool is split evenly. Base
/// shares are floored, so they never sum above the pool. Non-leader shares
/// are then scaled by [`carry_penalty_percent`].
pub fn distribute<K: Copy>(
    pool: RewardPool,
    leader_level: u32,
    contributors: &[Contributor<K>],
) -> Vec<RewardShare<K>> {
    if contributors.is_empty() {
        return Vec::new();
    }

    let total: f64 = contributors.iter().map(|c| c.score.max(0.0)).sum();
    let count = contributors.len() as u64;

    contributors
        .iter()
        .map(|contributor| {
            let (ratio, base_exp, base_gold) = if total > 0.0 {
                let score = contributor.score.max(0.0);
                (
                    score / total,
                    proportional(pool.exp, score, total),
                    proportional(pool.gold, score, total),
                )
            } else {
                (1.0 / count as f64, pool.exp / count, pool.gold / count)
            };

            let penalty_percent = if contributor.leader {
                100
            } else {
                carry_penalty_percent(i64::from(contributor.level) - i64::from(leader_level))
            };

            let mut exp = base_exp * u64::from(penalty_percent) / 100;
            let mut gold = base_gold * u64::from(penalty_percent) / 100;
            if penalty_percent > 0 && ratio >= MIN_SHARE_FOR_FLOOR {
                exp = exp.max(1);
                gold = gold.max(1);
            }

            RewardShare {
                key: contributor.key,
                ratio,
                base_exp,
                base_gold,
                penalty_percent,
                exp,
                gold,
            }
        })
        .collect()
}

fn proportional(amount: u64, score: f64, total: f64) -> u64 {
    ((amount as f64 * score) / total).floor() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contributor(key: u32, level: u32, score: f64, leader: bool) -> Contributor<u32> {
        Contributor {
            key,
            level,
            score,
            leader,
        }
    }

    #[test]
    fn proportional_split_by_score() {
        let pool = RewardPool {
            exp: 1000,
            gold: 500,
        };
        let shares = distribute(
            pool,
            10,
            &[contributor(1, 10, 80.0, true), contributor(2, 12, 20.0, false)],
        );

        assert_eq!((shares[0].exp, shares[0].gold), (800, 400));
        assert_eq!((shares[1].exp, shares[1].gold), (200, 100));
    }

    #[test]
    fn zero_total_falls_back_to_equal_split() {
        let pool = RewardPool { exp: 90, gold: 30 };
        let shares = distribute(
            pool,
            5,
            &[
                contributor(1, 5, 0.0, true),
                contributor(2, 5, 0.0, false),
                contributor(3, 5, 0.0, false),
            ],
        );

        assert!(shares.iter().all(|s| s.exp == 30 && s.gold == 10));
    }

    #[test]
    fn base_shares_never_exceed_pool() {
        let pool = RewardPool { exp: 1001, gold: 7 };
        let scores = [13.7, 2.2, 91.0, 0.4];
        let contributors: Vec<_> = scores
            .iter()
            .enumerate()
            .map(|(i, score)| contributor(i as u32, 1, *score, i == 0))
            .collect();

        let shares = distribute(pool, 1, &contributors);

        assert!(shares.iter().map(|s| s.base_exp).sum::<u64>() <= pool.exp);
        assert!(shares.iter().map(|s| s.base_gold).sum::<u64>() <= pool.gold);
    }

    #[test]
    fn fifteen_levels_above_the_leader_earns_nothing() {
        let pool = RewardPool {
            exp: 1000,
            gold: 500,
        };
        let shares = distribute(
            pool,
            10,
            &[contributor(1, 10, 50.0, true), contributor(2, 25, 50.0, false)],
        );

        assert_eq!(shares[1].penalty_percent, 0);
        assert_eq!((shares[1].exp, shares[1].gold), (0, 0));
        assert_eq!(shares[1].base_exp, 500);
    }

    #[test]
    fn penalty_is_monotonic() {
        let mut previous = carry_penalty_percent(0);
        for delta in 1..40 {
            let current = carry_penalty_percent(delta);
            assert!(current <= previous, "delta {delta}");
            previous = current;
        }
        assert_eq!(carry_penalty_percent(-8), 100);
        assert_eq!(carry_penalty_percent(5), 50);
        assert_eq!(carry_penalty_percent(10), 20);
        assert_eq!(carry_penalty_percent(15), 0);
    }

    #[test]
    fn meaningful_share_gets_at_least_one() {
        let pool = RewardPool { exp: 10, gold: 3 };
        let shares = distribute(
            pool,
            1,
            &[contributor(1, 1, 90.0, true), contributor(2, 13, 10.0, false)],
        );

        assert_eq!(shares[1].penalty_percent, 20);
        assert_eq!((shares[1].exp, shares[1].gold), (1, 1));
    }
}
