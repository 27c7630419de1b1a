use std::collections::BTreeMap;

const DAMAGE_WEIGHT: f64 = 1.0;
const HEALING_WEIGHT: f64 = 0.8;
const ACTION_BONUS: f64 = 2.0;

/// Running contribution score per participant of one encounter.
///
/// Scores only grow, in the order actions resolve. The accumulated scores
/// are handed out exactly once through [`ContributionTracker::take`].
#[derive(Clone, Debug, PartialEq)]
pub struct ContributionTracker<K: Ord + Copy> {
    scores: BTreeMap<K, f64>,
    taken: bool,
}

impl<K: Ord + Copy> Default for ContributionTracker<K> {
    fn default() -> Self {
        Self {
            scores: BTreeMap::new(),
            taken: false,
        }
    }
}

impl<K: Ord + Copy> ContributionTracker<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a participant with a zero score if it is not tracked yet.
    pub fn enroll(&mut self, key: K) {
        self.scores.entry(key).or_insert(0.0);
    }

    /// Scores one resolved action of `key`.
    pub fn record(&mut self, key: K, damage: u32, healing: u32) {
        *self.scores.entry(key).or_insert(0.0) += weigh(damage, healing) + ACTION_BONUS;
    }

    /// Scores damage or healing produced outside the participant's own turn.
    pub fn record_assist(&mut self, key: K, damage: u32, healing: u32) {
        *self.scores.entry(key).or_insert(0.0) += weigh(damage, healing);
    }

    pub fn score(&self, key: K) -> f64 {
        self.scores.get(&key).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.scores.values().sum()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn is_taken(&self) -> bool {
        self.taken
    }

    /// Hands out the accumulated scores. Every later call returns nothing.
    pub fn take(&mut self) -> BTreeMap<K, f64> {
        if self.taken {
            return BTreeMap::new();
        }
        self.taken = true;
        std::mem::take(&mut self.scores)
    }
}

fn weigh(damage: u32, healing: u32) -> f64 {
    f64::from(damage) * DAMAGE_WEIGHT + f64::from(healing) * HEALING_WEIGHT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_weighs_damage_healing_and_participation() {
        let mut tracker = ContributionTracker::new();
        tracker.record(1u32, 30, 10);
        tracker.record(1u32, 0, 0);
        tracker.record_assist(1u32, 5, 0);

        assert!((tracker.score(1) - (30.0 + 8.0 + 2.0 + 2.0 + 5.0)).abs() < 1e-9);
    }

    #[test]
    fn take_hands_out_scores_once() {
        let mut tracker = ContributionTracker::new();
        tracker.enroll(7u32);
        tracker.record(3u32, 10, 0);

        let scores = tracker.take();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[&7], 0.0);

        assert!(tracker.take().is_empty());
        assert!(tracker.is_taken());
    }
}
