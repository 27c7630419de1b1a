//! Distance between exploration positions inside a shared instance.
//!
//! Position is the exploration step counter of each session. The tier of two
//! positions prices an admission and paces its notification.

/// Coarse distance classification.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display, strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum ProximityTier {
    Immediate,
    Nearby,
    Far,
}

impl ProximityTier {
    pub const IMMEDIATE_MAX: u32 = 3;
    pub const NEARBY_MAX: u32 = 10;

    pub const fn classify(distance: u32) -> Self {
        if distance <= Self::IMMEDIATE_MAX {
            Self::Immediate
        } else if distance <= Self::NEARBY_MAX {
            Self::Nearby
        } else {
            Self::Far
        }
    }

    /// Gold charged to join an encounter at this distance.
    pub const fn admission_cost(self) -> u64 {
        match self {
            Self::Immediate => 0,
            Self::Nearby => 100,
            Self::Far => 300,
        }
    }

    /// Seconds before the encounter leader is told about the newcomer.
    pub const fn notification_delay_secs(self) -> u64 {
        match self {
            Self::Immediate => 0,
            Self::Nearby => 3,
            Self::Far => 10,
        }
    }

    /// Reward multiplier offered to external bonus collaborators.
    pub const fn reward_bonus_percent(self) -> u32 {
        match self {
            Self::Immediate => 110,
            Self::Nearby => 105,
            Self::Far => 100,
        }
    }
}

/// `|a - b|` in exploration steps.
pub const fn distance(step_a: u32, step_b: u32) -> u32 {
    step_a.abs_diff(step_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_symmetric() {
        assert_eq!(distance(2, 9), 7);
        assert_eq!(distance(9, 2), 7);
        assert_eq!(distance(4, 4), 0);
    }

    #[test]
    fn tier_thresholds() {
        assert_eq!(ProximityTier::classify(0), ProximityTier::Immediate);
        assert_eq!(ProximityTier::classify(3), ProximityTier::Immediate);
        assert_eq!(ProximityTier::classify(4), ProximityTier::Nearby);
        assert_eq!(ProximityTier::classify(10), ProximityTier::Nearby);
        assert_eq!(ProximityTier::classify(11), ProximityTier::Far);
    }

    #[test]
    fn farther_is_never_cheaper() {
        let tiers = [
            ProximityTier::Immediate,
            ProximityTier::Nearby,
            ProximityTier::Far,
        ];
        for pair in tiers.windows(2) {
            assert!(pair[0].admission_cost() <= pair[1].admission_cost());
            assert!(pair[0].notification_delay_secs() <= pair[1].notification_delay_secs());
            assert!(pair[0].reward_bonus_percent() >= pair[1].reward_bonus_percent());
        }
    }
}
