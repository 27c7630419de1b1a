//! Contribution scoring and reward splitting.
//!
//! Every resolved action feeds a [`ContributionTracker`]. When an encounter
//! ends, [`distribute`] turns the scores into exp and gold shares, scaling
//! down participants that out-level the leader.
mod contribution;
mod distribution;

pub use contribution::ContributionTracker;
pub use distribution::{Contributor, RewardPool, RewardShare, carry_penalty_percent, distribute};
