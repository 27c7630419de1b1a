//! Event types for different topics.

use serde::{Deserialize, Serialize};

use game_core::{ActorId, CombatOutcome, ProximityTier, RewardShare, RoundReport, UserId};

use crate::reward::PayoutFailure;
use crate::session::{ContentMode, EndReason};

/// Session lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    Started {
        user: UserId,
        dungeon: String,
        mode: ContentMode,
    },
    /// The session moved one step deeper.
    StepAdvanced { user: UserId, step: u32 },
    Rested { user: UserId, healed: u32 },
    /// A stop was requested mid-event and will be honoured afterwards.
    StopDeferred { user: UserId },
    Ended { user: UserId, reason: EndReason },
}

/// Encounter events, keyed by the encounter leader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CombatEvent {
    EncounterStarted {
        leader: UserId,
        monsters: Vec<String>,
        created_at: u64,
    },
    RoundResolved { leader: UserId, report: RoundReport },
    FleeAttempted { leader: UserId, escaped: bool },
    EncounterEnded {
        leader: UserId,
        outcome: CombatOutcome,
        rounds: u32,
    },
    RewardsPaid {
        leader: UserId,
        shares: Vec<RewardShare<UserId>>,
        failures: Vec<PayoutFailure>,
    },
}

/// Mid-combat admission events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AdmissionEvent {
    /// Accepted request waiting for the next round boundary. External
    /// notifiers should tell the leader after `notify_after_secs`.
    Requested {
        requester: UserId,
        target: UserId,
        tier: ProximityTier,
        notify_after_secs: u64,
    },
    Committed {
        requester: UserId,
        target: UserId,
        actor: ActorId,
        cost: u64,
    },
    /// The request could not be committed; nothing was charged.
    Dropped {
        requester: UserId,
        target: UserId,
        reason: String,
    },
}
