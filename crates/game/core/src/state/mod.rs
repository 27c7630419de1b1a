//! Combat state representation.
//!
//! Identifiers, actors, and status stacks. Rounds mutate these exclusively
//! through [`CombatContext`](crate::combat::CombatContext).
mod actor;
mod common;
mod status;

pub use actor::{Actor, ActorKind, ActorStats, PlayerProfile, StatBonus};
pub use common::{ActorId, ChannelId, Side, UserId};
pub use status::{StatusEffect, StatusEffects, StatusKind};
