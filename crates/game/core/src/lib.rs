//! Deterministic combat rules shared by the runtime and offline tools.
//!
//! `game-core` defines encounters (actors, skills, statuses, rounds),
//! contribution-weighted rewards, and proximity pricing. It performs no I/O
//! and never blocks; the runtime crate drives it from async session workers.
pub mod combat;
pub mod config;
pub mod env;
pub mod error;
pub mod proximity;
pub mod reward;
pub mod skill;
pub mod state;

pub use combat::{
    CombatContext, CombatOutcome, FleeOutcome, Roster, RoundReport, StatusEffectEngine,
    first_strike_percent,
};
pub use config::CombatConfig;
pub use env::{
    CatalogOracle, CombatEnv, Dice, DungeonDefinition, FieldEffect, MonsterTemplate, PcgRng,
    RngOracle, compute_seed,
};
pub use error::{CombatError, ErrorContext, ErrorSeverity, GameError};
pub use proximity::{ProximityTier, distance};
pub use reward::{
    ContributionTracker, Contributor, RewardPool, RewardShare, carry_penalty_percent, distribute,
};
pub use skill::{EffectLine, HookPoint, Skill, SkillEffect, SkillEffectResolver};
pub use state::{
    Actor, ActorId, ActorKind, ActorStats, ChannelId, PlayerProfile, Side, StatusEffect,
    StatusEffects, StatusKind, UserId,
};
