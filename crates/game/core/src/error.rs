//! Common error infrastructure for game-core.
//!
//! Combat resolution reports unexpected conditions through [`CombatError`].
//! Validation of player requests happens outside this crate and uses explicit
//! result types instead, so every `CombatError` reaching the caller indicates a
//! state inconsistency the caller must tear down.

use crate::state::ActorId;

/// Severity level of an error, used for categorization and recovery strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Temporary condition, the same request may succeed later.
    Recoverable,

    /// Invalid input, should not retry without changes.
    Validation,

    /// Unexpected state inconsistency. Indicates a bug.
    Internal,

    /// Combat state corrupted, cannot continue.
    Fatal,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    /// Returns true if this error indicates an internal bug.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Where in an encounter an error was raised.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ErrorContext {
    pub round: u32,
    pub actor: Option<ActorId>,
}

impl ErrorContext {
    #[must_use]
    pub const fn new(round: u32) -> Self {
        Self { round, actor: None }
    }

    #[must_use]
    pub const fn with_actor(mut self, actor: ActorId) -> Self {
        self.actor = Some(actor);
        self
    }
}

/// Common trait for all game-core errors.
pub trait GameError: core::fmt::Display + core::fmt::Debug {
    fn severity(&self) -> ErrorSeverity;

    fn context(&self) -> Option<&ErrorContext> {
        None
    }

    /// Static identifier for the error variant, used in logs.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

/// Failures raised while resolving a combat round.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CombatError {
    #[error("actor {actor} is not part of this encounter (round {})", .context.round)]
    ActorMissing {
        actor: ActorId,
        context: ErrorContext,
    },

    #[error("skill `{0}` is not in the catalog")]
    SkillMissing(String),

    #[error("monster template `{0}` is not in the catalog")]
    MonsterMissing(String),

    #[error("encounter already finished")]
    AlreadyFinished,
}

impl CombatError {
    pub fn actor_missing(actor: ActorId, round: u32) -> Self {
        Self::ActorMissing {
            actor,
            context: ErrorContext::new(round).with_actor(actor),
        }
    }
}

impl GameError for CombatError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ActorMissing { .. } => ErrorSeverity::Internal,
            Self::SkillMissing(_) | Self::MonsterMissing(_) => ErrorSeverity::Fatal,
            Self::AlreadyFinished => ErrorSeverity::Validation,
        }
    }

    fn context(&self) -> Option<&ErrorContext> {
        match self {
            Self::ActorMissing { context, .. } => Some(context),
            _ => None,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::ActorMissing { .. } => "COMBAT_ACTOR_MISSING",
            Self::SkillMissing(_) => "COMBAT_SKILL_MISSING",
            Self::MonsterMissing(_) => "COMBAT_MONSTER_MISSING",
            Self::AlreadyFinished => "COMBAT_ALREADY_FINISHED",
        }
    }
}
