//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from session bookkeeping, repositories, and combat
//! resolution so clients can bubble them up with consistent context.
use thiserror::Error;

use game_core::{CombatError, UserId};

use crate::intervention::AdmissionRejection;
use crate::session::SessionStatus;

pub use crate::repository::RepositoryError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Rejections raised while creating or driving a dungeon session.
///
/// None of these leave a partial mutation behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session of {0} has already ended")]
    Ended(UserId),

    #[error("{0} already has an active session")]
    AlreadyActive(UserId),

    #[error("{0} has no active session")]
    NotFound(UserId),

    #[error("{0} has no stored character")]
    ActorNotFound(UserId),

    #[error("dungeon `{0}` is not in the catalog")]
    UnknownDungeon(String),

    #[error("dungeon requires level {required}, character is level {actual}")]
    LevelTooLow { required: u32, actual: u32 },

    #[error("session is already in combat")]
    AlreadyInCombat,

    #[error("session is not in combat")]
    NotInCombat,

    #[error("session is busy ({status})")]
    NotIdle { status: SessionStatus },
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime requires a catalog to be configured before building")]
    MissingCatalog,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Admission(#[from] AdmissionRejection),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Combat(#[from] CombatError),

    #[error("session worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),
}
