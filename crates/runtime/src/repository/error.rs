//! Error types raised by repository implementations.

use thiserror::Error;

use game_core::UserId;

/// Errors surfaced by repository implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("repository lock was poisoned")]
    LockPoisoned,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("corrupted data: {0}")]
    CorruptedData(String),

    #[error("no stored character for {0}")]
    ActorNotFound(UserId),

    #[error("{user} needs {required} gold but has {available}")]
    InsufficientFunds {
        user: UserId,
        required: u64,
        available: u64,
    },
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
