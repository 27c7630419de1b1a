//! Repository layer for dynamic runtime data
//!
//! Repositories handle data that CHANGES during gameplay:
//! - Characters (hp, exp, gold, intervention cooldown)
//! - Encounter history
//!
//! Static game content (skills, monsters, dungeons) is handled by the
//! catalog oracle, not Repositories.

mod error;
mod file;
mod memory;
mod traits;
mod types;

pub use error::{RepositoryError, Result};
pub use file::FileEncounterLog;
pub use memory::{InMemoryActorRepo, InMemoryEncounterLog};
pub use traits::{ActorRepository, EncounterLog};
pub use types::{ActorRecord, ENCOUNTER_RETENTION_DAYS, EncounterRecord};
