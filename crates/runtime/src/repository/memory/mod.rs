//! In-memory repositories used by tests and the local simulator.

mod actor;
mod encounter;

pub use actor::InMemoryActorRepo;
pub use encounter::InMemoryEncounterLog;
