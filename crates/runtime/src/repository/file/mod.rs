//! File-backed repositories.

mod encounter;
mod log;

pub use encounter::FileEncounterLog;
