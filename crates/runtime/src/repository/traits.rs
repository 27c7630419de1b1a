//! Repository contracts for saving and loading mutable runtime state.

use chrono::{DateTime, Utc};

use game_core::UserId;

use super::Result;
use super::types::{ActorRecord, EncounterRecord};

/// Repository for persisted characters
///
/// Economy fields only change through [`ActorRepository::transact`], which
/// applies a whole mutation or nothing.
pub trait ActorRepository: Send + Sync {
    /// Load the character of `user`
    fn load(&self, user: UserId) -> Result<Option<ActorRecord>>;

    /// Insert or replace a character
    fn save(&self, record: &ActorRecord) -> Result<()>;

    /// Apply `mutate` to the stored character atomically.
    ///
    /// When `mutate` fails, the stored record is left untouched and the error
    /// is returned. Returns the committed record on success.
    fn transact(
        &self,
        user: UserId,
        mutate: &mut dyn FnMut(&mut ActorRecord) -> Result<()>,
    ) -> Result<ActorRecord>;

    /// Remove `amount` gold, failing with `InsufficientFunds` on overdraft
    fn debit(&self, user: UserId, amount: u64) -> Result<ActorRecord> {
        self.transact(user, &mut |record: &mut ActorRecord| record.debit(amount))
    }

    /// Add exp and gold
    fn credit(&self, user: UserId, exp: u64, gold: u64) -> Result<ActorRecord> {
        self.transact(user, &mut |record: &mut ActorRecord| {
            record.credit(exp, gold);
            Ok(())
        })
    }
}

/// Append-only encounter history
pub trait EncounterLog: Send + Sync {
    fn append(&self, record: &EncounterRecord) -> Result<()>;

    /// Records led by `user`, oldest first
    fn records_for(&self, user: UserId) -> Result<Vec<EncounterRecord>>;

    /// Drop every record whose expiry is at or before `now`.
    ///
    /// Returns how many records were removed.
    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize>;
}
