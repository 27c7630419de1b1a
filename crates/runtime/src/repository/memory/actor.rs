//! In-memory ActorRepository implementation for tests and local runs.

use std::collections::HashMap;
use std::sync::RwLock;

use game_core::UserId;

use crate::repository::{ActorRecord, ActorRepository, RepositoryError, Result};

/// In-memory implementation of ActorRepository.
///
/// `transact` works on a copy under the write lock and only stores it back
/// when the mutation succeeds.
pub struct InMemoryActorRepo {
    records: RwLock<HashMap<UserId, ActorRecord>>,
}

impl InMemoryActorRepo {
    /// Create a new empty in-memory repository.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Create with a set of characters already stored.
    pub fn with_records(records: impl IntoIterator<Item = ActorRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.user, record))
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }
}

impl Default for InMemoryActorRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl ActorRepository for InMemoryActorRepo {
    fn load(&self, user: UserId) -> Result<Option<ActorRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(records.get(&user).cloned())
    }

    fn save(&self, record: &ActorRecord) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        records.insert(record.user, record.clone());
        Ok(())
    }

    fn transact(
        &self,
        user: UserId,
        mutate: &mut dyn FnMut(&mut ActorRecord) -> Result<()>,
    ) -> Result<ActorRecord> {
        let mut records = self
            .records
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        let stored = records
            .get_mut(&user)
            .ok_or(RepositoryError::ActorNotFound(user))?;

        let mut draft = stored.clone();
        mutate(&mut draft)?;
        *stored = draft.clone();
        Ok(draft)
    }
}
