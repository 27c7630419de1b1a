//! In-memory encounter history.

use std::sync::RwLock;

use chrono::{DateTime, Utc};

use game_core::UserId;

use crate::repository::{EncounterLog, EncounterRecord, RepositoryError, Result};

#[derive(Default)]
pub struct InMemoryEncounterLog {
    records: RwLock<Vec<EncounterRecord>>,
}

impl InMemoryEncounterLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EncounterLog for InMemoryEncounterLog {
    fn append(&self, record: &EncounterRecord) -> Result<()> {
        self.records
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?
            .push(record.clone());
        Ok(())
    }

    fn records_for(&self, user: UserId) -> Result<Vec<EncounterRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(records
            .iter()
            .filter(|record| record.actor == user)
            .cloned()
            .collect())
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut records = self
            .records
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        let before = records.len();
        records.retain(|record| !record.is_expired(now));
        Ok(before - records.len())
    }
}
