//! File-backed encounter history.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use game_core::UserId;

use super::log::{read_all, write_frame};
use crate::repository::{EncounterLog, EncounterRecord, RepositoryError, Result};

/// Encounter history stored as one length-prefixed bincode log.
///
/// Appends go through a buffered writer that is flushed after every record.
/// Purging rewrites the surviving records into a sibling file and swaps it
/// in.
pub struct FileEncounterLog {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileEncounterLog {
    pub const DEFAULT_FILENAME: &'static str = "encounters.log";

    /// Open or create the log.
    ///
    /// Creates the directory and file if they don't exist, or opens the
    /// existing file for appending.
    pub fn open_or_create(base_dir: impl AsRef<Path>, filename: impl AsRef<str>) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        fs::create_dir_all(base_dir)?;

        let path = base_dir.join(filename.as_ref());
        let writer = BufWriter::new(open_append(&path)?);

        tracing::debug!("Opened encounter log: {}", path.display());

        Ok(Self {
            path,
            writer: Mutex::new(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn all(&self) -> Result<Vec<EncounterRecord>> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        writer.flush()?;
        drop(writer);
        read_all(&self.path)
    }
}

impl EncounterLog for FileEncounterLog {
    fn append(&self, record: &EncounterRecord) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        write_frame(&mut *writer, record)?;
        writer.flush()?;
        Ok(())
    }

    fn records_for(&self, user: UserId) -> Result<Vec<EncounterRecord>> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|record| record.actor == user)
            .collect())
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        writer.flush()?;

        let records: Vec<EncounterRecord> = read_all(&self.path)?;
        let before = records.len();
        let survivors: Vec<EncounterRecord> = records
            .into_iter()
            .filter(|record| !record.is_expired(now))
            .collect();
        let purged = before - survivors.len();
        if purged == 0 {
            return Ok(0);
        }

        let staging = self.path.with_extension("purge");
        {
            let mut out = BufWriter::new(File::create(&staging)?);
            for record in &survivors {
                write_frame(&mut out, record)?;
            }
            out.flush()?;
        }
        fs::rename(&staging, &self.path)?;
        *writer = BufWriter::new(open_append(&self.path)?);

        tracing::debug!(purged, kept = survivors.len(), "Purged encounter log");
        Ok(purged)
    }
}

fn open_append(path: &Path) -> Result<File> {
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}
