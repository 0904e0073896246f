//! Persistent file-record store backed by SQLite
//!
//! One row per path ever observed. Everything a scan writes goes through
//! a [`ScanTransaction`], so an aborted scan leaves the table exactly as
//! the previous run committed it. Sync bookkeeping after the scan is
//! written row by row through [`FileStore`] directly.

mod scan;
mod schema;

pub use scan::{RecordUpdate, ScanTransaction, SweepSummary, UpdateKind};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};

use crate::record::{FileRecord, FileStatus, SyncStatus};
use crate::{Error, Result};

/// SQLite wrapper that owns the `files` table.
pub struct FileStore {
    connection: Connection,
    path: PathBuf,
}

impl FileStore {
    /// Open (or create) the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] when the file cannot be opened or the
    /// schema cannot be applied.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }
        let connection = Connection::open(path)?;
        Self::init(connection, path.to_path_buf())
    }

    /// Open a private in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        let connection = Connection::open_in_memory()?;
        Self::init(connection, PathBuf::from(":memory:"))
    }

    fn init(connection: Connection, path: PathBuf) -> Result<Self> {
        let store = Self { connection, path };
        schema::apply_pragmas(&store.connection).map_err(|e| store.map_error(e))?;
        schema::apply_schema(&store.connection).map_err(|e| store.map_error(e))?;
        Ok(store)
    }

    /// Location of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start the single transaction that covers one scan.
    ///
    /// Nothing written through the returned handle is visible to a later
    /// run until [`ScanTransaction::commit`] succeeds.
    pub fn begin_scan(&mut self) -> Result<ScanTransaction<'_>> {
        let path = self.path.clone();
        let tx = self
            .connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| map_store_error(&path, e))?;
        Ok(ScanTransaction::new(tx, path))
    }

    /// Fetch the record for one path.
    pub fn get(&self, path: &str) -> Result<Option<FileRecord>> {
        let sql = format!(
            "SELECT {} FROM files WHERE file = ?1",
            schema::RECORD_COLUMNS
        );
        self.connection
            .prepare_cached(&sql)?
            .query_row(params![path], read_record)
            .optional()
            .map_err(|e| self.map_error(e))
    }

    /// Unsynced `ADDED`/`MODIFIED` records with `id > after_id`, in id order.
    pub fn pending_uploads(&self, after_id: i64, limit: usize) -> Result<Vec<FileRecord>> {
        let sql = format!(
            "SELECT {} FROM files
             WHERE synced = 0 AND file_status IN (?1, ?2) AND id > ?3
             ORDER BY id LIMIT ?4",
            schema::RECORD_COLUMNS
        );
        let mut stmt = self.connection.prepare_cached(&sql)?;
        let rows = stmt
            .query_map(
                params![
                    FileStatus::Added,
                    FileStatus::Modified,
                    after_id,
                    limit as i64
                ],
                read_record,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| self.map_error(e))?;
        Ok(rows)
    }

    /// `REMOVED` records whose deletion has not reached the remote yet.
    pub fn pending_deletes(&self, after_id: i64, limit: usize) -> Result<Vec<FileRecord>> {
        let sql = format!(
            "SELECT {} FROM files
             WHERE synced = 0 AND file_status = ?1 AND id > ?2
             ORDER BY id LIMIT ?3",
            schema::RECORD_COLUMNS
        );
        let mut stmt = self.connection.prepare_cached(&sql)?;
        let rows = stmt
            .query_map(
                params![FileStatus::Removed, after_id, limit as i64],
                read_record,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| self.map_error(e))?;
        Ok(rows)
    }

    /// Record the outcome of a put or delete for `path`.
    ///
    /// A successful transfer marks the record synced; a failure clears the
    /// flag so the next run picks the path up again. A successful put
    /// leaves a remote copy behind and a successful delete removes it.
    /// Returns whether a record matched.
    pub fn record_sync(&self, path: &str, status: SyncStatus, at: DateTime<Utc>) -> Result<bool> {
        let changed = self
            .connection
            .prepare_cached(
                "UPDATE files SET synced = ?1, synced_at = ?2, sync_status = ?3,
                    remote_copy = CASE WHEN ?1 THEN file_status != ?5 ELSE remote_copy END
                 WHERE file = ?4",
            )?
            .execute(params![
                status == SyncStatus::Ok,
                at.timestamp_millis(),
                status,
                path,
                FileStatus::Removed
            ])
            .map_err(|e| self.map_error(e))?;
        Ok(changed > 0)
    }

    /// Number of records currently in `status`.
    pub fn count(&self, status: FileStatus) -> Result<usize> {
        let count: i64 = self
            .connection
            .prepare_cached("SELECT COUNT(*) FROM files WHERE file_status = ?1")?
            .query_row(params![status], |row| row.get(0))
            .map_err(|e| self.map_error(e))?;
        Ok(count as usize)
    }

    /// Record count per status. Statuses with no records are absent.
    pub fn status_counts(&self) -> Result<HashMap<FileStatus, usize>> {
        let mut stmt = self
            .connection
            .prepare_cached("SELECT file_status, COUNT(*) FROM files GROUP BY file_status")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, FileStatus>(0)?, row.get::<_, i64>(1)? as usize))
            })?
            .collect::<rusqlite::Result<HashMap<_, _>>>()
            .map_err(|e| self.map_error(e))?;
        Ok(rows)
    }

    /// Total number of records.
    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .connection
            .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))
            .map_err(|e| self.map_error(e))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn map_error(&self, err: rusqlite::Error) -> Error {
        map_store_error(&self.path, err)
    }
}

/// Translate rusqlite errors, singling out lock contention.
pub(crate) fn map_store_error(path: &Path, err: rusqlite::Error) -> Error {
    match err {
        rusqlite::Error::SqliteFailure(sql_err, _)
            if sql_err.code == rusqlite::ErrorCode::DatabaseBusy =>
        {
            Error::StoreBusy {
                path: path.to_path_buf(),
            }
        }
        other => Error::Store(other),
    }
}

pub(crate) fn read_record(row: &Row<'_>) -> rusqlite::Result<FileRecord> {
    let synced_at: Option<i64> = row.get(6)?;
    Ok(FileRecord {
        id: row.get(0)?,
        path: row.get(1)?,
        modified_at: row.get(2)?,
        checked: row.get(3)?,
        status: row.get(4)?,
        synced: row.get(5)?,
        synced_at: synced_at.and_then(DateTime::from_timestamp_millis),
        sync_status: row.get(7)?,
    })
}
