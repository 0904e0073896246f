use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rusqlite::{Transaction, params, params_from_iter};

use super::{map_store_error, read_record, schema};
use crate::Result;
use crate::record::{FileRecord, FileStatus, NewRecord};

/// Upper bound on bound parameters per statement; bundled SQLite allows
/// 32766.
const MAX_PARAMS: usize = 10_000;

/// How an already-known record is rewritten when it is seen again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    /// New content version: store the mtime, status `MODIFIED`, clear `synced`.
    Modified,
    /// Path reappeared after removal: store the mtime, status `ADDED`, clear `synced`.
    Readded,
    /// Status becomes `NOT_MODIFIED`.
    NotModified,
    /// Status and content are kept; only the checked flag is set.
    Unchanged,
}

/// A row to rewrite; `modified_at` is only stored by the mtime-carrying kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordUpdate {
    pub id: i64,
    pub modified_at: i64,
}

/// What the end-of-scan sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Records that transitioned to `REMOVED` in this sweep
    pub newly_removed: usize,
    /// Records that were already `REMOVED` and stayed unseen
    pub still_removed: usize,
}

/// The one transaction a scan writes through.
///
/// Dropping it without calling [`commit`](Self::commit) rolls every
/// batch back.
pub struct ScanTransaction<'conn> {
    tx: Transaction<'conn>,
    path: PathBuf,
}

impl<'conn> ScanTransaction<'conn> {
    pub(super) fn new(tx: Transaction<'conn>, path: PathBuf) -> Self {
        Self { tx, path }
    }

    /// Clear the checked flag on every record. Returns the number reset.
    pub fn reset_checked_flags(&self) -> Result<usize> {
        self.tx
            .execute("UPDATE files SET checked = 0 WHERE checked != 0", [])
            .map_err(|e| self.map_error(e))
    }

    /// Fetch the existing records for `paths`, keyed by path.
    pub fn lookup_batch(&self, paths: &[String]) -> Result<HashMap<String, FileRecord>> {
        let mut found = HashMap::with_capacity(paths.len());
        for chunk in paths.chunks(MAX_PARAMS) {
            let sql = format!(
                "SELECT {} FROM files WHERE file IN ({})",
                schema::RECORD_COLUMNS,
                placeholders(chunk.len())
            );
            let mut stmt = self.tx.prepare(&sql).map_err(|e| self.map_error(e))?;
            let rows = stmt
                .query_map(params_from_iter(chunk.iter()), read_record)
                .map_err(|e| self.map_error(e))?;
            for row in rows {
                let record = row.map_err(|e| self.map_error(e))?;
                found.insert(record.path.clone(), record);
            }
        }
        Ok(found)
    }

    /// Insert first-seen paths as checked, unsynced `ADDED` records.
    pub fn insert_batch(&self, records: &[NewRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let mut stmt = self
            .tx
            .prepare_cached(
                "INSERT INTO files (file, modified_at, checked, file_status, synced)
                 VALUES (?1, ?2, 1, ?3, 0)",
            )
            .map_err(|e| self.map_error(e))?;
        let mut inserted = 0;
        for record in records {
            inserted += stmt
                .execute(params![record.path, record.modified_at, FileStatus::Added])
                .map_err(|e| self.map_error(e))?;
        }
        Ok(inserted)
    }

    /// Apply one transition group. Every touched row ends up checked.
    pub fn update_batch(&self, kind: UpdateKind, updates: &[RecordUpdate]) -> Result<usize> {
        if updates.is_empty() {
            return Ok(0);
        }
        match kind {
            UpdateKind::Modified => self.update_content(FileStatus::Modified, updates),
            UpdateKind::Readded => self.update_content(FileStatus::Added, updates),
            UpdateKind::NotModified => self.update_ids(
                "UPDATE files SET checked = 1, file_status = ?1 WHERE id IN",
                Some(FileStatus::NotModified),
                updates,
            ),
            UpdateKind::Unchanged => {
                self.update_ids("UPDATE files SET checked = 1 WHERE id IN", None, updates)
            }
        }
    }

    /// Mark every record still unchecked as `REMOVED`.
    ///
    /// A record entering `REMOVED` owes a remote delete (`synced = 0`)
    /// unless it is an unsynced `ADDED` record with no remote copy: a new
    /// file that never got uploaded. A re-added path whose old object was
    /// never deleted still owes the delete. Records already `REMOVED` keep
    /// their delete bookkeeping.
    pub fn sweep_unchecked(&self) -> Result<SweepSummary> {
        let newly_removed: i64 = self
            .tx
            .query_row(
                "SELECT COUNT(*) FROM files WHERE checked = 0 AND file_status != ?1",
                params![FileStatus::Removed],
                |row| row.get(0),
            )
            .map_err(|e| self.map_error(e))?;
        let swept = self
            .tx
            .execute(
                "UPDATE files SET
                    checked = 1,
                    synced = CASE
                        WHEN file_status = ?1 THEN synced
                        WHEN file_status = ?2 AND synced = 0 AND remote_copy = 0 THEN 1
                        ELSE 0
                    END,
                    file_status = ?1
                 WHERE checked = 0",
                params![FileStatus::Removed, FileStatus::Added],
            )
            .map_err(|e| self.map_error(e))?;
        let newly_removed = newly_removed as usize;
        Ok(SweepSummary {
            newly_removed,
            still_removed: swept - newly_removed,
        })
    }

    /// Make the scan durable.
    pub fn commit(self) -> Result<()> {
        let path = self.path;
        self.tx.commit().map_err(|e| map_store_error(&path, e))
    }

    fn update_content(&self, status: FileStatus, updates: &[RecordUpdate]) -> Result<usize> {
        let mut stmt = self
            .tx
            .prepare_cached(
                "UPDATE files SET modified_at = ?1, checked = 1, file_status = ?2, synced = 0
                 WHERE id = ?3",
            )
            .map_err(|e| self.map_error(e))?;
        let mut changed = 0;
        for update in updates {
            changed += stmt
                .execute(params![update.modified_at, status, update.id])
                .map_err(|e| self.map_error(e))?;
        }
        Ok(changed)
    }

    fn update_ids(
        &self,
        statement: &str,
        status: Option<FileStatus>,
        updates: &[RecordUpdate],
    ) -> Result<usize> {
        let offset = usize::from(status.is_some());
        let mut changed = 0;
        for chunk in updates.chunks(MAX_PARAMS - offset) {
            let sql = format!(
                "{statement} ({})",
                numbered_placeholders(offset + 1, chunk.len())
            );
            let mut values: Vec<rusqlite::types::Value> = Vec::with_capacity(chunk.len() + offset);
            if let Some(status) = status {
                values.push(status.as_str().to_string().into());
            }
            values.extend(chunk.iter().map(|u| u.id.into()));
            changed += self
                .tx
                .execute(&sql, params_from_iter(values))
                .map_err(|e| self.map_error(e))?;
        }
        Ok(changed)
    }

    fn map_error(&self, err: rusqlite::Error) -> crate::Error {
        map_store_error(&self.path, err)
    }

    /// Location of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn placeholders(count: usize) -> String {
    numbered_placeholders(1, count)
}

fn numbered_placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|n| format!("?{n}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_placeholders_start_at_offset() {
        assert_eq!(numbered_placeholders(2, 3), "?2, ?3, ?4");
        assert_eq!(placeholders(1), "?1");
    }
}
