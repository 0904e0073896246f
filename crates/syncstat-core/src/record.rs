//! File records and their status enums

use std::fmt;
use std::fs::Metadata;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Change classification of a tracked path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileStatus {
    Added,
    Modified,
    NotModified,
    Removed,
}

impl FileStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Added => "ADDED",
            Self::Modified => "MODIFIED",
            Self::NotModified => "NOT_MODIFIED",
            Self::Removed => "REMOVED",
        }
    }

    /// Whether an unsynced record in this status still owes an upload.
    pub fn awaits_upload(self) -> bool {
        matches!(self, Self::Added | Self::Modified)
    }
}

/// Outcome of the last transfer attempt for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    Ok,
    Failed,
}

impl SyncStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Failed => "FAILED",
        }
    }
}

/// Unknown status text read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status value {0:?}")]
pub struct ParseStatusError(pub String);

impl FromStr for FileStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADDED" => Ok(Self::Added),
            "MODIFIED" => Ok(Self::Modified),
            "NOT_MODIFIED" => Ok(Self::NotModified),
            "REMOVED" => Ok(Self::Removed),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

impl FromStr for SyncStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OK" => Ok(Self::Ok),
            "FAILED" => Ok(Self::Failed),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for FileStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for FileStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for SyncStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for SyncStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// One persisted row of the `files` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Surrogate key assigned on first insert
    pub id: i64,
    /// Absolute path, unique
    pub path: String,
    /// Last observed mtime, nanoseconds since the Unix epoch
    pub modified_at: i64,
    /// Seen during the current scan
    pub checked: bool,
    pub status: FileStatus,
    /// The remote reflects the current content version
    pub synced: bool,
    pub synced_at: Option<DateTime<Utc>>,
    pub sync_status: Option<SyncStatus>,
}

/// A path observed for the first time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub path: String,
    pub modified_at: i64,
}

/// Mtime of `meta` as nanoseconds since the Unix epoch.
///
/// Times before the epoch come back negative; values beyond the `i64`
/// range saturate.
pub fn mtime_nanos(meta: &Metadata) -> std::io::Result<i64> {
    Ok(system_time_nanos(meta.modified()?))
}

pub fn system_time_nanos(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_nanos().min(i64::MAX as u128) as i64,
        Err(before) => -(before.duration().as_nanos().min(i64::MAX as u128) as i64),
    }
}
