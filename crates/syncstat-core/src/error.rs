//! Error types for syncstat-core
//!
//! Only run-level failures live here. Per-file problems (a path that
//! cannot be stat'ed, a transfer that exits non-zero) are counted in
//! [`RunStats`](crate::RunStats) and never surface as an `Error`.

use std::path::PathBuf;

/// Result type for syncstat-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in syncstat-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Persistence failure; the scan is aborted without committing
    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// Another connection holds the database
    #[error("Store is busy at {path}")]
    StoreBusy { path: PathBuf },

    /// The scan root could not be read at all
    #[error("Cannot scan {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Sorting or diffing the marker files failed
    #[error("Removal detection failed: {message}")]
    RemovalDetection { message: String },

    /// Configuration rejected before the run started
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Filesystem error from syncstat-fs
    #[error(transparent)]
    Fs(#[from] syncstat_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub(crate) fn removal_detection(message: impl std::fmt::Display) -> Self {
        Self::RemovalDetection {
            message: message.to_string(),
        }
    }
}
