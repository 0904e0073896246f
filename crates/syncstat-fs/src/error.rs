//! Error types for syncstat-fs

use std::path::PathBuf;

/// Result type for syncstat-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failures while touching the state directory
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} config at {path}: {message}")]
    ConfigParse {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Unsupported config format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("Another run holds the lock at {path}")]
    LockFailed { path: PathBuf },

    #[error("Line {line:?} cannot be stored in {path}: embedded newline")]
    InvalidLine { path: PathBuf, line: String },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
