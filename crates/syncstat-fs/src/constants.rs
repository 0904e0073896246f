//! Well-known file names inside the state directory.

use std::path::{Path, PathBuf};

/// Files syncstat keeps next to each other in its state directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatePath {
    /// The SQLite record store
    Database,
    /// Path listing written during the current run
    Marker,
    /// Path listing from the previous run
    OldMarker,
    /// Advisory lock held for the duration of a run
    RunLock,
}

impl StatePath {
    /// Get the file name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Database => "files.sqlite",
            Self::Marker => ".syncstat.lock",
            Self::OldMarker => ".syncstat.lock.old",
            Self::RunLock => ".syncstat.run.lock",
        }
    }

    /// Resolve this file inside `dir`.
    pub fn in_dir(&self, dir: &Path) -> PathBuf {
        dir.join(self.as_str())
    }
}

impl AsRef<Path> for StatePath {
    fn as_ref(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl AsRef<str> for StatePath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for StatePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_names_are_distinct() {
        assert_ne!(StatePath::Marker.as_str(), StatePath::OldMarker.as_str());
        assert_ne!(StatePath::Marker.as_str(), StatePath::RunLock.as_str());
    }

    #[test]
    fn in_dir_joins_file_name() {
        let path = StatePath::Database.in_dir(Path::new("/var/lib/syncstat"));
        assert_eq!(path, PathBuf::from("/var/lib/syncstat/files.sqlite"));
    }
}
