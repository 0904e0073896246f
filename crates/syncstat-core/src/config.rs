//! Run configuration
//!
//! A [`RunConfig`] is built once (from a config file, CLI flags, or
//! both), validated, and then only read for the rest of the run.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use syncstat_fs::{ConfigStore, StatePath};

use crate::governor::Throughput;
use crate::remote::RemoteNamespace;
use crate::{Error, Result};

/// Number of scanned paths reconciled per store round-trip.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

fn current_dir() -> PathBuf {
    PathBuf::from(".")
}

/// How removed paths are found after a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalStrategy {
    /// Records left unchecked by the scan are swept to `REMOVED`
    #[default]
    Sweep,
    /// Deletes come from diffing the previous and current marker files
    Markers,
}

impl FromStr for RemovalStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "sweep" => Ok(Self::Sweep),
            "markers" => Ok(Self::Markers),
            other => Err(format!(
                "unknown removal strategy {other:?}, expected sweep or markers"
            )),
        }
    }
}

impl fmt::Display for RemovalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sweep => "sweep",
            Self::Markers => "markers",
        })
    }
}

/// Immutable settings for one run.
///
/// # Example
///
/// ```
/// use syncstat_core::RunConfig;
///
/// let config = RunConfig::parse(r#"
/// directory = "/srv/media"
/// limit = 500
///
/// [throughput]
/// files = 10
/// per = "minute"
///
/// [remote]
/// prefix = "s3://media-backup"
/// "#).unwrap();
///
/// assert_eq!(config.limit, Some(500));
/// assert_eq!(config.batch_size, 1000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Root of the tree to scan
    pub directory: PathBuf,
    /// Where the marker files, run lock, and default database live
    pub marker_dir: PathBuf,
    /// Database file; defaults to `files.sqlite` in `marker_dir`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
    /// Treat every known file as modified
    pub ignore_mtime: bool,
    pub batch_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throughput: Option<Throughput>,
    /// Maximum puts plus deletes this run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    pub remote: RemoteNamespace,
    pub removal: RemovalStrategy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            directory: current_dir(),
            marker_dir: current_dir(),
            database: None,
            ignore_mtime: false,
            batch_size: DEFAULT_BATCH_SIZE,
            throughput: None,
            limit: None,
            remote: RemoteNamespace::default(),
            removal: RemovalStrategy::default(),
        }
    }
}

impl RunConfig {
    /// Parse a configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::invalid_config(e.to_string()))
    }

    /// Load a configuration file; TOML or JSON by extension.
    pub fn load(path: &Path) -> Result<Self> {
        Ok(ConfigStore::new().load(path)?)
    }

    /// Check the settings and resolve every path to its canonical form.
    ///
    /// An unset `remote.local_root` becomes the canonical scan directory.
    pub fn validate(mut self) -> Result<Self> {
        self.directory = existing_dir(&self.directory, "directory")?;
        self.marker_dir = existing_dir(&self.marker_dir, "marker_dir")?;

        if self.batch_size == 0 {
            return Err(Error::invalid_config("batch_size must be at least 1"));
        }
        if let Some(throughput) = self.throughput
            && throughput.files == 0
        {
            return Err(Error::invalid_config("throughput must be at least 1 file"));
        }
        if self.remote.prefix.trim_matches('/').is_empty() {
            return Err(Error::invalid_config("remote prefix can not be empty"));
        }

        self.remote.local_root = if self.remote.local_root.as_os_str().is_empty() {
            self.directory.clone()
        } else {
            dunce::canonicalize(&self.remote.local_root)
                .unwrap_or_else(|_| self.remote.local_root.clone())
        };
        self.database = self.database.map(|db| canonical_parent(&db));
        Ok(self)
    }

    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| StatePath::Database.in_dir(&self.marker_dir))
    }

    /// Files written by a run, skipped when they sit inside the scanned tree.
    pub fn state_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = [StatePath::Marker, StatePath::OldMarker, StatePath::RunLock]
            .iter()
            .map(|state| state.in_dir(&self.marker_dir))
            .collect();
        files.push(self.database_path());
        files
    }
}

/// `path` with its parent directory canonicalized, when the parent exists.
fn canonical_parent(path: &Path) -> PathBuf {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => dunce::canonicalize(parent)
            .map(|parent| parent.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}

fn existing_dir(path: &Path, field: &str) -> Result<PathBuf> {
    let canonical = dunce::canonicalize(path).map_err(|e| {
        Error::invalid_config(format!("{field} {} is not accessible: {e}", path.display()))
    })?;
    if !canonical.is_dir() {
        return Err(Error::invalid_config(format!(
            "{field} {} is not a directory",
            path.display()
        )));
    }
    Ok(canonical)
}
