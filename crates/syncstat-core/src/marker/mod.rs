//! Marker ledger: two generations of the scanned path listing
//!
//! Each scan writes every path it discovers to the current marker file.
//! The listing from the run before is kept as the previous generation,
//! and paths present there but missing now are the removals.

mod diff;

pub use diff::{DiffError, Side, SortedSetDiff};

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use syncstat_fs::{StatePath, io};
use tracing::{debug, warn};

use crate::{Error, Result};

/// The pair of marker files in one state directory.
#[derive(Debug, Clone)]
pub struct MarkerLedger {
    current: PathBuf,
    previous: PathBuf,
}

impl MarkerLedger {
    pub fn new(dir: &Path) -> Self {
        Self {
            current: StatePath::Marker.in_dir(dir),
            previous: StatePath::OldMarker.in_dir(dir),
        }
    }

    pub fn current_path(&self) -> &Path {
        &self.current
    }

    pub fn previous_path(&self) -> &Path {
        &self.previous
    }

    /// Start a new generation.
    ///
    /// The existing current listing becomes the previous one; on a first
    /// run an empty previous listing is created. Returns a writer for the
    /// fresh, empty current listing.
    pub fn rotate(&self) -> Result<MarkerWriter> {
        if self.current.exists() {
            io::replace(&self.current, &self.previous)?;
            debug!(path = %self.previous.display(), "Rotated marker file");
        }
        if !self.previous.exists() {
            io::touch(&self.previous)?;
        }
        let writer = io::create_truncated(&self.current)?;
        Ok(MarkerWriter {
            writer,
            path: self.current.clone(),
            written: 0,
            failure: None,
        })
    }

    /// Rewrite the current listing in byte order without duplicates.
    ///
    /// The sort happens in memory, so peak usage grows with the tree: one
    /// `String` per scanned path. The diff that follows streams both files.
    pub fn sort_current(&self) -> Result<()> {
        let mut lines = io::read_lines(&self.current)
            .map_err(Error::removal_detection)?
            .collect::<std::io::Result<Vec<String>>>()
            .map_err(|e| Error::removal_detection(format!(
                "failed to read {}: {e}",
                self.current.display()
            )))?;
        lines.sort_unstable();
        lines.dedup();
        io::write_lines_atomic(&self.current, &lines)
            .map_err(Error::removal_detection)?;
        debug!(entries = lines.len(), "Sorted marker file");
        Ok(())
    }

    /// Paths listed in the previous generation but not the current one.
    ///
    /// Both listings must be sorted. Any read or ordering problem fails
    /// the whole call rather than returning a partial set.
    pub fn removed_paths(&self) -> Result<Vec<String>> {
        let previous = io::read_lines(&self.previous).map_err(Error::removal_detection)?;
        let current = io::read_lines(&self.current).map_err(Error::removal_detection)?;
        SortedSetDiff::new(previous, current)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::removal_detection)
    }
}

/// Appends discovered paths to the current marker file.
///
/// A write failure does not interrupt the scan: it is logged once, later
/// paths are dropped, and [`finish`](Self::finish) reports it so the
/// listing is never treated as complete.
pub struct MarkerWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    written: usize,
    failure: Option<std::io::Error>,
}

impl MarkerWriter {
    pub fn record(&mut self, path: &str) {
        if self.failure.is_some() {
            return;
        }
        if path.contains('\n') {
            warn!(path = %path.escape_debug(), "Path contains a newline, left out of marker file");
            return;
        }
        match writeln!(self.writer, "{path}") {
            Ok(()) => self.written += 1,
            Err(error) => {
                warn!(
                    marker = %self.path.display(),
                    error = %error,
                    "Failed to write marker file, removal listing disabled for this run"
                );
                self.failure = Some(error);
            }
        }
    }

    /// Number of paths written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush the listing to disk.
    pub fn finish(mut self) -> Result<usize> {
        if let Some(source) = self.failure.take() {
            return Err(syncstat_fs::Error::io(self.path, source).into());
        }
        self.writer
            .flush()
            .and_then(|()| self.writer.get_ref().sync_all())
            .map_err(|e| syncstat_fs::Error::io(&self.path, e))?;
        Ok(self.written)
    }
}
