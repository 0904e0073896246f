//! Run driver tying scan, removal detection, and dispatch together

use std::path::Path;

use syncstat_fs::RunLock;
use tracing::{info, warn};

use crate::config::{RemovalStrategy, RunConfig};
use crate::dispatch::Dispatcher;
use crate::governor::Throttle;
use crate::marker::{MarkerLedger, MarkerWriter};
use crate::reconcile::{ReconcileOptions, scan_directory};
use crate::remote::RemoteStore;
use crate::stats::RunStats;
use crate::store::FileStore;
use crate::{Error, Result};

/// Runs one full sync pass for a validated [`RunConfig`].
///
/// Order of work: take the run lock, rotate the marker files, scan and
/// commit, finish the marker listing, upload, then delete.
#[derive(Debug, Clone)]
pub struct SyncEngine {
    config: RunConfig,
}

impl SyncEngine {
    /// Validate `config` and build an engine for it.
    pub fn new(config: RunConfig) -> Result<Self> {
        Ok(Self {
            config: config.validate()?,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Execute the run.
    ///
    /// # Errors
    ///
    /// Fails on store errors, an unreadable scan root, or a state
    /// directory already locked by another run. Per-file problems are
    /// only counted in the returned [`RunStats`]. A failed removal diff
    /// skips the delete phase and is reported in
    /// [`RunStats::removal_error`].
    pub fn run(&self, remote: &mut dyn RemoteStore) -> Result<RunStats> {
        let config = &self.config;
        let _lock = RunLock::acquire(&config.marker_dir)?;

        let ledger = MarkerLedger::new(&config.marker_dir);
        let mut markers = match ledger.rotate() {
            Ok(writer) => Some(writer),
            Err(error) => {
                warn!(error = %error, "Failed to rotate marker files");
                None
            }
        };

        let mut stats = RunStats::new();
        let scanned = FileStore::open(config.database_path()).and_then(|mut store| {
            let summary = scan_directory(
                &mut store,
                &config.directory,
                ReconcileOptions::from(config),
                markers.as_mut(),
                &mut stats,
            )?;
            Ok((store, summary))
        });
        let (store, summary) = match scanned {
            Ok(scanned) => scanned,
            Err(error) => {
                // A partial listing must not become the next previous generation
                if markers.take().is_some() {
                    discard(ledger.current_path());
                }
                return Err(error);
            }
        };
        info!(
            inserted = summary.writes.inserted,
            updated = summary.writes.mtime_updated + summary.writes.status_updated,
            removed = summary.sweep.newly_removed,
            "Store updated"
        );

        let listing = finish_markers(&ledger, markers);

        let mut dispatcher = Dispatcher::new(
            config.remote.clone(),
            Throttle::new(config.throughput),
            config.limit,
        );
        dispatcher.upload_pending(&store, remote, &mut stats)?;

        match config.removal {
            RemovalStrategy::Sweep => dispatcher.delete_pending(&store, remote, &mut stats)?,
            RemovalStrategy::Markers => {
                match listing.and_then(|()| ledger.removed_paths()) {
                    Ok(removed) => {
                        info!(count = removed.len(), "Removed paths from marker diff");
                        dispatcher.delete_paths(&removed, &store, remote, &mut stats)?;
                    }
                    Err(error) => {
                        warn!(error = %error, "Removal detection failed, skipping deletes");
                        stats.removal_error = Some(error.to_string());
                    }
                }
            }
        }

        info!(%stats, "Run finished");
        Ok(stats)
    }
}

/// Flush and sort the current marker listing.
///
/// An incomplete listing is deleted so the next rotation can not turn it
/// into a previous generation that reports paths as removed.
fn finish_markers(ledger: &MarkerLedger, markers: Option<MarkerWriter>) -> Result<()> {
    let result = match markers {
        Some(writer) => writer.finish().and_then(|_| ledger.sort_current()),
        None => Err(Error::removal_detection("marker files are unavailable")),
    };
    if let Err(error) = &result {
        warn!(error = %error, "Marker listing incomplete, discarding it");
        discard(ledger.current_path());
    }
    result.map_err(|error| match error {
        Error::RemovalDetection { .. } => error,
        other => Error::removal_detection(other),
    })
}

fn discard(path: &Path) {
    if let Err(error) = std::fs::remove_file(path)
        && error.kind() != std::io::ErrorKind::NotFound
    {
        warn!(path = %path.display(), error = %error, "Failed to remove marker file");
    }
}
