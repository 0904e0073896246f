//! Batched reconciliation of a directory scan against the store
//!
//! Scanned paths are buffered into fixed-size batches. Each batch costs
//! one lookup query plus at most one write per transition group, so the
//! number of store round-trips grows with the batch count rather than
//! the file count.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::{DEFAULT_BATCH_SIZE, RunConfig};
use crate::marker::MarkerWriter;
use crate::record::{FileRecord, FileStatus, NewRecord, mtime_nanos};
use crate::scanner::DirScanner;
use crate::stats::RunStats;
use crate::store::{FileStore, RecordUpdate, ScanTransaction, SweepSummary, UpdateKind};
use crate::Result;

/// Tuning for one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub batch_size: usize,
    pub ignore_mtime: bool,
    /// State files that may sit inside the scanned tree. They are skipped
    /// along with their SQLite `-wal`/`-shm`/`-journal` files and
    /// atomic-write temp siblings.
    pub excluded: Vec<PathBuf>,
}

impl ReconcileOptions {
    /// Whether a scanned path is one of the excluded state files.
    pub fn is_excluded(&self, path: &Path) -> bool {
        let (Some(dir), Some(name)) = (path.parent(), path.file_name().and_then(|n| n.to_str()))
        else {
            return false;
        };
        self.excluded.iter().any(|state| {
            state.parent() == Some(dir)
                && state
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|state_name| {
                        name == state_name
                            || name
                                .strip_prefix(state_name)
                                .is_some_and(|rest| rest.starts_with('-'))
                            || name
                                .strip_prefix('.')
                                .and_then(|rest| rest.strip_prefix(state_name))
                                .is_some_and(|rest| rest.ends_with(".tmp"))
                    })
        })
    }
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            ignore_mtime: false,
            excluded: Vec::new(),
        }
    }
}

impl From<&RunConfig> for ReconcileOptions {
    fn from(config: &RunConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            ignore_mtime: config.ignore_mtime,
            excluded: config.state_files(),
        }
    }
}

/// The store write a classification calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreWrite {
    Insert,
    Update(UpdateKind),
}

/// Classification of one observed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub status: FileStatus,
    pub write: StoreWrite,
}

impl Verdict {
    fn new(status: FileStatus, write: StoreWrite) -> Self {
        Self { status, write }
    }
}

/// Decide the new status of a path seen with mtime `mtime`.
///
/// An unsynced `ADDED` or `MODIFIED` record keeps its status while its
/// mtime stands still, so a pending upload is never lost.
pub fn classify(existing: Option<&FileRecord>, mtime: i64, ignore_mtime: bool) -> Verdict {
    let Some(record) = existing else {
        return Verdict::new(FileStatus::Added, StoreWrite::Insert);
    };
    if record.status == FileStatus::Removed {
        return Verdict::new(FileStatus::Added, StoreWrite::Update(UpdateKind::Readded));
    }
    if ignore_mtime || mtime > record.modified_at {
        return Verdict::new(FileStatus::Modified, StoreWrite::Update(UpdateKind::Modified));
    }
    if !record.synced && record.status.awaits_upload() {
        return Verdict::new(record.status, StoreWrite::Update(UpdateKind::Unchanged));
    }
    match record.status {
        FileStatus::NotModified => {
            Verdict::new(FileStatus::NotModified, StoreWrite::Update(UpdateKind::Unchanged))
        }
        _ => Verdict::new(FileStatus::NotModified, StoreWrite::Update(UpdateKind::NotModified)),
    }
}

/// Writes issued during a scan, by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// New records
    pub inserted: usize,
    /// Records whose mtime was rewritten (modified or re-added)
    pub mtime_updated: usize,
    /// Records moved to `NOT_MODIFIED`
    pub status_updated: usize,
    /// Records only marked as seen
    pub checked_only: usize,
    /// Batches flushed
    pub batches: usize,
}

impl WriteSummary {
    /// Record writes that change stored content; checked-flag marking is
    /// bookkeeping and not counted.
    pub fn record_writes(&self) -> usize {
        self.inserted + self.mtime_updated + self.status_updated
    }
}

/// Result of [`scan_directory`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub writes: WriteSummary,
    pub sweep: SweepSummary,
}

/// One batch partitioned into its write groups.
#[derive(Debug, Default)]
struct BatchPlan {
    inserts: Vec<NewRecord>,
    modified: Vec<RecordUpdate>,
    readded: Vec<RecordUpdate>,
    not_modified: Vec<RecordUpdate>,
    unchanged: Vec<RecordUpdate>,
}

impl BatchPlan {
    fn push(&mut self, path: String, existing: Option<&FileRecord>, verdict: Verdict, mtime: i64) {
        let update = |record: Option<&FileRecord>| RecordUpdate {
            id: record.map_or(0, |r| r.id),
            modified_at: mtime,
        };
        match verdict.write {
            StoreWrite::Insert => self.inserts.push(NewRecord {
                path,
                modified_at: mtime,
            }),
            StoreWrite::Update(UpdateKind::Modified) => self.modified.push(update(existing)),
            StoreWrite::Update(UpdateKind::Readded) => self.readded.push(update(existing)),
            StoreWrite::Update(UpdateKind::NotModified) => self.not_modified.push(update(existing)),
            StoreWrite::Update(UpdateKind::Unchanged) => self.unchanged.push(update(existing)),
        }
    }

    fn apply(self, tx: &ScanTransaction<'_>, summary: &mut WriteSummary) -> Result<()> {
        summary.inserted += tx.insert_batch(&self.inserts)?;
        summary.mtime_updated += tx.update_batch(UpdateKind::Modified, &self.modified)?;
        summary.mtime_updated += tx.update_batch(UpdateKind::Readded, &self.readded)?;
        summary.status_updated += tx.update_batch(UpdateKind::NotModified, &self.not_modified)?;
        summary.checked_only += tx.update_batch(UpdateKind::Unchanged, &self.unchanged)?;
        summary.batches += 1;
        Ok(())
    }
}

/// Buffers scanned paths and reconciles them a batch at a time.
pub struct Reconciler<'tx, 'conn> {
    tx: &'tx ScanTransaction<'conn>,
    options: ReconcileOptions,
    pending: Vec<String>,
    summary: WriteSummary,
}

impl<'tx, 'conn> Reconciler<'tx, 'conn> {
    pub fn new(tx: &'tx ScanTransaction<'conn>, options: ReconcileOptions) -> Self {
        let batch_size = options.batch_size.max(1);
        Self {
            tx,
            options: ReconcileOptions {
                batch_size,
                ..options
            },
            pending: Vec::with_capacity(batch_size),
            summary: WriteSummary::default(),
        }
    }

    /// Queue a scanned path, flushing when the batch is full.
    pub fn push(&mut self, path: String, stats: &mut RunStats) -> Result<()> {
        self.pending.push(path);
        if self.pending.len() >= self.options.batch_size {
            self.flush(stats)?;
        }
        Ok(())
    }

    /// Reconcile whatever is buffered.
    pub fn flush(&mut self, stats: &mut RunStats) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let paths = std::mem::take(&mut self.pending);
        let existing = self.tx.lookup_batch(&paths)?;

        let mut plan = BatchPlan::default();
        for path in paths {
            let mtime = match fs::metadata(&path).and_then(|meta| mtime_nanos(&meta)) {
                Ok(mtime) => mtime,
                Err(error) => {
                    warn!(path = %path, error = %error, "Failed to stat file, skipping");
                    stats.record_stat_error();
                    continue;
                }
            };
            let record = existing.get(&path);
            let verdict = classify(record, mtime, self.options.ignore_mtime);
            match verdict.write {
                StoreWrite::Insert | StoreWrite::Update(UpdateKind::Readded) => stats.added += 1,
                StoreWrite::Update(UpdateKind::Modified) => stats.modified += 1,
                _ => {}
            }
            plan.push(path, record, verdict, mtime);
        }

        plan.apply(self.tx, &mut self.summary)?;
        debug!(
            batch = self.summary.batches,
            processed = stats.total,
            "Reconciled batch"
        );
        Ok(())
    }

    /// Flush the last partial batch and return the write totals.
    pub fn finish(mut self, stats: &mut RunStats) -> Result<WriteSummary> {
        self.flush(stats)?;
        Ok(self.summary)
    }
}

/// Scan `root` and bring the store in line with it.
///
/// Resets every checked flag, reconciles the scan batch by batch, sweeps
/// unseen records to `REMOVED`, and commits once at the end. Any store
/// error returns early and the uncommitted transaction rolls back. Every
/// discovered path is also appended to `markers` when given. State files
/// named in `options.excluded` are neither counted nor recorded.
pub fn scan_directory(
    store: &mut FileStore,
    root: &Path,
    options: ReconcileOptions,
    mut markers: Option<&mut MarkerWriter>,
    stats: &mut RunStats,
) -> Result<ScanSummary> {
    let scanner = DirScanner::new(root)?;
    let tx = store.begin_scan()?;
    let reset = tx.reset_checked_flags()?;
    info!(root = %root.display(), reset, "Scanning directory");

    let mut reconciler = Reconciler::new(&tx, options.clone());
    for path in scanner {
        if options.is_excluded(&path) {
            debug!(path = %path.display(), "Skipping state file");
            continue;
        }
        stats.total += 1;
        let Some(text) = path.to_str() else {
            warn!(path = %path.display(), "Path is not valid UTF-8, skipping");
            stats.record_stat_error();
            continue;
        };
        if let Some(markers) = markers.as_deref_mut() {
            markers.record(text);
        }
        reconciler.push(text.to_owned(), stats)?;
    }
    let writes = reconciler.finish(stats)?;

    let sweep = tx.sweep_unchecked()?;
    tx.commit()?;

    info!(
        total = stats.total,
        added = stats.added,
        modified = stats.modified,
        removed = sweep.newly_removed,
        "Scan committed"
    );
    Ok(ScanSummary { writes, sweep })
}
