//! Helpers shared by the syncstat-core integration tests

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use syncstat_core::{
    DispatchOutcome, FileStore, ReconcileOptions, RemoteStore, RunStats, ScanSummary,
    scan_directory,
};

/// Remote store that remembers every call and fails on request.
#[derive(Debug, Default)]
pub struct RecordingRemote {
    pub puts: Vec<(PathBuf, String)>,
    pub deletes: Vec<String>,
    pub failing: HashSet<String>,
}

impl RecordingRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(remote_ids: &[&str]) -> Self {
        Self {
            failing: remote_ids.iter().map(|id| id.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn put_ids(&self) -> Vec<&str> {
        self.puts.iter().map(|(_, id)| id.as_str()).collect()
    }

    fn outcome(&self, remote_id: &str) -> DispatchOutcome {
        if self.failing.contains(remote_id) {
            DispatchOutcome::failed(1, format!("ERROR: {remote_id}: 403 Forbidden"))
        } else {
            DispatchOutcome::ok()
        }
    }
}

impl RemoteStore for RecordingRemote {
    fn put(&mut self, local: &Path, remote_id: &str) -> DispatchOutcome {
        self.puts.push((local.to_path_buf(), remote_id.to_string()));
        self.outcome(remote_id)
    }

    fn delete(&mut self, remote_id: &str) -> DispatchOutcome {
        self.deletes.push(remote_id.to_string());
        self.outcome(remote_id)
    }
}

/// Run one scan with default options and no marker listing.
pub fn scan(store: &mut FileStore, root: &Path) -> (ScanSummary, RunStats) {
    scan_with(store, root, ReconcileOptions::default())
}

pub fn scan_with(
    store: &mut FileStore,
    root: &Path,
    options: ReconcileOptions,
) -> (ScanSummary, RunStats) {
    let mut stats = RunStats::new();
    let summary = scan_directory(store, root, options, None, &mut stats).unwrap();
    (summary, stats)
}
