//! Throttled put/delete passes over pending records

use std::path::Path;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::governor::{Clock, SystemClock, Throttle};
use crate::record::{FileRecord, SyncStatus};
use crate::remote::{DispatchOutcome, RemoteNamespace, RemoteStore};
use crate::stats::RunStats;
use crate::store::FileStore;
use crate::Result;

/// Records fetched per pending-work query.
const PAGE_SIZE: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Put,
    Delete,
}

/// Sends pending work to a [`RemoteStore`].
///
/// Every issued dispatch, successful or not, counts against the run
/// limit and ticks the throttle. Work left over once the limit is hit
/// stays pending in the store for the next run.
pub struct Dispatcher<C: Clock = SystemClock> {
    namespace: RemoteNamespace,
    throttle: Throttle<C>,
    limit: Option<usize>,
    issued: usize,
}

impl Dispatcher<SystemClock> {
    pub fn new(namespace: RemoteNamespace, throttle: Throttle, limit: Option<usize>) -> Self {
        Self::with_throttle(namespace, throttle, limit)
    }
}

impl<C: Clock> Dispatcher<C> {
    pub fn with_throttle(
        namespace: RemoteNamespace,
        throttle: Throttle<C>,
        limit: Option<usize>,
    ) -> Self {
        Self {
            namespace,
            throttle,
            limit,
            issued: 0,
        }
    }

    /// Dispatches issued so far.
    pub fn issued(&self) -> usize {
        self.issued
    }

    /// Whether the run limit has been reached.
    pub fn exhausted(&self) -> bool {
        self.limit.is_some_and(|limit| self.issued >= limit)
    }

    /// Put every unsynced `ADDED`/`MODIFIED` record.
    pub fn upload_pending(
        &mut self,
        store: &FileStore,
        remote: &mut dyn RemoteStore,
        stats: &mut RunStats,
    ) -> Result<()> {
        let mut after_id = 0;
        while !self.exhausted() {
            let page = store.pending_uploads(after_id, PAGE_SIZE)?;
            let Some(last) = page.last() else { break };
            after_id = last.id;
            self.dispatch_page(Operation::Put, &page, store, remote, stats)?;
        }
        info!(uploaded = stats.uploaded, "Upload pass finished");
        Ok(())
    }

    /// Delete the remote copy of every `REMOVED` record still owing one.
    pub fn delete_pending(
        &mut self,
        store: &FileStore,
        remote: &mut dyn RemoteStore,
        stats: &mut RunStats,
    ) -> Result<()> {
        let mut after_id = 0;
        while !self.exhausted() {
            let page = store.pending_deletes(after_id, PAGE_SIZE)?;
            let Some(last) = page.last() else { break };
            after_id = last.id;
            self.dispatch_page(Operation::Delete, &page, store, remote, stats)?;
        }
        info!(deleted = stats.deleted, "Delete pass finished");
        Ok(())
    }

    /// Delete the remote copies of an explicit path list.
    ///
    /// Outcomes are recorded for paths the store knows about.
    pub fn delete_paths(
        &mut self,
        paths: &[String],
        store: &FileStore,
        remote: &mut dyn RemoteStore,
        stats: &mut RunStats,
    ) -> Result<()> {
        for path in paths {
            if self.exhausted() {
                break;
            }
            self.dispatch(Operation::Delete, path, store, remote, stats)?;
        }
        info!(deleted = stats.deleted, "Delete pass finished");
        Ok(())
    }

    fn dispatch_page(
        &mut self,
        operation: Operation,
        page: &[FileRecord],
        store: &FileStore,
        remote: &mut dyn RemoteStore,
        stats: &mut RunStats,
    ) -> Result<()> {
        for record in page {
            if self.exhausted() {
                break;
            }
            self.dispatch(operation, &record.path, store, remote, stats)?;
        }
        Ok(())
    }

    fn dispatch(
        &mut self,
        operation: Operation,
        path: &str,
        store: &FileStore,
        remote: &mut dyn RemoteStore,
        stats: &mut RunStats,
    ) -> Result<()> {
        let remote_id = self.namespace.remote_id(path);
        debug!(?operation, path = %path, remote = %remote_id, "Dispatching");

        let outcome: DispatchOutcome = match operation {
            Operation::Put => remote.put(Path::new(path), &remote_id),
            Operation::Delete => remote.delete(&remote_id),
        };
        self.issued += 1;

        let status = if outcome.is_success() {
            match operation {
                Operation::Put => stats.uploaded += 1,
                Operation::Delete => stats.deleted += 1,
            }
            SyncStatus::Ok
        } else {
            warn!(
                ?operation,
                path = %path,
                status = outcome.status,
                output = %outcome.output.trim_end(),
                "Transfer failed"
            );
            stats.record_transfer_error();
            SyncStatus::Failed
        };
        store.record_sync(path, status, Utc::now())?;

        self.throttle.tick();
        Ok(())
    }
}
