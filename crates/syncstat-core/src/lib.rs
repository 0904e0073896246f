//! Change detection and throttled sync engine for syncstat
//!
//! This crate keeps a persistent record of every file under a directory
//! tree and pushes changes to a remote object store:
//!
//! - **Store**: SQLite table of file records with scan-scoped transactions
//! - **Reconciler**: batched classification of a scan into added, modified,
//!   unchanged, and removed records
//! - **Marker ledger**: previous/current path listings and their sorted diff
//! - **Governor**: burst-then-pause throughput cap for dispatches
//! - **SyncEngine**: one full run from scan to report
//!
//! # Architecture
//!
//! ```text
//!                 syncstat-cli
//!                      |
//!                syncstat-core
//!                      |
//!                 syncstat-fs
//! ```
//!
//! The remote side is a [`RemoteStore`] implementation supplied by the
//! caller; the core never spawns processes itself.
//!
//! # Example
//!
//! ```ignore
//! use syncstat_core::{RunConfig, SyncEngine};
//!
//! let config = RunConfig::load("syncstat.toml".as_ref())?;
//! let stats = SyncEngine::new(config)?.run(&mut my_remote)?;
//! println!("{stats}");
//! ```

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod governor;
pub mod marker;
pub mod reconcile;
pub mod record;
pub mod remote;
pub mod scanner;
pub mod stats;
pub mod store;

pub use config::{DEFAULT_BATCH_SIZE, RemovalStrategy, RunConfig};
pub use dispatch::Dispatcher;
pub use engine::SyncEngine;
pub use error::{Error, Result};
pub use governor::{Clock, SystemClock, Throttle, Throughput, Window};
pub use marker::{DiffError, MarkerLedger, MarkerWriter, SortedSetDiff};
pub use reconcile::{
    ReconcileOptions, Reconciler, ScanSummary, StoreWrite, Verdict, WriteSummary, classify,
    scan_directory,
};
pub use record::{FileRecord, FileStatus, NewRecord, SyncStatus};
pub use remote::{DispatchOutcome, RemoteNamespace, RemoteStore};
pub use scanner::DirScanner;
pub use stats::RunStats;
pub use store::{FileStore, RecordUpdate, ScanTransaction, SweepSummary, UpdateKind};
