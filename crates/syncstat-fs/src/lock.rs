//! Advisory lock guarding a state directory for the length of one run

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::{Error, Result, StatePath};

/// Exclusive hold on a state directory.
///
/// Two runs sharing a state directory would interleave marker rotation
/// and checked-flag resets, so the second one is refused. The lock is
/// released when the guard is dropped.
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Try to take the run lock in `dir` without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockFailed`] when another process holds it.
    pub fn acquire(dir: &Path) -> Result<Self> {
        let path = StatePath::RunLock.in_dir(dir);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| Error::io(&path, e))?;

        file.try_lock_exclusive()
            .map_err(|_| Error::LockFailed { path: path.clone() })?;

        tracing::debug!(path = %path.display(), "Acquired run lock");
        Ok(Self { file, path })
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
