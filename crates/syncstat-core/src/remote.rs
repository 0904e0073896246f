//! Remote object store contract

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Result of one put or delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Exit status; zero means success
    pub status: i32,
    /// Diagnostic text from the transfer tool
    pub output: String,
}

impl DispatchOutcome {
    pub fn ok() -> Self {
        Self {
            status: 0,
            output: String::new(),
        }
    }

    pub fn failed(status: i32, output: impl Into<String>) -> Self {
        Self {
            status,
            output: output.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 0
    }
}

/// Capability to mirror local files into a remote namespace.
///
/// Calls are synchronous and must not panic on transfer failure; a
/// failed transfer is a non-zero [`DispatchOutcome`].
pub trait RemoteStore {
    /// Upload `local` to `remote_id`.
    fn put(&mut self, local: &Path, remote_id: &str) -> DispatchOutcome;

    /// Delete `remote_id`.
    fn delete(&mut self, remote_id: &str) -> DispatchOutcome;
}

impl<T: RemoteStore + ?Sized> RemoteStore for &mut T {
    fn put(&mut self, local: &Path, remote_id: &str) -> DispatchOutcome {
        (**self).put(local, remote_id)
    }

    fn delete(&mut self, remote_id: &str) -> DispatchOutcome {
        (**self).delete(remote_id)
    }
}

/// Maps local paths under `local_root` to identifiers under `prefix`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteNamespace {
    pub local_root: PathBuf,
    pub prefix: String,
}

impl RemoteNamespace {
    pub fn new(local_root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            local_root: local_root.into(),
            prefix: prefix.into(),
        }
    }

    /// Remote identifier for a stored path.
    ///
    /// The local root is stripped only at a component boundary; a path
    /// outside the root keeps its full text under the prefix.
    pub fn remote_id(&self, path: &str) -> String {
        let root = self.local_root.to_string_lossy();
        let root = root.trim_end_matches('/');
        let relative = path
            .strip_prefix(root)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(path);
        format!(
            "{}/{}",
            self.prefix.trim_end_matches('/'),
            relative.trim_start_matches('/')
        )
    }
}
