//! [`TestTree`] builder for scan scenarios.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

/// A temporary data directory plus a separate state directory.
///
/// Paths handed out are canonical, so they compare equal to what a
/// validated run configuration stores.
///
/// # Example
///
/// ```rust,no_run
/// use syncstat_test_utils::TestTree;
///
/// let tree = TestTree::new();
/// tree.write("photos/a.jpg", "jpeg");
/// tree.bump_mtime("photos/a.jpg", 60);
/// tree.assert_exists("photos/a.jpg");
/// ```
pub struct TestTree {
    _temp_dir: TempDir,
    root: PathBuf,
    state_dir: PathBuf,
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TestTree {
    /// Create empty `data/` and `state/` directories.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let base = fs::canonicalize(temp_dir.path()).unwrap();
        let root = base.join("data");
        let state_dir = base.join("state");
        fs::create_dir(&root).unwrap();
        fs::create_dir(&state_dir).unwrap();
        Self {
            _temp_dir: temp_dir,
            root,
            state_dir,
        }
    }

    /// The directory under scan.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for marker files, run lock, and database.
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Absolute path of `rel` under the data root.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Absolute path of `rel` as stored text.
    pub fn key(&self, rel: &str) -> String {
        self.path(rel).to_string_lossy().into_owned()
    }

    /// Write `content` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Set the modification time of `rel`.
    pub fn set_mtime(&self, rel: &str, mtime: SystemTime) {
        let file = OpenOptions::new()
            .write(true)
            .open(self.path(rel))
            .unwrap_or_else(|e| panic!("Could not open {rel}: {e}"));
        file.set_modified(mtime).unwrap();
    }

    /// Move the mtime of `rel` forward by `secs` seconds.
    pub fn bump_mtime(&self, rel: &str, secs: u64) {
        let current = fs::metadata(self.path(rel)).unwrap().modified().unwrap();
        self.set_mtime(rel, current + Duration::from_secs(secs));
    }

    pub fn remove(&self, rel: &str) {
        fs::remove_file(self.path(rel)).unwrap();
    }

    /// Create a subdirectory under the data root.
    pub fn mkdir(&self, rel: &str) -> PathBuf {
        let path = self.path(rel);
        fs::create_dir_all(&path).unwrap();
        path
    }

    /// Assert that `rel` exists under the data root.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_exists(&self, rel: &str) {
        let full_path = self.path(rel);
        assert!(
            full_path.exists(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }

    /// Read a state-directory file, empty when missing.
    pub fn read_state(&self, name: &str) -> String {
        fs::read_to_string(self.state_dir.join(name)).unwrap_or_default()
    }
}
