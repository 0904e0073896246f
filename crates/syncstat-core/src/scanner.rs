//! Directory scanner yielding file paths in a deterministic order

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::{Error, Result};

/// Depth-first walk over a directory tree.
///
/// Entries are visited in file-name order within each directory, so two
/// scans of an unchanged tree yield the same sequence. Directory symlinks
/// are not followed. File symlinks are yielded, including broken ones,
/// which then fail to stat downstream. Subdirectories that cannot be read
/// are logged and skipped.
#[derive(Debug)]
pub struct DirScanner {
    /// Directories still to visit, next one on top
    stack: Vec<PathBuf>,
    /// Files of the directory being drained, next one on top
    files: Vec<PathBuf>,
}

impl DirScanner {
    /// Start a scan at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Scan`] when the root itself cannot be read.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let mut scanner = Self {
            stack: Vec::new(),
            files: Vec::new(),
        };
        let (dirs, files) = read_sorted(root).map_err(|source| Error::Scan {
            path: root.to_path_buf(),
            source,
        })?;
        scanner.enqueue(dirs, files);
        Ok(scanner)
    }

    fn enqueue(&mut self, mut dirs: Vec<PathBuf>, mut files: Vec<PathBuf>) {
        dirs.reverse();
        files.reverse();
        self.stack.extend(dirs);
        self.files = files;
    }
}

impl Iterator for DirScanner {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            if let Some(file) = self.files.pop() {
                return Some(file);
            }
            let dir = self.stack.pop()?;
            match read_sorted(&dir) {
                Ok((dirs, files)) => self.enqueue(dirs, files),
                Err(error) => {
                    warn!(
                        dir = %dir.display(),
                        error = %error,
                        "Failed to read directory during scan"
                    );
                }
            }
        }
    }
}

/// Read one directory, splitting it into subdirectories and files, both
/// sorted by name.
fn read_sorted(dir: &Path) -> std::io::Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();

    for entry_result in fs::read_dir(dir)? {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(error) => {
                warn!(
                    dir = %dir.display(),
                    error = %error,
                    "Failed to read directory entry during scan"
                );
                continue;
            }
        };
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(error) => {
                warn!(
                    path = %path.display(),
                    error = %error,
                    "Failed to read file type during scan"
                );
                continue;
            }
        };

        if file_type.is_dir() {
            dirs.push(path);
        } else if file_type.is_symlink() {
            // Follow only to decide; a dangling link still counts as a file
            match fs::metadata(&path) {
                Ok(meta) if meta.is_dir() => {}
                _ => files.push(path),
            }
        } else if file_type.is_file() {
            files.push(path);
        }
    }

    dirs.sort();
    files.sort();
    Ok((dirs, files))
}
