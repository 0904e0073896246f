//! Atomic I/O operations for state files

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::{Error, Result};

/// Write newline-terminated lines atomically.
///
/// Lines are streamed into a locked temp file that is synced and then
/// renamed over `path`, so readers see either the old listing or the
/// complete new one. A line with an embedded newline would split into two
/// entries on read-back and is rejected.
pub fn write_lines_atomic<I, S>(path: &Path, lines: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let temp_path = temp_sibling(path)?;
    let temp_file = open_locked_temp(&temp_path, path)?;
    let mut writer = BufWriter::new(temp_file);

    for line in lines {
        let line = line.as_ref();
        if line.contains('\n') {
            drop(writer);
            let _ = fs::remove_file(&temp_path);
            return Err(Error::InvalidLine {
                path: path.to_path_buf(),
                line: line.to_string(),
            });
        }
        writeln!(writer, "{line}").map_err(|e| Error::io(&temp_path, e))?;
    }

    let temp_file = writer
        .into_inner()
        .map_err(|e| Error::io(&temp_path, e.into_error()))?;
    finish_atomic(temp_file, &temp_path, path)
}

/// Open a line file for streaming reads.
pub fn read_lines(path: &Path) -> Result<Lines<BufReader<File>>> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    Ok(BufReader::new(file).lines())
}

/// Create an empty file if nothing exists at `path` yet.
pub fn touch(path: &Path) -> Result<()> {
    OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map(|_| ())
        .map_err(|e| Error::io(path, e))
}

/// Rename `from` over `to`, replacing any existing file.
pub fn replace(from: &Path, to: &Path) -> Result<()> {
    fs::rename(from, to).map_err(|e| Error::io(from, e))
}

/// Create (or truncate) a file for buffered appends.
pub fn create_truncated(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    Ok(BufWriter::new(file))
}

fn temp_sibling(path: &Path) -> Result<PathBuf> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    // Same directory keeps the rename on one filesystem
    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    Ok(path.with_file_name(temp_name))
}

fn open_locked_temp(temp_path: &Path, target: &Path) -> Result<File> {
    let temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(temp_path)
        .map_err(|e| Error::io(temp_path, e))?;

    temp_file.lock_exclusive().map_err(|_| Error::LockFailed {
        path: target.to_path_buf(),
    })?;

    Ok(temp_file)
}

fn finish_atomic(temp_file: File, temp_path: &Path, target: &Path) -> Result<()> {
    temp_file
        .sync_all()
        .map_err(|e| Error::io(temp_path, e))?;

    temp_file.unlock().map_err(|_| Error::LockFailed {
        path: target.to_path_buf(),
    })?;
    drop(temp_file);

    fs::rename(temp_path, target).map_err(|e| Error::io(target, e))
}
