//! Run lock exclusivity tests

use assert_fs::prelude::*;
use predicates::prelude::*;
use syncstat_fs::{Error, RunLock, StatePath};

#[test]
fn test_acquire_creates_lock_file() {
    let temp = assert_fs::TempDir::new().unwrap();

    let lock = RunLock::acquire(temp.path()).unwrap();

    temp.child(StatePath::RunLock.as_str())
        .assert(predicate::path::exists());
    assert_eq!(lock.path(), StatePath::RunLock.in_dir(temp.path()));
}

#[test]
fn test_second_acquire_fails_while_held() {
    let temp = assert_fs::TempDir::new().unwrap();

    let _held = RunLock::acquire(temp.path()).unwrap();
    let second = RunLock::acquire(temp.path());

    assert!(matches!(second, Err(Error::LockFailed { .. })));
}

#[test]
fn test_lock_released_on_drop() {
    let temp = assert_fs::TempDir::new().unwrap();

    {
        let _held = RunLock::acquire(temp.path()).unwrap();
    }

    assert!(RunLock::acquire(temp.path()).is_ok());
}

#[test]
fn test_acquire_in_missing_directory_is_io_error() {
    let temp = assert_fs::TempDir::new().unwrap();
    let missing = temp.child("does-not-exist");

    let result = RunLock::acquire(missing.path());

    assert!(matches!(result, Err(Error::Io { .. })));
}
