//! Scan and reconcile behaviour against a real directory tree

mod common;

use chrono::Utc;
use pretty_assertions::assert_eq;
use syncstat_core::{FileStatus, FileStore, ReconcileOptions, SyncStatus};
use syncstat_test_utils::TestTree;

use common::{scan, scan_with};

fn mark_synced(store: &FileStore, tree: &TestTree, rels: &[&str]) {
    for rel in rels {
        assert!(store.record_sync(&tree.key(rel), SyncStatus::Ok, Utc::now()).unwrap());
    }
}

fn status(store: &FileStore, tree: &TestTree, rel: &str) -> FileStatus {
    store.get(&tree.key(rel)).unwrap().unwrap().status
}

#[test]
fn new_paths_are_added_and_unsynced() {
    let tree = TestTree::new();
    tree.write("a.txt", "a");
    tree.write("nested/b.txt", "b");
    let mut store = FileStore::open_in_memory().unwrap();

    let (summary, stats) = scan(&mut store, tree.root());

    assert_eq!(summary.writes.inserted, 2);
    assert_eq!(stats.total, 2);
    assert_eq!(stats.added, 2);
    let record = store.get(&tree.key("nested/b.txt")).unwrap().unwrap();
    assert_eq!(record.status, FileStatus::Added);
    assert!(!record.synced);
    assert!(record.checked);
}

#[test]
fn mixed_batch_writes_only_what_changed() {
    let tree = TestTree::new();
    tree.write("y.txt", "y");
    tree.write("z.txt", "z");
    let mut store = FileStore::open_in_memory().unwrap();
    scan(&mut store, tree.root());
    mark_synced(&store, &tree, &["y.txt", "z.txt"]);
    scan(&mut store, tree.root());
    assert_eq!(status(&store, &tree, "y.txt"), FileStatus::NotModified);

    tree.write("x.txt", "x");
    tree.bump_mtime("z.txt", 60);
    let (summary, stats) = scan(&mut store, tree.root());

    assert_eq!(status(&store, &tree, "x.txt"), FileStatus::Added);
    assert_eq!(status(&store, &tree, "y.txt"), FileStatus::NotModified);
    assert_eq!(status(&store, &tree, "z.txt"), FileStatus::Modified);
    assert_eq!(summary.writes.inserted, 1);
    assert_eq!(summary.writes.mtime_updated, 1);
    assert_eq!(summary.writes.status_updated, 0);
    assert_eq!(summary.writes.record_writes(), 2);
    assert_eq!(summary.writes.checked_only, 1);
    assert_eq!((stats.added, stats.modified), (1, 1));
}

#[test]
fn pending_uploads_keep_their_status() {
    let tree = TestTree::new();
    tree.write("new.txt", "n");
    tree.write("changed.txt", "c");
    let mut store = FileStore::open_in_memory().unwrap();
    scan(&mut store, tree.root());
    mark_synced(&store, &tree, &["changed.txt"]);
    tree.bump_mtime("changed.txt", 5);
    scan(&mut store, tree.root());

    scan(&mut store, tree.root());
    let (_, stats) = scan(&mut store, tree.root());

    assert_eq!(status(&store, &tree, "new.txt"), FileStatus::Added);
    assert_eq!(status(&store, &tree, "changed.txt"), FileStatus::Modified);
    assert_eq!((stats.added, stats.modified), (0, 0));
}

#[test]
fn unchanged_tree_stays_not_modified() {
    let tree = TestTree::new();
    tree.write("a.txt", "a");
    let mut store = FileStore::open_in_memory().unwrap();
    scan(&mut store, tree.root());
    mark_synced(&store, &tree, &["a.txt"]);

    for _ in 0..2 {
        scan(&mut store, tree.root());
        let record = store.get(&tree.key("a.txt")).unwrap().unwrap();
        assert_eq!(record.status, FileStatus::NotModified);
        assert!(record.synced);
    }
}

#[test]
fn unseen_records_are_swept_to_removed() {
    let tree = TestTree::new();
    tree.write("kept.txt", "k");
    tree.write("synced.txt", "s");
    tree.write("never-uploaded.txt", "n");
    let mut store = FileStore::open_in_memory().unwrap();
    scan(&mut store, tree.root());
    mark_synced(&store, &tree, &["kept.txt", "synced.txt"]);

    tree.remove("synced.txt");
    tree.remove("never-uploaded.txt");
    let (summary, _) = scan(&mut store, tree.root());

    assert_eq!(summary.sweep.newly_removed, 2);
    let synced = store.get(&tree.key("synced.txt")).unwrap().unwrap();
    assert_eq!(synced.status, FileStatus::Removed);
    assert!(!synced.synced, "remote copy must still be deleted");
    let never = store.get(&tree.key("never-uploaded.txt")).unwrap().unwrap();
    assert_eq!(never.status, FileStatus::Removed);
    assert!(never.synced, "nothing to delete remotely");

    let deletes = store.pending_deletes(0, 10).unwrap();
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].path, tree.key("synced.txt"));

    let (summary, _) = scan(&mut store, tree.root());
    assert_eq!(summary.sweep.newly_removed, 0);
    assert_eq!(summary.sweep.still_removed, 2);
    assert_eq!(store.pending_deletes(0, 10).unwrap().len(), 1);
}

#[test]
fn reappearing_path_is_added_again() {
    let tree = TestTree::new();
    tree.write("back.txt", "1");
    let mut store = FileStore::open_in_memory().unwrap();
    scan(&mut store, tree.root());
    let id = store.get(&tree.key("back.txt")).unwrap().unwrap().id;
    tree.remove("back.txt");
    scan(&mut store, tree.root());

    tree.write("back.txt", "2");
    let (summary, stats) = scan(&mut store, tree.root());

    let record = store.get(&tree.key("back.txt")).unwrap().unwrap();
    assert_eq!(record.id, id);
    assert_eq!(record.status, FileStatus::Added);
    assert!(!record.synced);
    assert_eq!(summary.writes.inserted, 0);
    assert_eq!(summary.writes.mtime_updated, 1);
    assert_eq!(stats.added, 1);
}

#[test]
fn ignore_mtime_marks_everything_modified() {
    let tree = TestTree::new();
    tree.write("a.txt", "a");
    tree.write("b.txt", "b");
    let mut store = FileStore::open_in_memory().unwrap();
    scan(&mut store, tree.root());
    mark_synced(&store, &tree, &["a.txt", "b.txt"]);

    let options = ReconcileOptions {
        ignore_mtime: true,
        ..Default::default()
    };
    let (_, stats) = scan_with(&mut store, tree.root(), options);

    assert_eq!(stats.modified, 2);
    assert_eq!(store.pending_uploads(0, 10).unwrap().len(), 2);
}

#[test]
fn small_batches_give_same_result() {
    let tree = TestTree::new();
    for i in 0..25 {
        tree.write(&format!("dir{}/f{i}.txt", i % 3), "x");
    }
    let mut store = FileStore::open_in_memory().unwrap();
    let options = ReconcileOptions {
        batch_size: 4,
        ..Default::default()
    };

    let (summary, stats) = scan_with(&mut store, tree.root(), options);

    assert_eq!(summary.writes.inserted, 25);
    assert_eq!(summary.writes.batches, 7);
    assert_eq!(stats.total, 25);
    assert_eq!(store.len().unwrap(), 25);
}

#[cfg(unix)]
#[test]
fn unstattable_path_is_counted_and_swept() {
    let tree = TestTree::new();
    tree.write("target.txt", "t");
    std::os::unix::fs::symlink(tree.path("target.txt"), tree.path("link.txt")).unwrap();
    let mut store = FileStore::open_in_memory().unwrap();
    scan(&mut store, tree.root());
    assert_eq!(status(&store, &tree, "link.txt"), FileStatus::Added);

    tree.remove("target.txt");
    let (_, stats) = scan(&mut store, tree.root());

    assert_eq!(stats.total, 1);
    assert_eq!(stats.stat_errors, 1);
    assert_eq!(stats.errors, 1);
    assert_eq!(status(&store, &tree, "link.txt"), FileStatus::Removed);
}

#[test]
fn status_counts_group_records() {
    let tree = TestTree::new();
    tree.write("a.txt", "a");
    tree.write("b.txt", "b");
    let mut store = FileStore::open_in_memory().unwrap();
    scan(&mut store, tree.root());
    tree.remove("b.txt");
    scan(&mut store, tree.root());

    let counts = store.status_counts().unwrap();
    assert_eq!(counts.get(&FileStatus::Added), Some(&1));
    assert_eq!(counts.get(&FileStatus::Removed), Some(&1));
    assert_eq!(counts.get(&FileStatus::Modified), None);
    assert_eq!(store.count(FileStatus::Removed).unwrap(), 1);
}

#[test]
fn state_files_inside_the_tree_are_skipped() {
    let tree = TestTree::new();
    tree.write("a.txt", "a");
    tree.write("files.sqlite", "db");
    tree.write("files.sqlite-wal", "wal");
    tree.write(".files.sqlite.4242.tmp", "tmp");
    tree.write("files.sqlite.bak", "user copy");
    let mut store = FileStore::open_in_memory().unwrap();
    let options = ReconcileOptions {
        excluded: vec![tree.path("files.sqlite")],
        ..Default::default()
    };

    let (_, stats) = scan_with(&mut store, tree.root(), options);

    assert_eq!(stats.total, 2);
    assert!(store.get(&tree.key("a.txt")).unwrap().is_some());
    assert!(store.get(&tree.key("files.sqlite.bak")).unwrap().is_some());
    assert!(store.get(&tree.key("files.sqlite")).unwrap().is_none());
    assert!(store.get(&tree.key("files.sqlite-wal")).unwrap().is_none());
}
