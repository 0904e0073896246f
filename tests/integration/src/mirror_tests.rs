//! Multi-run scenarios against an in-memory bucket
//!
//! Each scenario drives `SyncEngine` over a real directory tree for several
//! runs and checks that the bucket ends up mirroring the tree.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use syncstat_core::{
    DispatchOutcome, FileStatus, FileStore, RemoteNamespace, RemoteStore, RemovalStrategy,
    RunConfig, RunStats, SyncEngine, SyncStatus,
};
use syncstat_fs::StatePath;
use syncstat_test_utils::TestTree;

// =============================================================================
// Test Infrastructure
// =============================================================================

const PREFIX: &str = "s3://bucket/mirror";

/// Remote that keeps object contents, keyed by remote id.
#[derive(Debug, Default)]
struct Bucket {
    objects: BTreeMap<String, String>,
    calls: usize,
    down: bool,
}

impl Bucket {
    fn outage() -> DispatchOutcome {
        DispatchOutcome::failed(255, "ERROR: [Errno 111] Connection refused")
    }
}

impl RemoteStore for Bucket {
    fn put(&mut self, local: &Path, remote_id: &str) -> DispatchOutcome {
        self.calls += 1;
        if self.down {
            return Self::outage();
        }
        match fs::read_to_string(local) {
            Ok(content) => {
                self.objects.insert(remote_id.to_string(), content);
                DispatchOutcome::ok()
            }
            Err(e) => DispatchOutcome::failed(1, e.to_string()),
        }
    }

    fn delete(&mut self, remote_id: &str) -> DispatchOutcome {
        self.calls += 1;
        if self.down {
            return Self::outage();
        }
        self.objects.remove(remote_id);
        DispatchOutcome::ok()
    }
}

fn config(tree: &TestTree) -> RunConfig {
    RunConfig {
        directory: tree.root().to_path_buf(),
        marker_dir: tree.state_dir().to_path_buf(),
        remote: RemoteNamespace::new("", PREFIX),
        ..Default::default()
    }
}

fn sync(config: RunConfig, bucket: &mut Bucket) -> RunStats {
    SyncEngine::new(config).unwrap().run(bucket).unwrap()
}

/// What the bucket should hold for the tree as it is on disk.
fn expected_objects(tree: &TestTree) -> BTreeMap<String, String> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<String, String>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                let rel = path.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/");
                out.insert(format!("{PREFIX}/{rel}"), fs::read_to_string(&path).unwrap());
            }
        }
    }

    let mut out = BTreeMap::new();
    walk(tree.root(), tree.root(), &mut out);
    out
}

fn assert_mirrored(tree: &TestTree, bucket: &Bucket) {
    assert_eq!(bucket.objects, expected_objects(tree));
}

fn open_store(tree: &TestTree) -> FileStore {
    FileStore::open(StatePath::Database.in_dir(tree.state_dir())).unwrap()
}

// =============================================================================
// Lifecycle
// =============================================================================

mod lifecycle {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tree_changes_are_mirrored_run_after_run() {
        let tree = TestTree::new();
        tree.write("index.html", "<h1>v1</h1>");
        tree.write("img/logo.png", "png");
        tree.write("img/old.gif", "gif");
        let mut bucket = Bucket::default();

        let first = sync(config(&tree), &mut bucket);
        assert_eq!((first.added, first.uploaded), (3, 3));
        assert_mirrored(&tree, &bucket);

        tree.write("index.html", "<h1>v2</h1>");
        tree.bump_mtime("index.html", 5);
        tree.write("css/site.css", "body {}");
        tree.remove("img/old.gif");

        let second = sync(config(&tree), &mut bucket);
        assert_eq!(second.total, 3);
        assert_eq!(second.added, 1);
        assert_eq!(second.modified, 1);
        assert_eq!(second.uploaded, 2);
        assert_eq!(second.deleted, 1);
        assert_mirrored(&tree, &bucket);

        let calls = bucket.calls;
        let third = sync(config(&tree), &mut bucket);
        assert_eq!(third.uploaded + third.deleted, 0);
        assert_eq!(bucket.calls, calls);
    }

    #[test]
    fn removed_then_recreated_file_is_uploaded_again() {
        let tree = TestTree::new();
        tree.write("report.csv", "a,b");
        let mut bucket = Bucket::default();
        sync(config(&tree), &mut bucket);

        tree.remove("report.csv");
        let stats = sync(config(&tree), &mut bucket);
        assert_eq!(stats.deleted, 1);
        assert!(bucket.objects.is_empty());

        tree.write("report.csv", "a,b,c");
        let stats = sync(config(&tree), &mut bucket);
        assert_eq!(stats.added, 1);
        assert_eq!(stats.uploaded, 1);
        assert_mirrored(&tree, &bucket);

        let record = open_store(&tree).get(&tree.key("report.csv")).unwrap().unwrap();
        assert_eq!(record.status, FileStatus::Added);
        assert!(record.synced);
    }

    #[test]
    fn removed_record_is_deleted_only_once() {
        let tree = TestTree::new();
        tree.write("a", "a");
        tree.write("b", "b");
        let mut bucket = Bucket::default();
        sync(config(&tree), &mut bucket);

        tree.remove("b");
        assert_eq!(sync(config(&tree), &mut bucket).deleted, 1);
        assert_eq!(sync(config(&tree), &mut bucket).deleted, 0);

        let store = open_store(&tree);
        assert_eq!(store.count(FileStatus::Removed).unwrap(), 1);
        assert!(store.pending_deletes(0, 10).unwrap().is_empty());
    }
}

// =============================================================================
// Failures and backlog
// =============================================================================

mod recovery {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn outage_leaves_everything_pending() {
        let tree = TestTree::new();
        tree.write("a.txt", "a");
        tree.write("b.txt", "b");
        let mut bucket = Bucket {
            down: true,
            ..Default::default()
        };

        let stats = sync(config(&tree), &mut bucket);
        assert_eq!(stats.uploaded, 0);
        assert_eq!(stats.errors, 2);
        assert_eq!(stats.transfer_errors, 2);

        let store = open_store(&tree);
        let pending = store.pending_uploads(0, 10).unwrap();
        assert_eq!(pending.len(), 2);
        assert!(
            pending
                .iter()
                .all(|r| !r.synced && r.sync_status == Some(SyncStatus::Failed))
        );
        drop(store);

        bucket.down = false;
        let stats = sync(config(&tree), &mut bucket);
        assert_eq!(stats.added, 0);
        assert_eq!(stats.uploaded, 2);
        assert_mirrored(&tree, &bucket);
    }

    #[test]
    fn failed_delete_is_retried() {
        let tree = TestTree::new();
        tree.write("keep", "k");
        tree.write("drop", "d");
        let mut bucket = Bucket::default();
        sync(config(&tree), &mut bucket);

        tree.remove("drop");
        bucket.down = true;
        let stats = sync(config(&tree), &mut bucket);
        assert_eq!((stats.deleted, stats.errors), (0, 1));

        bucket.down = false;
        let stats = sync(config(&tree), &mut bucket);
        assert_eq!(stats.deleted, 1);
        assert_mirrored(&tree, &bucket);
    }

    #[test]
    fn limit_drains_backlog_over_several_runs() {
        let tree = TestTree::new();
        for i in 0..7 {
            tree.write(&format!("f{i}.dat"), &i.to_string());
        }
        let mut bucket = Bucket::default();
        let limited = || RunConfig {
            limit: Some(3),
            ..config(&tree)
        };

        let uploads: Vec<usize> = (0..4)
            .map(|_| sync(limited(), &mut bucket).uploaded)
            .collect();

        assert_eq!(uploads, vec![3, 3, 1, 0]);
        assert_mirrored(&tree, &bucket);
    }
}

// =============================================================================
// Removal strategies
// =============================================================================

mod strategies {
    use super::*;
    use pretty_assertions::assert_eq;

    fn history(removal: RemovalStrategy) -> (TestTree, Bucket) {
        let tree = TestTree::new();
        let mut bucket = Bucket::default();
        let cfg = |tree: &TestTree| RunConfig {
            removal,
            ..config(tree)
        };

        tree.write("docs/a.md", "a");
        tree.write("docs/b.md", "b");
        tree.write("c.md", "c");
        sync(cfg(&tree), &mut bucket);

        tree.remove("docs/b.md");
        tree.write("d.md", "d");
        sync(cfg(&tree), &mut bucket);

        tree.remove("c.md");
        tree.write("docs/a.md", "a2");
        tree.bump_mtime("docs/a.md", 5);
        sync(cfg(&tree), &mut bucket);

        (tree, bucket)
    }

    #[test]
    fn sweep_mirrors_history() {
        let (tree, bucket) = history(RemovalStrategy::Sweep);
        assert_mirrored(&tree, &bucket);
    }

    #[test]
    fn markers_mirror_history() {
        let (tree, bucket) = history(RemovalStrategy::Markers);
        assert_mirrored(&tree, &bucket);
        assert!(tree.state_dir().join(StatePath::OldMarker.as_str()).exists());
    }

    #[test]
    fn strategies_agree() {
        let (_, sweep) = history(RemovalStrategy::Sweep);
        let (_, markers) = history(RemovalStrategy::Markers);
        assert_eq!(sweep.objects, markers.objects);
    }
}
