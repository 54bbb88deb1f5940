use assert_fs::TempDir;
use assert_fs::prelude::*;
use serial_test::serial;

use reorg::diff::generate_diff;
use reorg::fs_ops::{ApplyOptions, NoLockProbe, OpStatus, apply};
use reorg::shutdown;
use reorg::snapshot::{ScanConfig, scan_snapshot};
use reorg::tree::Tree;

#[test]
#[serial]
fn flag_is_sticky_until_reset() {
    shutdown::reset();
    assert!(!shutdown::is_requested());
    shutdown::request();
    shutdown::request();
    assert!(shutdown::is_requested());
    shutdown::reset();
    assert!(!shutdown::is_requested());
}

#[test]
#[serial]
fn requested_shutdown_aborts_every_op() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.child("Root");
    root.child("a.txt").write_str("a").unwrap();
    root.child("b.txt").write_str("b").unwrap();

    let snap = scan_snapshot(root.path(), &ScanConfig::default()).unwrap();
    let mut tree = Tree::build(&snap).unwrap();
    for name in ["Root/a.txt", "Root/b.txt"] {
        let id = tree.find_by_path(name).unwrap().id.clone();
        tree.delete(&id).unwrap();
    }
    let diff = generate_diff(&tree);

    shutdown::request();
    let response = apply(
        &diff,
        ApplyOptions::new()
            .with_probe(NoLockProbe)
            .with_cancel(shutdown::is_requested),
    );
    shutdown::reset();

    assert!(response.aborted);
    assert!(!response.ok);
    assert!(response.results.iter().all(|r| r.status == OpStatus::Aborted));
    assert!(root.child("a.txt").path().exists());
    assert!(root.child("b.txt").path().exists());
}
