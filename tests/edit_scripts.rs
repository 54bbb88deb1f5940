use reorg::diff::{Operation, diff_ops};
use reorg::edits::{Edit, apply_edits, load_edits, parse_edits};
use reorg::errors::{EditError, TreeError};
use reorg::history::History;
use reorg::snapshot::{Snapshot, SnapshotNode};
use reorg::tree::Tree;

fn projects() -> Tree {
    let tree = SnapshotNode::folder(
        "root",
        "Projects",
        vec![
            SnapshotNode::folder("docs", "docs", vec![SnapshotNode::file("readme", "readme.md")]),
            SnapshotNode::folder(
                "src",
                "src",
                vec![SnapshotNode::file("index", "index.ts"), SnapshotNode::file("app", "App.tsx")],
            ),
        ],
    );
    Tree::build(&Snapshot::new("/work/Projects", tree)).unwrap()
}

#[test]
fn paths_resolve_against_the_live_tree() {
    let edits = parse_edits(
        r#"[
            { "op": "create", "parent": "Projects", "name": "new_folder", "kind": "folder" },
            { "op": "move", "path": "Projects/src/index.ts", "to": "Projects/new_folder" },
            { "op": "rename", "path": "Projects/new_folder/index.ts", "name": "index-renamed.ts" }
        ]"#,
    )
    .unwrap();
    let mut tree = projects();
    let mut history = History::default();
    apply_edits(&mut tree, &mut history, &edits).unwrap();

    let ops = diff_ops(&tree);
    assert_eq!(ops.len(), 3);
    assert!(matches!(&ops[0], Operation::Create { name, .. } if name == "new_folder"));
    assert_eq!(history.undo_len(), 3);
}

#[test]
fn undo_and_redo_edits_drive_history() {
    let edits = vec![
        Edit::Delete { path: "docs".into() },
        Edit::Undo,
        Edit::Redo,
        Edit::Undo,
    ];
    let mut tree = projects();
    let mut history = History::default();
    apply_edits(&mut tree, &mut history, &edits).unwrap();
    assert!(tree.contains("readme"));
    assert!(history.can_redo());
}

#[test]
fn undo_with_empty_history_is_an_error() {
    let mut tree = projects();
    let mut history = History::default();
    let err = apply_edits(&mut tree, &mut history, &[Edit::Undo]).unwrap_err();
    assert_eq!(err, EditError::EmptyHistory { index: 0, action: "undo" });
    assert_eq!(err.code(), "EMPTY_HISTORY");
}

#[test]
fn failing_edit_reports_its_index_and_keeps_earlier_ones() {
    let edits = vec![
        Edit::Rename {
            path: "Projects/docs".into(),
            name: "guides".into(),
        },
        Edit::Move {
            path: "Projects/src".into(),
            to: "Projects/src/index.ts".into(),
        },
    ];
    let mut tree = projects();
    let mut history = History::default();
    let err = apply_edits(&mut tree, &mut history, &edits).unwrap_err();
    assert!(matches!(
        err,
        EditError::Tree {
            index: 1,
            source: TreeError::CannotMoveIntoDescendant { .. }
        }
    ));
    assert_eq!(tree.path_of("docs").unwrap(), "Projects/guides");
}

#[test]
fn unknown_paths_are_reported() {
    let mut tree = projects();
    let mut history = History::default();
    let err = apply_edits(
        &mut tree,
        &mut history,
        &[Edit::Delete {
            path: "Projects/nowhere".into(),
        }],
    )
    .unwrap_err();
    assert_eq!(
        err,
        EditError::PathNotFound {
            index: 0,
            path: "Projects/nowhere".into()
        }
    );
}

#[test]
fn load_reports_the_file_on_bad_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("edits.json");
    std::fs::write(&path, "{ not json").unwrap();
    let err = load_edits(&path).unwrap_err();
    assert!(format!("{err:#}").contains("edits.json"), "{err:#}");
    assert!(load_edits(&dir.path().join("missing.json")).is_err());
}
