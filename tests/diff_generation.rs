use reorg::diff::{Operation, diff_ops, generate_diff};
use reorg::snapshot::{Snapshot, SnapshotNode};
use reorg::tree::{NewNode, NodeKind, Tree};

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
            SnapshotNode::file("pkg", "package.json"),
        ],
    );
    Tree::build(&Snapshot::new("/work/Projects", tree)).unwrap()
}

#[test]
fn create_move_rename_yields_three_ordered_ops() {
    let mut tree = projects();
    let folder = tree.create("root", NewNode::folder("new_folder")).unwrap();
    tree.move_node("index", &folder).unwrap();
    tree.rename("index", "index-renamed.ts").unwrap();

    let diff = generate_diff(&tree);
    assert_eq!(diff.base_root, std::path::PathBuf::from("/work/Projects"));
    assert_eq!(
        diff.ops,
        vec![
            Operation::Create {
                parent_path: "Projects".into(),
                name: "new_folder".into(),
                kind: NodeKind::Folder,
            },
            Operation::Move {
                id: "index".into(),
                kind: NodeKind::File,
                from_path: "Projects/src/index.ts".into(),
                to_parent_path: "Projects/new_folder".into(),
                to_name: None,
            },
            Operation::Rename {
                id: "index".into(),
                kind: NodeKind::File,
                from_path: "Projects/src/index.ts".into(),
                to_path: "Projects/new_folder/index-renamed.ts".into(),
                from_name: "index.ts".into(),
                to_name: "index-renamed.ts".into(),
            },
        ]
    );
}

#[test]
fn unchanged_tree_has_no_ops() {
    let tree = projects();
    assert!(generate_diff(&tree).is_empty());
}

#[test]
fn regenerating_is_deterministic() {
    let mut tree = projects();
    let a = tree.create("root", NewNode::folder("a")).unwrap();
    tree.create(&a, NewNode::file("z.txt")).unwrap();
    tree.create(&a, NewNode::file("b.txt")).unwrap();
    tree.move_node("app", "docs").unwrap();
    tree.rename("pkg", "package.jsonc").unwrap();
    tree.delete("readme").unwrap();

    let first = generate_diff(&tree);
    let second = generate_diff(&tree);
    assert_eq!(first.ops, second.ops);
    assert_eq!(
        serde_json::to_string(&first.ops).unwrap(),
        serde_json::to_string(&second.ops).unwrap()
    );
    assert_ne!(first.meta.uid, second.meta.uid);
    assert!(first.meta.uid.starts_with("1-"));
    assert!(second.meta.uid.starts_with("2-"));
}

#[test]
fn creates_are_ordered_by_parent_depth_then_name() {
    let mut tree = projects();
    let a = tree.create("root", NewNode::folder("a")).unwrap();
    tree.create(&a, NewNode::folder("b")).unwrap();
    tree.create("root", NewNode::file("c.txt")).unwrap();
    tree.create("src", NewNode::file("0.ts")).unwrap();

    let created: Vec<(String, String)> = diff_ops(&tree)
        .into_iter()
        .filter_map(|op| match op {
            Operation::Create { parent_path, name, .. } => Some((parent_path, name)),
            _ => None,
        })
        .collect();
    assert_eq!(
        created,
        [
            ("Projects".to_string(), "a".to_string()),
            ("Projects".to_string(), "c.txt".to_string()),
            ("Projects/src".to_string(), "0.ts".to_string()),
            ("Projects/a".to_string(), "b".to_string()),
        ]
    );
}

#[test]
fn phases_run_creates_moves_renames_deletes() {
    let mut tree = projects();
    tree.delete("pkg").unwrap();
    tree.rename("readme", "README.md").unwrap();
    tree.move_node("app", "docs").unwrap();
    tree.create("docs", NewNode::file("notes.md")).unwrap();

    let kinds: Vec<&str> = diff_ops(&tree).iter().map(|op| op.op_type().verb()).collect();
    assert_eq!(kinds, ["Create", "Move", "Rename", "Delete"]);
}

#[test]
fn nested_deletes_collapse_into_the_outermost() {
    let mut tree = projects();
    tree.delete("index").unwrap();
    tree.delete("src").unwrap();
    assert_eq!(
        diff_ops(&tree),
        vec![Operation::Delete {
            id: "src".into(),
            kind: NodeKind::Folder,
            at_path: "Projects/src".into(),
            recursive: true,
        }]
    );
}

#[test]
fn deletes_run_deepest_first() {
    let mut tree = projects();
    tree.delete("pkg").unwrap();
    tree.delete("readme").unwrap();
    let paths: Vec<String> = diff_ops(&tree)
        .into_iter()
        .map(|op| op.anchor_path().to_string())
        .collect();
    assert_eq!(paths, ["Projects/docs/readme.md", "Projects/package.json"]);
}

#[test]
fn deletes_are_ordered_by_as_loaded_depth() {
    // R/{p/{x}, q/{r/{y}}, s/{t/}}; p moves under s/t, so x ends up deeper than y.
    let snap = Snapshot::new(
        "/w/R",
        SnapshotNode::folder(
            "root",
            "R",
            vec![
                SnapshotNode::folder("p", "p", vec![SnapshotNode::file("x", "x")]),
                SnapshotNode::folder(
                    "q",
                    "q",
                    vec![SnapshotNode::folder("r", "r", vec![SnapshotNode::file("y", "y")])],
                ),
                SnapshotNode::folder("s", "s", vec![SnapshotNode::folder("t", "t", vec![])]),
            ],
        ),
    );
    let mut tree = Tree::build(&snap).unwrap();
    tree.move_node("p", "t").unwrap();
    tree.delete("x").unwrap();
    tree.delete("y").unwrap();

    let deletes: Vec<String> = diff_ops(&tree)
        .into_iter()
        .filter(|op| matches!(op, Operation::Delete { .. }))
        .map(|op| op.anchor_path().to_string())
        .collect();
    assert_eq!(deletes, ["R/q/r/y", "R/s/t/p/x"]);
}

#[test]
fn emptied_folder_is_deleted_non_recursively() {
    let mut tree = projects();
    tree.move_node("index", "root").unwrap();
    tree.move_node("app", "root").unwrap();
    tree.delete("src").unwrap();
    let last = diff_ops(&tree).pop().unwrap();
    assert_eq!(
        last,
        Operation::Delete {
            id: "src".into(),
            kind: NodeKind::Folder,
            at_path: "Projects/src".into(),
            recursive: false,
        }
    );
}

#[test]
fn move_destinations_use_pre_rename_names() {
    let mut tree = projects();
    tree.rename("docs", "guides").unwrap();
    tree.move_node("index", "docs").unwrap();
    let ops = diff_ops(&tree);
    assert!(ops.contains(&Operation::Move {
        id: "index".into(),
        kind: NodeKind::File,
        from_path: "Projects/src/index.ts".into(),
        to_parent_path: "Projects/docs".into(),
        to_name: None,
    }));
    let renamed = ops.iter().find(|op| matches!(op, Operation::Rename { .. })).unwrap();
    assert_eq!(renamed.anchor_path(), "Projects/docs");
}

#[test]
fn move_source_follows_an_ancestor_moved_earlier() {
    let mut tree = projects();
    let deep = tree.create("docs", NewNode::folder("deep")).unwrap();
    tree.move_node("src", "docs").unwrap();
    tree.move_node("index", &deep).unwrap();

    let moves: Vec<Operation> = diff_ops(&tree)
        .into_iter()
        .filter(|op| matches!(op, Operation::Move { .. }))
        .collect();
    assert_eq!(
        moves,
        vec![
            Operation::Move {
                id: "src".into(),
                kind: NodeKind::Folder,
                from_path: "Projects/src".into(),
                to_parent_path: "Projects/docs".into(),
                to_name: None,
            },
            Operation::Move {
                id: "index".into(),
                kind: NodeKind::File,
                from_path: "Projects/docs/src/index.ts".into(),
                to_parent_path: "Projects/docs/deep".into(),
                to_name: None,
            },
        ]
    );
}

#[test]
fn delete_paths_follow_a_renamed_parent() {
    let mut tree = projects();
    tree.rename("docs", "guides").unwrap();
    tree.delete("readme").unwrap();
    let ops = diff_ops(&tree);
    assert_eq!(ops.last().unwrap().anchor_path(), "Projects/guides/readme.md");
}

#[test]
fn wire_format_is_tagged_camel_case() {
    let mut tree = projects();
    tree.move_node("index", "docs").unwrap();
    let diff = generate_diff(&tree);
    let json = serde_json::to_value(&diff).unwrap();
    assert_eq!(json["baseRoot"], "/work/Projects");
    assert!(json["meta"]["createdAt"].is_string());
    let op = &json["ops"][0];
    assert_eq!(op["type"], "move");
    assert_eq!(op["kind"], "file");
    assert_eq!(op["fromPath"], "Projects/src/index.ts");
    assert_eq!(op["toParentPath"], "Projects/docs");

    let back: reorg::diff::Diff = serde_json::from_value(json).unwrap();
    assert_eq!(back, diff);
}

#[test]
fn suffixed_move_lands_under_its_final_name() {
    let mut tree = projects();
    tree.create("docs", NewNode::file("index.ts")).unwrap();
    tree.move_node("index", "docs").unwrap();

    let ops = diff_ops(&tree);
    assert_eq!(
        ops,
        vec![
            Operation::Create {
                parent_path: "Projects/docs".into(),
                name: "index.ts".into(),
                kind: NodeKind::File,
            },
            Operation::Move {
                id: "index".into(),
                kind: NodeKind::File,
                from_path: "Projects/src/index.ts".into(),
                to_parent_path: "Projects/docs".into(),
                to_name: Some("index-1.ts".into()),
            },
        ]
    );
    assert_eq!(ops[1].move_destination().unwrap(), "Projects/docs/index-1.ts");
}
