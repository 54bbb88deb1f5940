//! Diff generation.
//!
//! Compares the live tree against its as-loaded state and emits filesystem
//! operations in execution order: creates, moves, renames, deletes.
//!
//! Each op's paths describe the disk layout at the moment that op runs:
//! - creates run first, so `parent_path` uses as-loaded paths of snapshot ancestors;
//! - moves run before any rename, so `to_parent_path` uses original names of
//!   snapshot ancestors along the final parent chain;
//! - renames run after all moves, ancestors before descendants (lexicographic
//!   order of `to_path`), so `to_path` is the final path;
//! - deletes run last, so `at_path` is the surviving parent's final path plus
//!   the deleted node's original name.
//!
//! Output is a pure function of the tree apart from `meta`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::path_utils::{base_name, depth};
use crate::tree::{Node, NodeId, NodeKind, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpType {
    Create,
    Move,
    Rename,
    Delete,
}

impl OpType {
    pub fn verb(&self) -> &'static str {
        match self {
            OpType::Create => "Create",
            OpType::Move => "Move",
            OpType::Rename => "Rename",
            OpType::Delete => "Delete",
        }
    }
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// One filesystem operation. Paths are tree-relative, `/`-separated and start
/// with the snapshot root's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Operation {
    Create {
        parent_path: String,
        name: String,
        kind: NodeKind,
    },
    Move {
        id: NodeId,
        kind: NodeKind,
        from_path: String,
        to_parent_path: String,
        /// Set when the entry has to land under a new name because its old one
        /// is taken at the destination; no separate rename follows.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to_name: Option<String>,
    },
    Rename {
        id: NodeId,
        kind: NodeKind,
        from_path: String,
        to_path: String,
        from_name: String,
        to_name: String,
    },
    Delete {
        id: NodeId,
        kind: NodeKind,
        at_path: String,
        recursive: bool,
    },
}

impl Operation {
    pub fn op_type(&self) -> OpType {
        match self {
            Operation::Create { .. } => OpType::Create,
            Operation::Move { .. } => OpType::Move,
            Operation::Rename { .. } => OpType::Rename,
            Operation::Delete { .. } => OpType::Delete,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Operation::Create { kind, .. }
            | Operation::Move { kind, .. }
            | Operation::Rename { kind, .. }
            | Operation::Delete { kind, .. } => *kind,
        }
    }

    /// The path an op is anchored at: create's parent, otherwise its source.
    pub fn anchor_path(&self) -> &str {
        match self {
            Operation::Create { parent_path, .. } => parent_path,
            Operation::Move { from_path, .. } | Operation::Rename { from_path, .. } => from_path,
            Operation::Delete { at_path, .. } => at_path,
        }
    }

    /// Tree path a move lands at; `None` for other ops.
    pub fn move_destination(&self) -> Option<String> {
        match self {
            Operation::Move { from_path, to_parent_path, to_name, .. } => {
                let name = to_name.as_deref().unwrap_or_else(|| base_name(from_path));
                Some(format!("{to_parent_path}/{name}"))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Create { parent_path, name, kind } => {
                write!(f, "Create {kind} {parent_path}/{name}")
            }
            Operation::Move { kind, from_path, to_parent_path, to_name, .. } => match to_name {
                Some(name) => write!(f, "Move {kind} {from_path} -> {to_parent_path}/{name}"),
                None => write!(f, "Move {kind} {from_path} -> {to_parent_path}/"),
            },
            Operation::Rename { kind, from_path, to_name, .. } => {
                write!(f, "Rename {kind} {from_path} -> {to_name}")
            }
            Operation::Delete { kind, at_path, recursive, .. } => {
                if *recursive {
                    write!(f, "Delete {kind} {at_path} (recursive)")
                } else {
                    write!(f, "Delete {kind} {at_path}")
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffMeta {
    pub created_at: DateTime<Utc>,
    pub uid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diff {
    pub base_root: PathBuf,
    pub ops: Vec<Operation>,
    pub meta: DiffMeta,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Derive a diff from the tree's current state. Never mutates the node graph.
pub fn generate_diff(tree: &Tree) -> Diff {
    let ops = diff_ops(tree);
    let seq = tree.next_diff_sequence();
    Diff {
        base_root: tree.snapshot_root_path.clone(),
        ops,
        meta: DiffMeta {
            created_at: Utc::now(),
            uid: format!("{seq}-{}", Uuid::new_v4()),
        },
    }
}

/// Memoized per-phase path computation.
struct PhasePaths<'t> {
    tree: &'t Tree,
    create_time: HashMap<&'t str, String>,
    move_time: HashMap<&'t str, String>,
    /// Moved nodes that take their final name during the move itself.
    folded: HashMap<&'t str, &'t str>,
}

impl<'t> PhasePaths<'t> {
    fn new(tree: &'t Tree) -> Self {
        let folded = tree
            .nodes
            .values()
            .filter(|node| needs_folded_move(tree, node))
            .map(|node| (node.id.as_str(), node.name.as_str()))
            .collect();
        Self {
            tree,
            create_time: HashMap::new(),
            move_time: HashMap::new(),
            folded,
        }
    }

    fn is_folded(&self, id: &str) -> bool {
        self.folded.contains_key(id)
    }

    /// Where `id` sits on disk while creates run.
    fn create_time(&mut self, id: &'t str) -> String {
        if let Some(p) = self.create_time.get(id) {
            return p.clone();
        }
        let tree = self.tree;
        let path = match (tree.original_paths.get(id), tree.nodes.get(id)) {
            (Some(orig), _) => orig.clone(),
            (None, Some(node)) => match node.parent_id.as_deref() {
                Some(pid) => format!("{}/{}", self.create_time(pid), node.name),
                None => node.name.clone(),
            },
            (None, None) => String::new(),
        };
        self.create_time.insert(id, path.clone());
        path
    }

    /// Where `id` sits on disk while moves run.
    fn move_time(&mut self, id: &'t str) -> String {
        if let Some(p) = self.move_time.get(id) {
            return p.clone();
        }
        let tree = self.tree;
        let path = match tree.nodes.get(id) {
            Some(node) => {
                let name = match self.folded.get(id) {
                    Some(final_name) => *final_name,
                    None => node.original_name().unwrap_or(&node.name),
                };
                match node.parent_id.as_deref() {
                    Some(pid) => format!("{}/{}", self.move_time(pid), name),
                    None => name.to_string(),
                }
            }
            None => String::new(),
        };
        self.move_time.insert(id, path.clone());
        path
    }

    /// Fill in `from_path` for moves in execution order. A move's source is its
    /// as-loaded path, shifted by any ancestor moved earlier in the same phase.
    fn resolve_move_sources(&mut self, moves: Vec<PendingMove<'t>>) -> Vec<Operation> {
        let mut moved: HashMap<&'t str, &'t str> = HashMap::new();
        let mut out = Vec::with_capacity(moves.len());
        for pending in moves {
            let from_path = self.disk_path(pending.id, &moved);
            moved.insert(pending.id, pending.target);
            out.push(Operation::Move {
                id: pending.id.to_string(),
                kind: pending.kind,
                from_path,
                to_parent_path: pending.to_parent_path,
                to_name: self.folded.get(pending.id).map(|n| n.to_string()),
            });
        }
        out
    }

    /// Location of a snapshot node given the moves applied so far.
    fn disk_path(&mut self, id: &'t str, moved: &HashMap<&'t str, &'t str>) -> String {
        let tree = self.tree;
        let mut names: Vec<&str> = Vec::new();
        let mut prefix = None;
        let mut cursor = Some(id);
        let mut guard = tree.original_nodes.len() + 1;
        while let Some(current) = cursor {
            guard = guard.saturating_sub(1);
            if guard == 0 {
                break;
            }
            match tree.original_nodes.get_key_value(current) {
                Some((key, orig)) => {
                    let landed_as = moved
                        .contains_key(key.as_str())
                        .then(|| self.folded.get(key.as_str()).copied())
                        .flatten();
                    names.push(landed_as.unwrap_or(&orig.name));
                    cursor = moved
                        .get(key.as_str())
                        .copied()
                        .or(orig.parent_id.as_deref());
                }
                None => {
                    prefix = Some(self.move_time(current));
                    cursor = None;
                }
            }
        }
        names.reverse();
        let tail = names.join("/");
        match prefix {
            Some(p) if tail.is_empty() => p,
            Some(p) => format!("{p}/{tail}"),
            None => tail,
        }
    }
}

/// A node that is moved and renamed, whose old name is taken at the
/// destination while moves run.
fn needs_folded_move(tree: &Tree, node: &Node) -> bool {
    let (Some(original), Some(parent_id)) = (&node.original, node.parent_id.as_deref()) else {
        return false;
    };
    if original.parent_id.as_deref() == Some(parent_id) || original.name == node.name {
        return false;
    }
    let name = original.name.as_str();
    let Some(parent) = tree.nodes.get(parent_id) else {
        return false;
    };
    let sibling_hit = parent
        .children
        .iter()
        .filter(|c| **c != node.id)
        .filter_map(|c| tree.nodes.get(c))
        .any(|s| s.original_name().unwrap_or(&s.name) == name);
    // Original children deleted or moved away may still sit there.
    let leftover_hit = tree.original_nodes.iter().any(|(id, orig)| {
        *id != node.id
            && orig.parent_id.as_deref() == Some(parent_id)
            && orig.name == name
            && tree
                .nodes
                .get(id)
                .is_none_or(|n| n.parent_id.as_deref() != Some(parent_id))
    });
    sibling_hit || leftover_hit
}

struct PendingMove<'t> {
    id: &'t str,
    kind: NodeKind,
    target: &'t str,
    to_parent_path: String,
}

/// The ordered operation list for `tree`.
pub fn diff_ops(tree: &Tree) -> Vec<Operation> {
    let mut phase = PhasePaths::new(tree);
    let mut creates = Vec::new();
    let mut moves = Vec::new();
    let mut renames = Vec::new();
    let mut deletes = Vec::new();

    for node in tree.nodes.values() {
        let Some(parent_id) = node.parent_id.as_deref() else {
            continue;
        };
        let Some(original) = &node.original else {
            creates.push(Operation::Create {
                parent_path: phase.create_time(parent_id),
                name: node.name.clone(),
                kind: node.kind,
            });
            continue;
        };
        if original.parent_id.as_deref() != Some(parent_id) {
            moves.push(PendingMove {
                id: &node.id,
                kind: node.kind,
                target: parent_id,
                to_parent_path: phase.move_time(parent_id),
            });
        }
        if original.name != node.name && !phase.is_folded(&node.id) {
            renames.push(Operation::Rename {
                id: node.id.clone(),
                kind: node.kind,
                from_path: tree.original_paths.get(&node.id).cloned().unwrap_or_default(),
                to_path: tree.path_of(&node.id).unwrap_or_default(),
                from_name: original.name.clone(),
                to_name: node.name.clone(),
            });
        }
    }

    let mut original_children: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (id, orig) in &tree.original_nodes {
        if let Some(pid) = orig.parent_id.as_deref() {
            original_children.entry(pid).or_default().push(id);
        }
    }

    for (id, orig) in &tree.original_nodes {
        if tree.nodes.contains_key(id) {
            continue;
        }
        // A deleted parent's recursive delete already covers this node.
        let Some(pid) = orig.parent_id.as_deref() else {
            continue;
        };
        if !tree.nodes.contains_key(pid) {
            continue;
        }
        let parent_path = tree.path_of(pid).unwrap_or_default();
        let lost_children = original_children
            .get(id.as_str())
            .is_some_and(|kids| kids.iter().any(|k| !tree.nodes.contains_key(*k)));
        deletes.push(Operation::Delete {
            id: id.clone(),
            kind: orig.kind,
            at_path: format!("{parent_path}/{}", orig.name),
            // Folders whose known contents were all moved out are removed
            // non-recursively so unexpected leftovers fail instead of vanishing.
            recursive: orig.kind.is_folder() && (orig.atomic || lost_children),
        });
    }

    creates.sort_by(|a, b| create_key(a).cmp(&create_key(b)));
    moves.sort_by(|a, b| {
        (depth(&a.to_parent_path), a.id).cmp(&(depth(&b.to_parent_path), b.id))
    });
    let moves = phase.resolve_move_sources(moves);
    renames.sort_by(|a, b| rename_key(a).cmp(rename_key(b)));
    deletes.sort_by(|a, b| {
        original_depth(tree, b)
            .cmp(&original_depth(tree, a))
            .then_with(|| id_of(a).cmp(id_of(b)))
    });

    let mut ops = creates;
    ops.extend(moves);
    ops.extend(renames);
    ops.extend(deletes);
    ops
}

fn id_of(op: &Operation) -> &str {
    match op {
        Operation::Move { id, .. } | Operation::Rename { id, .. } | Operation::Delete { id, .. } => id,
        Operation::Create { .. } => "",
    }
}

fn create_key(op: &Operation) -> (usize, &str, &str) {
    match op {
        Operation::Create { parent_path, name, .. } => (depth(parent_path), name, parent_path),
        _ => (0, "", ""),
    }
}

fn rename_key(op: &Operation) -> &str {
    match op {
        Operation::Rename { to_path, .. } => to_path,
        _ => "",
    }
}

/// Depth of the op's node as loaded from the snapshot.
fn original_depth(tree: &Tree, op: &Operation) -> usize {
    tree.original_paths.get(id_of(op)).map_or(0, |p| depth(p))
}
