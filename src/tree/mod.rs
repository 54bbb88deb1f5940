//! In-memory mirror of a directory tree.
//!
//! The tree owns every node through an id map and records each snapshot
//! node's as-loaded name, parent and path so the diff generator can compare
//! against them later. Mutations validate fully before touching any state.
//!
//! The tree is not meant for concurrent mutation; callers serialize edits and
//! clone the tree before speculative changes.

mod mutate;
mod node;
mod subtree;
mod traverse;

use std::cell::Cell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::errors::TreeError;
use crate::path_utils::NamePolicy;
use crate::snapshot::{Snapshot, SnapshotNode};

pub use mutate::{MoveOutcome, NewNode};
pub use node::{Node, NodeId, NodeKind, OriginalNode, OriginalState};
pub use subtree::SubtreeFragment;

/// Conflict and naming rules for one tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreePolicy {
    pub names: NamePolicy,
    /// Moving a folder onto a same-named folder merges their children.
    pub merge_folders: bool,
}

impl Default for TreePolicy {
    fn default() -> Self {
        Self {
            names: NamePolicy::default(),
            merge_folders: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tree {
    pub(crate) nodes: BTreeMap<NodeId, Node>,
    pub(crate) root_id: NodeId,
    pub(crate) snapshot_root_path: PathBuf,
    pub(crate) original_paths: BTreeMap<NodeId, String>,
    pub(crate) original_nodes: BTreeMap<NodeId, OriginalNode>,
    pub(crate) next_local_id: u64,
    pub(crate) diff_sequence: Cell<u64>,
    pub(crate) policy: TreePolicy,
}

impl Tree {
    /// Build a tree from a snapshot with the default policy.
    pub fn build(snapshot: &Snapshot) -> Result<Self, TreeError> {
        Self::build_with_policy(snapshot, TreePolicy::default())
    }

    pub fn build_with_policy(snapshot: &Snapshot, policy: TreePolicy) -> Result<Self, TreeError> {
        let mut tree = Tree {
            nodes: BTreeMap::new(),
            root_id: snapshot.tree.id.clone(),
            snapshot_root_path: snapshot.root_path.clone(),
            original_paths: BTreeMap::new(),
            original_nodes: BTreeMap::new(),
            next_local_id: 0,
            diff_sequence: Cell::new(0),
            policy,
        };
        tree.insert_loaded(&snapshot.tree, None, "")?;
        Ok(tree)
    }

    fn insert_loaded(
        &mut self,
        snap: &SnapshotNode,
        parent_id: Option<&str>,
        parent_path: &str,
    ) -> Result<(), TreeError> {
        if self.nodes.contains_key(&snap.id) {
            return Err(TreeError::IdAlreadyExists(snap.id.clone()));
        }
        let path = if parent_path.is_empty() {
            snap.name.clone()
        } else {
            format!("{parent_path}/{}", snap.name)
        };
        let parent_id = parent_id.map(str::to_string);

        self.nodes.insert(
            snap.id.clone(),
            Node {
                id: snap.id.clone(),
                name: snap.name.clone(),
                kind: snap.kind,
                parent_id: parent_id.clone(),
                children: snap.children.iter().map(|c| c.id.clone()).collect(),
                atomic: snap.atomic,
                original: Some(OriginalState {
                    name: snap.name.clone(),
                    parent_id: parent_id.clone(),
                }),
            },
        );
        self.original_nodes.insert(
            snap.id.clone(),
            OriginalNode {
                name: snap.name.clone(),
                parent_id,
                kind: snap.kind,
                atomic: snap.atomic,
            },
        );
        self.original_paths.insert(snap.id.clone(), path.clone());

        for child in &snap.children {
            self.insert_loaded(child, Some(&snap.id), &path)?;
        }
        Ok(())
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    pub fn root(&self) -> &Node {
        // The root is inserted at build time and can never be deleted.
        &self.nodes[&self.root_id]
    }

    pub fn snapshot_root_path(&self) -> &Path {
        &self.snapshot_root_path
    }

    pub fn policy(&self) -> &TreePolicy {
        &self.policy
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node(&self, id: &str) -> Result<&Node, TreeError> {
        self.nodes
            .get(id)
            .ok_or_else(|| TreeError::NodeNotFound(id.to_string()))
    }

    pub(crate) fn node_mut(&mut self, id: &str) -> Result<&mut Node, TreeError> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| TreeError::NodeNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// As-loaded path of a snapshot node (`None` for session-created nodes).
    pub fn original_path(&self, id: &str) -> Option<&str> {
        self.original_paths.get(id).map(String::as_str)
    }

    pub(crate) fn next_diff_sequence(&self) -> u64 {
        let n = self.diff_sequence.get() + 1;
        self.diff_sequence.set(n);
        n
    }

    /// Keep generated `local-N` ids clear of any id carrying a numeric suffix.
    pub(crate) fn bump_local_counter(&mut self, id: &str) {
        let digits: String = id
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_digit())
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        if let Ok(n) = digits.parse::<u64>() {
            self.next_local_id = self.next_local_id.max(n);
        }
    }

    pub(crate) fn allocate_local_id(&mut self) -> NodeId {
        loop {
            self.next_local_id += 1;
            let id = format!("local-{}", self.next_local_id);
            if !self.nodes.contains_key(&id) {
                return id;
            }
        }
    }
}
