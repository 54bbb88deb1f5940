//! Bounded undo/redo over tree mutations.
//!
//! Each entry is a pair of serializable intents (forward, inverse) that the
//! tree interprets; the stacks hold no references into the tree. Every
//! mutation runs against a clone that replaces the live tree only on success.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

use crate::errors::TreeError;
use crate::tree::{MoveOutcome, NewNode, NodeId, NodeKind, SubtreeFragment, Tree};

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// A replayable tree mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Intent {
    Create {
        parent_id: NodeId,
        id: NodeId,
        name: String,
        kind: NodeKind,
    },
    Rename {
        id: NodeId,
        name: String,
    },
    Move {
        id: NodeId,
        target_parent_id: NodeId,
    },
    Delete {
        id: NodeId,
    },
    /// Re-attach a serialized subtree under `parent_id`.
    Restore {
        parent_id: NodeId,
        index: Option<usize>,
        fragment: SubtreeFragment,
    },
    /// Remove each listed node that is still present, with its subtree.
    Detach {
        ids: Vec<NodeId>,
    },
    Sequence {
        steps: Vec<Intent>,
    },
}

impl Tree {
    /// Interpret one intent. A failing `Sequence` may leave earlier steps
    /// applied; `History` only ever calls this on a throwaway clone.
    pub fn apply_intent(&mut self, intent: &Intent) -> Result<(), TreeError> {
        match intent {
            Intent::Create {
                parent_id,
                id,
                name,
                kind,
            } => {
                let new = NewNode {
                    name: name.clone(),
                    kind: *kind,
                    id: Some(id.clone()),
                };
                self.create(parent_id, new).map(drop)
            }
            Intent::Rename { id, name } => self.rename(id, name).map(drop),
            Intent::Move {
                id,
                target_parent_id,
            } => self.move_node(id, target_parent_id).map(drop),
            Intent::Delete { id } => self.delete(id).map(drop),
            Intent::Restore {
                parent_id,
                index,
                fragment,
            } => self
                .restore_subtree_at(parent_id, fragment.clone(), *index)
                .map(drop),
            Intent::Detach { ids } => {
                for id in ids {
                    if self.contains(id) {
                        self.remove_subtree(id);
                    }
                }
                Ok(())
            }
            Intent::Sequence { steps } => steps.iter().try_for_each(|s| self.apply_intent(s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub label: String,
    pub forward: Intent,
    pub inverse: Intent,
}

#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<HistoryEntry>,
    redo: Vec<HistoryEntry>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    /// `limit` caps the undo stack; the oldest entries fall off first.
    /// A limit of zero records nothing.
    pub fn new(limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Undo entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.undo.iter()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    /// Push a new entry. Clears the redo stack.
    pub fn record(&mut self, entry: HistoryEntry) {
        self.redo.clear();
        if self.limit == 0 {
            return;
        }
        while self.undo.len() >= self.limit {
            self.undo.pop_front();
        }
        debug!(label = %entry.label, depth = self.undo.len() + 1, "history record");
        self.undo.push_back(entry);
    }

    pub fn create(&mut self, tree: &mut Tree, parent_id: &str, new: NewNode) -> Result<NodeId, TreeError> {
        let mut next = tree.clone();
        let id = next.create(parent_id, new)?;
        let node = next.node(&id)?;
        let entry = HistoryEntry {
            label: format!("create {}", node.name),
            forward: Intent::Create {
                parent_id: parent_id.to_string(),
                id: id.clone(),
                name: node.name.clone(),
                kind: node.kind,
            },
            inverse: Intent::Delete { id: id.clone() },
        };
        *tree = next;
        self.record(entry);
        Ok(id)
    }

    pub fn rename(&mut self, tree: &mut Tree, id: &str, desired: &str) -> Result<String, TreeError> {
        let old = tree.node(id)?.name.clone();
        let mut next = tree.clone();
        let name = next.rename(id, desired)?;
        if name == old {
            return Ok(name);
        }
        let entry = HistoryEntry {
            label: format!("rename {old} -> {name}"),
            forward: Intent::Rename {
                id: id.to_string(),
                name: name.clone(),
            },
            inverse: Intent::Rename {
                id: id.to_string(),
                name: old,
            },
        };
        *tree = next;
        self.record(entry);
        Ok(name)
    }

    pub fn move_node(&mut self, tree: &mut Tree, id: &str, target_parent_id: &str) -> Result<MoveOutcome, TreeError> {
        let node = tree.node(id)?;
        let old_name = node.name.clone();
        let old_parent = node.parent_id.clone();

        let mut next = tree.clone();
        let outcome = next.move_node(id, target_parent_id)?;
        let Some(old_parent) = old_parent else {
            return Ok(outcome);
        };

        if outcome == MoveOutcome::Unchanged {
            return Ok(outcome);
        }
        // Pull the node (or, after a merge, its scattered descendants) out and
        // re-attach the pre-move subtree at its old index, bypassing conflict rules.
        let fragment = tree.serialize_subtree(id)?;
        let index = tree
            .node(&old_parent)?
            .children
            .iter()
            .position(|c| c == id);
        let inverse = Intent::Sequence {
            steps: vec![
                Intent::Detach { ids: fragment.ids() },
                Intent::Restore {
                    parent_id: old_parent,
                    index,
                    fragment,
                },
            ],
        };

        let entry = HistoryEntry {
            label: format!("move {old_name}"),
            forward: Intent::Move {
                id: id.to_string(),
                target_parent_id: target_parent_id.to_string(),
            },
            inverse,
        };
        *tree = next;
        self.record(entry);
        Ok(outcome)
    }

    pub fn delete(&mut self, tree: &mut Tree, id: &str) -> Result<SubtreeFragment, TreeError> {
        let parent_id = tree.node(id)?.parent_id.clone();
        let mut next = tree.clone();
        let fragment = next.delete(id)?;
        // delete() already rejected the root, so the parent exists.
        let Some(parent_id) = parent_id else {
            return Err(TreeError::CannotDeleteRoot);
        };
        let index = tree
            .node(&parent_id)?
            .children
            .iter()
            .position(|c| c == id);

        let entry = HistoryEntry {
            label: format!("delete {}", fragment.name),
            forward: Intent::Delete { id: id.to_string() },
            inverse: Intent::Restore {
                parent_id,
                index,
                fragment: fragment.clone(),
            },
        };
        *tree = next;
        self.record(entry);
        Ok(fragment)
    }

    /// Revert the latest entry. Returns `false` when there is nothing to undo.
    /// On failure the tree and both stacks are left as they were.
    pub fn undo(&mut self, tree: &mut Tree) -> Result<bool, TreeError> {
        let Some(entry) = self.undo.pop_back() else {
            return Ok(false);
        };
        let mut next = tree.clone();
        if let Err(e) = next.apply_intent(&entry.inverse) {
            self.undo.push_back(entry);
            return Err(e);
        }
        debug!(label = %entry.label, "undo");
        *tree = next;
        self.redo.push(entry);
        Ok(true)
    }

    /// Re-apply the latest undone entry. Returns `false` when there is nothing to redo.
    pub fn redo(&mut self, tree: &mut Tree) -> Result<bool, TreeError> {
        let Some(entry) = self.redo.pop() else {
            return Ok(false);
        };
        let mut next = tree.clone();
        if let Err(e) = next.apply_intent(&entry.forward) {
            self.redo.push(entry);
            return Err(e);
        }
        debug!(label = %entry.label, "redo");
        *tree = next;
        if self.limit > 0 {
            while self.undo.len() >= self.limit {
                self.undo.pop_front();
            }
            self.undo.push_back(entry);
        }
        Ok(true)
    }
}
