//! Create / rename / move / delete.
//!
//! Conflict policy:
//! - create folder: suffix (`name-1`, `name-2`, ...)
//! - create file: reject with `NameAlreadyExists`
//! - rename: suffix, ignoring the node itself
//! - move: folder onto same-named folder merges (recursively, when enabled);
//!   every other collision suffixes the moved node

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{Node, NodeId, NodeKind, SubtreeFragment, Tree};
use crate::errors::TreeError;
use crate::path_utils::{ensure_valid_name, with_numeric_suffix};

/// Request for `Tree::create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNode {
    pub name: String,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
}

impl NewNode {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::File,
            id: None,
        }
    }

    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Folder,
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.id = Some(id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum MoveOutcome {
    /// Already a child of the target; nothing changed.
    Unchanged,
    /// Re-parented, possibly under a suffixed name.
    Moved { name: String },
    /// Children were folded into an existing folder and the moved node removed.
    Merged { into: NodeId },
}

impl Tree {
    /// Target of a create/move/restore: must exist, be a folder, and not be atomic.
    pub(crate) fn require_container(&self, id: &str) -> Result<&Node, TreeError> {
        let node = self.node(id)?;
        if !node.is_folder() {
            return Err(TreeError::TargetNotAFolder(id.to_string()));
        }
        if node.atomic {
            return Err(TreeError::AtomicFolder(id.to_string()));
        }
        Ok(node)
    }

    pub(crate) fn child_named(&self, parent_id: &str, name: &str, exclude: Option<&str>) -> Option<&Node> {
        let parent = self.nodes.get(parent_id)?;
        parent
            .children
            .iter()
            .filter(|c| Some(c.as_str()) != exclude)
            .filter_map(|c| self.nodes.get(c))
            .find(|c| c.name == name)
    }

    /// First of `desired`, `desired-1`, `desired-2`, ... free under `parent_id`.
    pub(crate) fn unique_child_name(&self, parent_id: &str, desired: &str, exclude: Option<&str>) -> String {
        if self.child_named(parent_id, desired, exclude).is_none() {
            return desired.to_string();
        }
        let mut n = 1u64;
        loop {
            let candidate = with_numeric_suffix(desired, n);
            if self.child_named(parent_id, &candidate, exclude).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    /// True when `candidate` is `id` or lies beneath it.
    pub(crate) fn is_self_or_descendant(&self, candidate: &str, id: &str) -> bool {
        let mut cursor = Some(candidate);
        let mut guard = self.nodes.len() + 1;
        while let Some(current) = cursor {
            if current == id {
                return true;
            }
            guard -= 1;
            if guard == 0 {
                break;
            }
            cursor = self.nodes.get(current).and_then(|n| n.parent_id.as_deref());
        }
        false
    }

    /// Add a node under `parent_id`. Returns the new node's id.
    pub fn create(&mut self, parent_id: &str, new: NewNode) -> Result<NodeId, TreeError> {
        self.require_container(parent_id)?;
        ensure_valid_name(&new.name, &self.policy.names)?;

        let name = match new.kind {
            NodeKind::Folder => self.unique_child_name(parent_id, &new.name, None),
            NodeKind::File => {
                if self.child_named(parent_id, &new.name, None).is_some() {
                    return Err(TreeError::NameAlreadyExists {
                        name: new.name,
                        parent: parent_id.to_string(),
                    });
                }
                new.name
            }
        };

        let id = match new.id {
            Some(id) => {
                if self.nodes.contains_key(&id) {
                    return Err(TreeError::IdAlreadyExists(id));
                }
                self.bump_local_counter(&id);
                id
            }
            None => self.allocate_local_id(),
        };

        trace!(%id, %name, kind = %new.kind, parent = parent_id, "create");
        self.nodes.insert(
            id.clone(),
            Node {
                id: id.clone(),
                name,
                kind: new.kind,
                parent_id: Some(parent_id.to_string()),
                children: Vec::new(),
                atomic: false,
                original: None,
            },
        );
        self.node_mut(parent_id)?.children.push(id.clone());
        Ok(id)
    }

    /// Rename a node. Returns the name actually assigned (suffixed on conflict).
    /// The root keeps its name.
    pub fn rename(&mut self, id: &str, desired: &str) -> Result<String, TreeError> {
        let node = self.node(id)?;
        ensure_valid_name(desired, &self.policy.names)?;

        let Some(parent_id) = node.parent_id.clone() else {
            return Ok(node.name.clone());
        };
        if node.name == desired {
            return Ok(node.name.clone());
        }

        let name = self.unique_child_name(&parent_id, desired, Some(id));
        trace!(%id, %name, "rename");
        self.node_mut(id)?.name = name.clone();
        Ok(name)
    }

    /// Re-parent `id` under `target_parent_id`.
    pub fn move_node(&mut self, id: &str, target_parent_id: &str) -> Result<MoveOutcome, TreeError> {
        let node = self.node(id)?;
        self.node(target_parent_id)?;
        let Some(current_parent) = node.parent_id.clone() else {
            return Err(TreeError::CannotMoveRoot);
        };
        // Cycle check before the folder check: it covers file targets inside
        // the moved subtree too.
        if self.is_self_or_descendant(target_parent_id, id) {
            return Err(TreeError::CannotMoveIntoDescendant {
                id: id.to_string(),
                target: target_parent_id.to_string(),
            });
        }
        self.require_container(target_parent_id)?;

        if current_parent == target_parent_id {
            return Ok(MoveOutcome::Unchanged);
        }
        Ok(self.move_validated(id, target_parent_id))
    }

    /// Move after all structural checks passed. Cannot fail.
    fn move_validated(&mut self, id: &str, target_parent_id: &str) -> MoveOutcome {
        let Some(node) = self.nodes.get(id) else {
            return MoveOutcome::Unchanged;
        };
        let name = node.name.clone();
        let mergeable = self.policy.merge_folders && node.is_container();

        if let Some(existing) = self.child_named(target_parent_id, &name, Some(id)) {
            if mergeable && existing.is_container() {
                let into = existing.id.clone();
                let children = node.children.clone();
                trace!(%id, %into, count = children.len(), "merge");
                for child in children {
                    self.move_validated(&child, &into);
                }
                self.remove_subtree(id);
                return MoveOutcome::Merged { into };
            }
        }

        let name = self.unique_child_name(target_parent_id, &name, Some(id));
        self.detach(id);
        if let Some(node) = self.nodes.get_mut(id) {
            node.name = name.clone();
            node.parent_id = Some(target_parent_id.to_string());
        }
        if let Some(target) = self.nodes.get_mut(target_parent_id) {
            target.children.push(id.to_string());
        }
        trace!(%id, %name, target = target_parent_id, "move");
        MoveOutcome::Moved { name }
    }

    /// Remove `id` and its whole subtree. Returns the removed fragment.
    pub fn delete(&mut self, id: &str) -> Result<SubtreeFragment, TreeError> {
        if self.node(id)?.parent_id.is_none() {
            return Err(TreeError::CannotDeleteRoot);
        }
        let fragment = self.serialize_subtree(id)?;
        self.remove_subtree(id);
        trace!(%id, "delete");
        Ok(fragment)
    }

    /// Unlink `id` from its parent's child list.
    pub(crate) fn detach(&mut self, id: &str) {
        let parent = self.nodes.get(id).and_then(|n| n.parent_id.clone());
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|c| c != id);
        }
    }

    pub(crate) fn remove_subtree(&mut self, id: &str) {
        self.detach(id);
        let mut pending = vec![id.to_string()];
        while let Some(current) = pending.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                pending.extend(node.children);
            }
        }
    }
}
