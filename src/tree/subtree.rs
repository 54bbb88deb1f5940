//! Self-contained subtree fragments used to undo deletes and merges.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{Node, NodeId, NodeKind, OriginalState, Tree};
use crate::errors::TreeError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtreeFragment {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub atomic: bool,
    #[serde(default)]
    pub original: Option<OriginalState>,
    #[serde(default)]
    pub children: Vec<SubtreeFragment>,
}

impl SubtreeFragment {
    /// Every id in the fragment, root first.
    pub fn ids(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut pending = vec![self];
        while let Some(frag) = pending.pop() {
            out.push(frag.id.clone());
            pending.extend(frag.children.iter().rev());
        }
        out
    }
}

impl Tree {
    pub fn serialize_subtree(&self, id: &str) -> Result<SubtreeFragment, TreeError> {
        let node = self.node(id)?;
        let children = node
            .children
            .iter()
            .map(|c| self.serialize_subtree(c))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SubtreeFragment {
            id: node.id.clone(),
            name: node.name.clone(),
            kind: node.kind,
            atomic: node.atomic,
            original: node.original.clone(),
            children,
        })
    }

    /// Re-attach a fragment as the last child of `parent_id`.
    pub fn restore_subtree(&mut self, parent_id: &str, fragment: SubtreeFragment) -> Result<NodeId, TreeError> {
        self.restore_subtree_at(parent_id, fragment, None)
    }

    /// Re-attach a fragment at `index` among `parent_id`'s children (clamped).
    /// The fragment keeps its ids and original-state fields; its top-level name
    /// is suffixed if a sibling took it in the meantime.
    pub fn restore_subtree_at(
        &mut self,
        parent_id: &str,
        mut fragment: SubtreeFragment,
        index: Option<usize>,
    ) -> Result<NodeId, TreeError> {
        self.require_container(parent_id)?;

        let mut seen = BTreeSet::new();
        for id in fragment.ids() {
            if self.nodes.contains_key(&id) || !seen.insert(id.clone()) {
                return Err(TreeError::IdAlreadyExists(id));
            }
        }

        fragment.name = self.unique_child_name(parent_id, &fragment.name, None);
        let root_id = fragment.id.clone();
        self.insert_fragment(fragment, parent_id);

        let parent = self.node_mut(parent_id)?;
        match index {
            Some(i) => {
                let at = i.min(parent.children.len());
                parent.children.insert(at, root_id.clone());
            }
            None => parent.children.push(root_id.clone()),
        }
        Ok(root_id)
    }

    fn insert_fragment(&mut self, fragment: SubtreeFragment, parent_id: &str) {
        let SubtreeFragment {
            id,
            name,
            kind,
            atomic,
            original,
            children,
        } = fragment;
        if original.is_none() {
            self.bump_local_counter(&id);
        }
        self.nodes.insert(
            id.clone(),
            Node {
                id: id.clone(),
                name,
                kind,
                parent_id: Some(parent_id.to_string()),
                children: children.iter().map(|c| c.id.clone()).collect(),
                atomic,
                original,
            },
        );
        for child in children {
            self.insert_fragment(child, &id);
        }
    }
}
