//! Node records. Nodes reference parents and children by id only; the tree's
//! id map is the single owner.

use serde::{Deserialize, Serialize};
use std::fmt;

pub type NodeId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Folder,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::File => "file",
            NodeKind::Folder => "folder",
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, NodeKind::Folder)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a snapshot node sat when the tree was loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginalState {
    pub name: String,
    pub parent_id: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub parent_id: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Opaque environment folder; its contents are not materialized.
    pub atomic: bool,
    /// `None` for nodes created during the session.
    pub original: Option<OriginalState>,
}

impl Node {
    pub fn originated_from_snapshot(&self) -> bool {
        self.original.is_some()
    }

    pub fn original_name(&self) -> Option<&str> {
        self.original.as_ref().map(|o| o.name.as_str())
    }

    pub fn is_folder(&self) -> bool {
        self.kind.is_folder()
    }

    /// Folders that can receive children.
    pub fn is_container(&self) -> bool {
        self.is_folder() && !self.atomic
    }
}

/// As-loaded record kept for every snapshot node, including ones later deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginalNode {
    pub name: String,
    pub parent_id: Option<NodeId>,
    pub kind: NodeKind,
    pub atomic: bool,
}
