//! Edit scripts: path-addressed tree edits read from JSON.
//!
//! ```json
//! [
//!   { "op": "create", "parent": "Projects", "name": "new_folder", "kind": "folder" },
//!   { "op": "move", "path": "Projects/src/index.ts", "to": "Projects/new_folder" },
//!   { "op": "rename", "path": "Projects/new_folder/index.ts", "name": "index-renamed.ts" },
//!   { "op": "delete", "path": "Projects/docs" },
//!   { "op": "undo" }
//! ]
//! ```
//!
//! Paths resolve against the live tree at the moment each edit runs, so an
//! edit addresses nodes by where earlier edits left them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::errors::EditError;
use crate::fs_ops::io_error_with_help;
use crate::history::History;
use crate::tree::{NewNode, NodeId, NodeKind, Tree};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Edit {
    Create {
        parent: String,
        name: String,
        #[serde(default = "default_kind")]
        kind: NodeKind,
    },
    Rename {
        path: String,
        name: String,
    },
    Move {
        path: String,
        to: String,
    },
    Delete {
        path: String,
    },
    Undo,
    Redo,
}

fn default_kind() -> NodeKind {
    NodeKind::File
}

pub fn parse_edits(json: &str) -> Result<Vec<Edit>> {
    serde_json::from_str(json).context("parse edit script")
}

pub fn load_edits(path: &Path) -> Result<Vec<Edit>> {
    let text = fs::read_to_string(path).map_err(io_error_with_help("read edit script", path))?;
    parse_edits(&text).with_context(|| format!("in {}", path.display()))
}

fn resolve(tree: &Tree, index: usize, path: &str) -> Result<NodeId, EditError> {
    tree.find_by_path(path)
        .map(|n| n.id.clone())
        .ok_or_else(|| EditError::PathNotFound {
            index,
            path: path.to_string(),
        })
}

/// Apply `edits` in order through `history`. Stops at the first failing
/// edit; the edits before it stay applied (and undoable).
pub fn apply_edits(tree: &mut Tree, history: &mut History, edits: &[Edit]) -> Result<(), EditError> {
    for (index, edit) in edits.iter().enumerate() {
        let wrap = |source| EditError::Tree { index, source };
        debug!(index, ?edit, "edit");
        match edit {
            Edit::Create { parent, name, kind } => {
                let parent_id = resolve(tree, index, parent)?;
                let new = NewNode {
                    name: name.clone(),
                    kind: *kind,
                    id: None,
                };
                history.create(tree, &parent_id, new).map_err(wrap)?;
            }
            Edit::Rename { path, name } => {
                let id = resolve(tree, index, path)?;
                history.rename(tree, &id, name).map_err(wrap)?;
            }
            Edit::Move { path, to } => {
                let id = resolve(tree, index, path)?;
                let target = resolve(tree, index, to)?;
                history.move_node(tree, &id, &target).map_err(wrap)?;
            }
            Edit::Delete { path } => {
                let id = resolve(tree, index, path)?;
                history.delete(tree, &id).map_err(wrap)?;
            }
            Edit::Undo => {
                if !history.undo(tree).map_err(wrap)? {
                    return Err(EditError::EmptyHistory { index, action: "undo" });
                }
            }
            Edit::Redo => {
                if !history.redo(tree).map_err(wrap)? {
                    return Err(EditError::EmptyHistory { index, action: "redo" });
                }
            }
        }
    }
    Ok(())
}
