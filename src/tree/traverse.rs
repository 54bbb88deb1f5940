//! Traversal and lookup.

use std::collections::VecDeque;

use super::{Node, Tree};
use crate::errors::TreeError;
use crate::path_utils::segments;

impl Tree {
    /// Pre-order walk from the root: each subtree is visited contiguously,
    /// children in their stored order.
    pub fn depth_first(&self) -> Vec<&Node> {
        self.depth_first_from(&self.root_id).unwrap_or_default()
    }

    pub fn depth_first_from(&self, id: &str) -> Result<Vec<&Node>, TreeError> {
        let mut out = Vec::new();
        let mut stack = vec![self.node(id)?];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev().filter_map(|c| self.nodes.get(c)));
        }
        Ok(out)
    }

    /// Level-order walk from the root.
    pub fn breadth_first(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        let mut queue = VecDeque::from([self.root()]);
        while let Some(node) = queue.pop_front() {
            out.push(node);
            queue.extend(node.children.iter().filter_map(|c| self.nodes.get(c)));
        }
        out
    }

    /// Parent first, root last.
    pub fn ancestors_of(&self, id: &str) -> Result<Vec<&Node>, TreeError> {
        let mut out = Vec::new();
        let mut cursor = self.node(id)?.parent_id.as_deref();
        while let Some(pid) = cursor {
            let parent = self.node(pid)?;
            out.push(parent);
            if out.len() > self.nodes.len() {
                break;
            }
            cursor = parent.parent_id.as_deref();
        }
        Ok(out)
    }

    /// Everything below `id`, pre-order, excluding `id` itself.
    pub fn descendants_of(&self, id: &str) -> Result<Vec<&Node>, TreeError> {
        let mut all = self.depth_first_from(id)?;
        all.remove(0);
        Ok(all)
    }

    pub fn list_children(&self, id: &str) -> Result<Vec<&Node>, TreeError> {
        Ok(self
            .node(id)?
            .children
            .iter()
            .filter_map(|c| self.nodes.get(c))
            .collect())
    }

    /// Root-to-node names joined with `/`, starting with the root's name.
    pub fn path_of(&self, id: &str) -> Result<String, TreeError> {
        let node = self.node(id)?;
        let mut names: Vec<&str> = self
            .ancestors_of(id)?
            .into_iter()
            .map(|n| n.name.as_str())
            .collect();
        names.reverse();
        names.push(&node.name);
        Ok(names.join("/"))
    }

    /// Number of edges between the root and `id`.
    pub fn depth_of(&self, id: &str) -> Result<usize, TreeError> {
        Ok(self.ancestors_of(id)?.len())
    }

    /// Resolve a slash-separated path by child-name matching from the root.
    /// A leading segment equal to the root's name is optional.
    pub fn find_by_path(&self, path: &str) -> Option<&Node> {
        let root = self.root();
        let mut parts = segments(path).peekable();
        if parts.peek() == Some(&root.name.as_str()) {
            parts.next();
        }
        let mut current = root;
        for part in parts {
            current = current
                .children
                .iter()
                .filter_map(|c| self.nodes.get(c))
                .find(|c| c.name == part)?;
        }
        Some(current)
    }
}
