//! Directory scanning.
//! Walks the tree once (sorted, symlinks not followed), skipping ignored names
//! and collapsing atomic environment folders into single leaf nodes.
//!
//! Unreadable entries are dropped from the snapshot rather than failing the scan.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{debug, trace};
use walkdir::{DirEntry, WalkDir};

use super::{Snapshot, SnapshotNode};

/// Scanner rules. Passed in explicitly; there is no global ignore list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Entry names skipped entirely (files and folders).
    pub ignore: Vec<String>,
    /// A folder directly containing any of these names is kept as one opaque node.
    pub atomic_markers: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            ignore: vec![".git".into(), ".DS_Store".into(), "Thumbs.db".into()],
            atomic_markers: vec!["pyvenv.cfg".into(), "manifest.json".into()],
        }
    }
}

impl ScanConfig {
    fn is_ignored(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        self.ignore.iter().any(|i| *i == name)
    }

    fn is_atomic(&self, dir: &Path) -> bool {
        self.atomic_markers.iter().any(|m| dir.join(m).exists())
    }
}

/// Stable id for a path relative to the scan root (`""` for the root itself).
/// Re-scanning an unchanged tree reproduces the same ids.
pub fn node_id_for(relative: &str) -> String {
    let digest = Sha256::digest(relative.as_bytes());
    format!("n-{}", &hex::encode(digest)[..16])
}

fn relative_key(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Pop the innermost open folder and attach it to its parent.
fn close_top(stack: &mut Vec<SnapshotNode>) {
    if stack.len() < 2 {
        return;
    }
    if let Some(done) = stack.pop()
        && let Some(parent) = stack.last_mut()
    {
        parent.children.push(done);
    }
}

/// Scan `root` into a snapshot.
pub fn scan_snapshot(root: &Path, config: &ScanConfig) -> Result<Snapshot> {
    if !root.is_dir() {
        bail!("Snapshot root is not a directory: {}", root.display());
    }
    let root = dunce::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    let root_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string());

    let mut stack = vec![SnapshotNode::folder(node_id_for(""), root_name, Vec::new())];
    let mut skipped = 0usize;

    let mut walker = WalkDir::new(&root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !config.is_ignored(e));

    while let Some(next) = walker.next() {
        let entry = match next {
            Ok(e) => e,
            Err(e) => {
                skipped += 1;
                debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };

        while stack.len() > entry.depth() {
            close_top(&mut stack);
        }

        let rel = relative_key(&root, entry.path());
        let id = node_id_for(&rel);
        let name = entry.file_name().to_string_lossy().into_owned();

        if entry.file_type().is_dir() {
            if config.is_atomic(entry.path()) {
                trace!(path = %rel, "atomic folder");
                let mut node = SnapshotNode::folder(id, name, Vec::new());
                node.atomic = true;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(node);
                }
                walker.skip_current_dir();
            } else {
                stack.push(SnapshotNode::folder(id, name, Vec::new()));
            }
        } else if let Some(parent) = stack.last_mut() {
            parent.children.push(SnapshotNode::file(id, name));
        }
    }

    while stack.len() > 1 {
        close_top(&mut stack);
    }
    let Some(tree) = stack.pop() else {
        bail!("Snapshot of {} produced no root node", root.display());
    };

    debug!(root = %root.display(), skipped, "snapshot generated");
    Ok(Snapshot::new(root, tree))
}
