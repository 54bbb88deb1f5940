//! Snapshot records and the default snapshot source/sink.
//!
//! A snapshot is an immutable record of a directory's structure at scan time.
//! The tree model is built from one; the executor produces a fresh one after
//! applying a diff.

mod persist;
mod scan;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::tree::NodeKind;

pub use persist::{PersistedSnapshot, persist_snapshot};
pub use scan::{ScanConfig, node_id_for, scan_snapshot};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub root_path: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub tree: SnapshotNode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotNode {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    /// Opaque environment folder (virtualenv, extension bundle); never has children.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub atomic: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SnapshotNode>,
}

impl SnapshotNode {
    pub fn file(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: NodeKind::File,
            atomic: false,
            children: Vec::new(),
        }
    }

    pub fn folder(id: impl Into<String>, name: impl Into<String>, children: Vec<SnapshotNode>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: NodeKind::Folder,
            atomic: false,
            children,
        }
    }
}

impl Snapshot {
    /// Wrap an already-built node tree, stamping it with the current time.
    pub fn new(root_path: impl Into<PathBuf>, tree: SnapshotNode) -> Self {
        Self {
            root_path: root_path.into(),
            generated_at: Utc::now(),
            tree,
        }
    }
}

/// Produces snapshots of a directory and optionally stores them.
/// The executor calls this after a successful apply.
pub trait SnapshotSource {
    fn generate(&self, root: &Path) -> anyhow::Result<Snapshot>;

    /// Persist a snapshot; `Ok(None)` when this source keeps nothing.
    fn persist(&self, _snapshot: &Snapshot) -> anyhow::Result<Option<PersistedSnapshot>> {
        Ok(None)
    }
}

/// Directory scanner with an optional cache directory for persisted snapshots.
#[derive(Debug, Clone, Default)]
pub struct DirectoryScanner {
    pub config: ScanConfig,
    pub cache_dir: Option<PathBuf>,
}

impl DirectoryScanner {
    pub fn new(config: ScanConfig, cache_dir: Option<PathBuf>) -> Self {
        Self { config, cache_dir }
    }
}

impl SnapshotSource for DirectoryScanner {
    fn generate(&self, root: &Path) -> anyhow::Result<Snapshot> {
        scan_snapshot(root, &self.config)
    }

    fn persist(&self, snapshot: &Snapshot) -> anyhow::Result<Option<PersistedSnapshot>> {
        match &self.cache_dir {
            Some(dir) => persist_snapshot(snapshot, dir).map(Some),
            None => Ok(None),
        }
    }
}
