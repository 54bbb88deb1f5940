//! Mapping tree-relative op paths onto the filesystem.

use std::path::{Path, PathBuf};

use crate::diff::Diff;
use crate::errors::PathError;
use crate::path_utils::{PathKind, normalize, segments};

/// The display name the diff's paths are rooted at: the first segment of the
/// first op carrying one, else the base root's file name.
pub fn resolve_root(diff: &Diff) -> String {
    diff.ops
        .iter()
        .find_map(|op| segments(op.anchor_path()).next())
        .map(str::to_string)
        .unwrap_or_else(|| base_name_of(&diff.base_root))
}

fn base_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    base_root: PathBuf,
    root_name: String,
}

impl PathResolver {
    pub fn new(base_root: impl Into<PathBuf>, root_name: impl Into<String>) -> Self {
        Self {
            base_root: base_root.into(),
            root_name: root_name.into(),
        }
    }

    pub fn for_diff(diff: &Diff) -> Self {
        Self::new(diff.base_root.clone(), resolve_root(diff))
    }

    pub fn base_root(&self) -> &Path {
        &self.base_root
    }

    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    /// `Root/a/b` -> `{base_root}/a/b`. A leading root-name segment is
    /// stripped; the rest may not climb above the base root.
    pub fn resolve(&self, tree_path: &str) -> Result<PathBuf, PathError> {
        let mut parts = segments(tree_path).peekable();
        if parts.peek() == Some(&self.root_name.as_str()) {
            parts.next();
        }
        let rest: Vec<&str> = parts.collect();
        let relative = normalize(&rest.join("/"), PathKind::RelativeOnly)
            .map_err(|_| PathError::PathEscapesRoot(tree_path.to_string()))?;

        let mut out = self.base_root.clone();
        for seg in segments(&relative).filter(|s| *s != ".") {
            out.push(seg);
        }
        Ok(out)
    }
}
