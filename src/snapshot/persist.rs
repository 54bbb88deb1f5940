//! Versioned snapshot persistence.
//! Each call writes `snapshot-v{N}.json` into the cache directory, N being one
//! past the highest version already there.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::Snapshot;
use crate::fs_ops::io_error_with_help;
use crate::platform::write_file_atomic;

const PREFIX: &str = "snapshot-v";
const SUFFIX: &str = ".json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSnapshot {
    pub file_path: PathBuf,
    pub version: u64,
}

fn version_of(name: &str) -> Option<u64> {
    name.strip_prefix(PREFIX)?.strip_suffix(SUFFIX)?.parse().ok()
}

fn latest_version(cache_dir: &Path) -> Result<u64> {
    let entries =
        fs::read_dir(cache_dir).map_err(io_error_with_help("read snapshot cache", cache_dir))?;
    Ok(entries
        .filter_map(|e| e.ok())
        .filter_map(|e| version_of(&e.file_name().to_string_lossy()))
        .max()
        .unwrap_or(0))
}

/// Write `snapshot` into `cache_dir` under the next free version number.
pub fn persist_snapshot(snapshot: &Snapshot, cache_dir: &Path) -> Result<PersistedSnapshot> {
    fs::create_dir_all(cache_dir).map_err(io_error_with_help("create snapshot cache", cache_dir))?;

    let version = latest_version(cache_dir)? + 1;
    let file_path = cache_dir.join(format!("{PREFIX}{version}{SUFFIX}"));
    let body = serde_json::to_vec_pretty(snapshot).context("serialize snapshot")?;
    write_file_atomic(&file_path, &body)?;

    info!(path = %file_path.display(), version, "snapshot persisted");
    Ok(PersistedSnapshot { file_path, version })
}
