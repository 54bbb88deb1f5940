//! Default path helpers and symlink checks.
//! OS-appropriate config, log and snapshot-cache locations via `dirs`.

use dirs::{cache_dir, config_dir, data_dir};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "REORG_CONFIG";

const APP_DIR: &str = "reorg";

fn home_fallback(parts: &[&str]) -> Option<PathBuf> {
    env::var_os("HOME").map(|h| parts.iter().fold(PathBuf::from(h), |p, part| p.join(part)))
}

/// `$REORG_CONFIG` when set, else `<config dir>/reorg/config.xml`.
pub fn default_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(p));
    }
    match config_dir() {
        Some(base) => Some(base.join(APP_DIR).join("config.xml")),
        None => home_fallback(&[".config", APP_DIR, "config.xml"]),
    }
}

/// `<data dir>/reorg/reorg.log`.
pub fn default_log_path() -> Option<PathBuf> {
    match data_dir() {
        Some(base) => Some(base.join(APP_DIR).join("reorg.log")),
        None => home_fallback(&[".local", "share", APP_DIR, "reorg.log"]),
    }
}

/// `<cache dir>/reorg/snapshots`: where persisted snapshots go by default.
pub fn default_cache_dir() -> Option<PathBuf> {
    match cache_dir() {
        Some(base) => Some(base.join(APP_DIR).join("snapshots")),
        None => home_fallback(&[".cache", APP_DIR, "snapshots"]),
    }
}

/// True if any existing ancestor of `path` is a symlink.
pub fn path_has_symlink_ancestor(path: &Path) -> io::Result<bool> {
    let mut p = path.parent();
    while let Some(anc) = p {
        if anc.exists() {
            let meta = fs::symlink_metadata(anc)?;
            if meta.file_type().is_symlink() {
                return Ok(true);
            }
        }
        p = anc.parent();
    }
    Ok(false)
}
