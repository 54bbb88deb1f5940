//! Config validation: rule tables must hold plain names and configured
//! paths must not point at the wrong kind of entry.

use anyhow::{Result, bail};
use std::path::Path;
use tracing::debug;

use super::types::Config;
use crate::path_utils::INVALID_NAME_CHARS;

impl Config {
    pub fn validate(&self) -> Result<()> {
        check_names("reserved_names", &self.names.reserved)?;
        check_names("ignore", &self.scan.ignore)?;
        check_names("atomic_markers", &self.scan.atomic_markers)?;

        if let Some(log) = &self.log_file
            && log.is_dir()
        {
            bail!("log_file '{}' is a directory", log.display());
        }
        if let Some(cache) = &self.cache_dir {
            ensure_not_file(cache, "cache_dir")?;
        }
        debug!(
            log_level = %self.log_level,
            history_limit = self.history_limit,
            merge_folders = self.merge_folders,
            probe_locks = self.probe_locks,
            "config validated"
        );
        Ok(())
    }
}

fn check_names(field: &str, names: &[String]) -> Result<()> {
    for name in names {
        if name.trim().is_empty() {
            bail!("{field} contains an empty entry");
        }
        if name.contains(INVALID_NAME_CHARS) {
            bail!("{field} entry '{name}' must be a plain name, not a path");
        }
    }
    Ok(())
}

fn ensure_not_file(path: &Path, field: &str) -> Result<()> {
    if path.exists() && !path.is_dir() {
        bail!("{field} '{}' exists but isn't a directory", path.display());
    }
    Ok(())
}
