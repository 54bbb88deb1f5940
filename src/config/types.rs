//! Core configuration types.
//! - Config holds runtime settings with defaults.
//! - LogLevel represents verbosity with simple parsing helpers.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::history::{DEFAULT_HISTORY_LIMIT, History};
use crate::path_utils::NamePolicy;
use crate::snapshot::{DirectoryScanner, ScanConfig};
use crate::tree::TreePolicy;

/// Program-defined verbosity levels exposed to users/config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    #[default]
    Normal,
    /// Per-operation progress
    Info,
    /// Everything, including tree mutations
    Debug,
}

impl LogLevel {
    /// Parse common names (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" => Some(LogLevel::Normal),
            "info" | "verbose" | "detailed" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub log_level: LogLevel,
    pub log_file: Option<PathBuf>,
    /// Where persisted snapshots go; nothing is persisted when unset.
    pub cache_dir: Option<PathBuf>,
    pub history_limit: usize,
    pub names: NamePolicy,
    /// Moving a folder onto a same-named folder merges them.
    pub merge_folders: bool,
    pub scan: ScanConfig,
    /// Probe files for locks before moving/renaming/deleting them.
    pub probe_locks: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Normal,
            log_file: None,
            cache_dir: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
            names: NamePolicy::default(),
            merge_folders: true,
            scan: ScanConfig::default(),
            probe_locks: true,
        }
    }
}

impl Config {
    pub fn tree_policy(&self) -> TreePolicy {
        TreePolicy {
            names: self.names.clone(),
            merge_folders: self.merge_folders,
        }
    }

    pub fn history(&self) -> History {
        History::new(self.history_limit)
    }

    pub fn scanner(&self) -> DirectoryScanner {
        DirectoryScanner::new(self.scan.clone(), self.cache_dir.clone())
    }
}
