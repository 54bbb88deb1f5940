//! CLI definition and parsing.
//!
//! Global flags override values from the XML config; `--debug` is shorthand
//! for `--log-level debug`.

use clap::{Parser, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;

use crate::config::{Config, LogLevel};
use crate::fs_ops::LockDecision;

/// Stage structural edits against a directory tree, review the diff, apply it.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Stage, review and apply directory restructurings")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file to use instead of $REORG_CONFIG or the default location.
    #[arg(long, global = true, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Set log level: quiet, normal, info, debug.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Enable debug logging (shorthand for --log-level debug).
    #[arg(short = 'd', long, global = true)]
    pub debug: bool,

    /// Emit logs in structured JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// Also write logs to this file.
    #[arg(long, global = true, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub log_file: Option<PathBuf>,

    /// Directory for persisted snapshots.
    #[arg(long, global = true, value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Scan a directory and print its snapshot as JSON.
    Snapshot {
        #[arg(value_hint = ValueHint::DirPath)]
        dir: PathBuf,
        /// Also store it in the cache directory.
        #[arg(long)]
        persist: bool,
    },
    /// Stage an edit script against a directory and print the resulting diff.
    Diff {
        #[arg(value_hint = ValueHint::DirPath)]
        dir: PathBuf,
        #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
        edits: PathBuf,
    },
    /// Stage an edit script, dry-run the diff, then apply it.
    Apply {
        #[arg(value_hint = ValueHint::DirPath)]
        dir: PathBuf,
        #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
        edits: PathBuf,
        /// Do not ask for confirmation.
        #[arg(short = 'y', long)]
        yes: bool,
        /// What to do when a file is locked.
        #[arg(long, value_enum, default_value_t = OnLocked::Ask)]
        on_locked: OnLocked,
    },
    /// Print the config file location and the effective settings.
    PrintConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnLocked {
    /// Prompt on stdin for each locked file.
    Ask,
    Retry,
    Skip,
    Abort,
}

impl OnLocked {
    /// The fixed decision, or None when the user is to be asked.
    pub fn fixed_decision(self) -> Option<LockDecision> {
        match self {
            OnLocked::Ask => None,
            OnLocked::Retry => Some(LockDecision::Retry),
            OnLocked::Skip => Some(LockDecision::Skip),
            OnLocked::Abort => Some(LockDecision::Abort),
        }
    }
}

impl Args {
    /// Precedence: --debug > --log-level > None (config value stays).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Apply CLI overrides to a loaded Config in place. Unset flags are no-ops.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
        if let Some(f) = &self.log_file {
            cfg.log_file = Some(f.clone());
        }
        if let Some(d) = &self.cache_dir {
            cfg.cache_dir = Some(d.clone());
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
