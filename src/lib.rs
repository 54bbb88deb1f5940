//! Core library for `reorg`.
//!
//! Load a directory snapshot into an editable tree, stage structural edits
//! (create, rename, move, delete) with undo/redo, derive an ordered diff, then
//! dry-run and apply that diff against the real filesystem.
//!
//! Outside `output`, the library never prints. Outcomes come back as data;
//! progress goes to `tracing`.

pub mod cli;
pub mod config;
pub mod diff;
pub mod edits;
pub mod errors;
pub mod fs_ops;
pub mod history;
pub mod output;
pub mod path_utils;
pub mod platform;
pub mod shutdown;
pub mod snapshot;
pub mod tree;

pub use config::{
    CONFIG_ENV, Config, ConfigSource, LogLevel, default_cache_dir, default_config_path, default_log_path,
    load_config, path_has_symlink_ancestor,
};
pub use diff::{Diff, DiffMeta, OpType, Operation, diff_ops, generate_diff};
pub use edits::{Edit, apply_edits, load_edits, parse_edits};
pub use errors::{EditError, NameError, PathError, TreeError};
pub use fs_ops::{
    ApplyOptions, ApplyResponse, DryRunIssue, DryRunReport, FsLockProbe, LockDecision, LockProbe, LockStatus,
    NoLockProbe, OpCheck, OpResult, OpStatus, PathResolver, Precondition, apply, dry_run, resolve_root,
};
pub use history::{History, HistoryEntry, Intent};
pub use path_utils::{NamePolicy, PathKind, ensure_valid_name, normalize};
pub use snapshot::{
    DirectoryScanner, PersistedSnapshot, ScanConfig, Snapshot, SnapshotNode, SnapshotSource, persist_snapshot,
    scan_snapshot,
};
pub use tree::{MoveOutcome, NewNode, Node, NodeId, NodeKind, Tree, TreePolicy};
