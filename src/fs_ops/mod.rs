//! Diff execution against the filesystem: path resolution, dry-run
//! preconditions, lock negotiation and the apply loop.

mod apply;
mod atomic;
mod dry_run;
mod helpers;
mod lock;
mod resolve;
mod util;

pub use apply::{ApplyOptions, ApplyResponse, OpResult, OpStatus, apply};
pub use atomic::move_path;
pub use dry_run::{DryRunIssue, DryRunReport, OpCheck, Precondition, dry_run};
pub use helpers::{io_error_message, io_error_with_help, io_error_with_help_io};
pub use lock::{FsLockProbe, LockDecision, LockProbe, LockStatus, NoLockProbe};
pub use resolve::{PathResolver, resolve_root};
