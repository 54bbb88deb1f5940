//! Applying a diff to disk.
//!
//! Ops run strictly one at a time in diff order. Per op:
//! - after an abort (handler or cancellation) every remaining op is Aborted
//!   without further filesystem access;
//! - the precondition is re-checked against the live disk; anything but Ok
//!   fails the op;
//! - move/rename/delete of a file first goes through the lock loop (probe,
//!   then ask the handler on Locked: retry, skip or abort);
//! - folders and creates never consult the probe.
//!
//! Nothing already applied is rolled back.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::atomic::move_path;
use super::dry_run::{DryRunReport, OpCheck, Precondition, Staged, check_op, dry_run_with};
use super::helpers::io_error_with_help;
use super::lock::{FsLockProbe, LockDecision, LockProbe, LockStatus};
use super::resolve::PathResolver;
use crate::diff::{Diff, OpType, Operation};
use crate::snapshot::{PersistedSnapshot, Snapshot, SnapshotSource};
use crate::tree::NodeKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpStatus {
    Applied,
    Skipped,
    Failed,
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpResult {
    pub index: usize,
    #[serde(rename = "type")]
    pub op_type: OpType,
    pub kind: NodeKind,
    pub status: OpStatus,
    pub resolved_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResponse {
    /// No op failed or was aborted. Skips do not count against it.
    pub ok: bool,
    pub aborted: bool,
    pub results: Vec<OpResult>,
    pub dry_run_report: DryRunReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Snapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persisted: Option<PersistedSnapshot>,
    /// Set when the post-apply snapshot could not be produced or stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_error: Option<String>,
}

type ConfirmFn<'a> = Box<dyn FnMut(&DryRunReport) -> bool + 'a>;
type LockedFn<'a> = Box<dyn FnMut(&Path) -> LockDecision + 'a>;
type CancelFn<'a> = Box<dyn Fn() -> bool + 'a>;

/// Collaborators for `apply`. All optional except the probe, which defaults
/// to `FsLockProbe`.
pub struct ApplyOptions<'a> {
    confirm: Option<ConfirmFn<'a>>,
    on_locked: Option<LockedFn<'a>>,
    probe: Box<dyn LockProbe + 'a>,
    snapshots: Option<&'a dyn SnapshotSource>,
    cancel: Option<CancelFn<'a>>,
}

impl Default for ApplyOptions<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> ApplyOptions<'a> {
    pub fn new() -> Self {
        Self {
            confirm: None,
            on_locked: None,
            probe: Box::new(FsLockProbe),
            snapshots: None,
            cancel: None,
        }
    }

    /// Called once with the dry-run report; returning false aborts before any op.
    pub fn with_confirm(mut self, f: impl FnMut(&DryRunReport) -> bool + 'a) -> Self {
        self.confirm = Some(Box::new(f));
        self
    }

    /// Asked every time a file op finds its file locked.
    pub fn with_lock_handler(mut self, f: impl FnMut(&Path) -> LockDecision + 'a) -> Self {
        self.on_locked = Some(Box::new(f));
        self
    }

    pub fn with_probe(mut self, probe: impl LockProbe + 'a) -> Self {
        self.probe = Box::new(probe);
        self
    }

    /// Regenerate (and persist) a snapshot of the base root after a run that
    /// was not aborted.
    pub fn with_snapshot_source(mut self, source: &'a dyn SnapshotSource) -> Self {
        self.snapshots = Some(source);
        self
    }

    /// Polled before each op and between lock retries; true aborts the rest.
    pub fn with_cancel(mut self, f: impl Fn() -> bool + 'a) -> Self {
        self.cancel = Some(Box::new(f));
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| c())
    }
}

enum LockOutcome {
    Proceed,
    Skip,
    Fail(String),
    Abort(String),
}

/// Dry-run, confirm, then apply `diff` op by op.
pub fn apply(diff: &Diff, mut options: ApplyOptions<'_>) -> ApplyResponse {
    let resolver = PathResolver::for_diff(diff);
    let report = dry_run_with(&resolver, diff);

    if let Some(confirm) = options.confirm.as_mut()
        && !confirm(&report)
    {
        info!(uid = %diff.meta.uid, "apply declined at confirmation");
        return ApplyResponse {
            ok: false,
            aborted: true,
            results: Vec::new(),
            dry_run_report: report,
            snapshot: None,
            persisted: None,
            snapshot_error: None,
        };
    }

    let live = Staged::default();
    let mut results = Vec::with_capacity(diff.ops.len());
    let mut aborted = false;

    for (index, op) in diff.ops.iter().enumerate() {
        if !aborted && options.cancelled() {
            warn!(index, "cancellation requested; aborting remaining operations");
            aborted = true;
        }
        if aborted {
            results.push(result_for(index, op, OpStatus::Aborted, None, None));
            continue;
        }

        let check = check_op(&resolver, &live, index, op);
        if check.precondition != Precondition::Ok {
            let message = check
                .message
                .clone()
                .unwrap_or_else(|| check.precondition.as_str().to_string());
            debug!(index, %op, %message, "precondition failed");
            results.push(result_for(index, op, OpStatus::Failed, check.resolved_path, Some(message)));
            continue;
        }

        let needs_lock_check = !matches!(op, Operation::Create { .. }) && op.kind() == NodeKind::File;
        if needs_lock_check && let Some(source) = check.resolved_path.as_deref() {
            match lock_loop(&mut options, source) {
                LockOutcome::Proceed => {}
                LockOutcome::Skip => {
                    debug!(index, %op, "skipped locked file");
                    results.push(result_for(index, op, OpStatus::Skipped, check.resolved_path, None));
                    continue;
                }
                LockOutcome::Fail(message) => {
                    results.push(result_for(index, op, OpStatus::Failed, check.resolved_path, Some(message)));
                    continue;
                }
                LockOutcome::Abort(message) => {
                    warn!(index, %op, "aborted at locked file");
                    aborted = true;
                    results.push(result_for(index, op, OpStatus::Aborted, check.resolved_path, Some(message)));
                    continue;
                }
            }
        }

        match perform(op, &check) {
            Ok(()) => {
                debug!(index, %op, "applied");
                results.push(result_for(index, op, OpStatus::Applied, check.resolved_path, None));
            }
            Err(e) => {
                warn!(index, %op, error = %e, "operation failed");
                results.push(result_for(
                    index,
                    op,
                    OpStatus::Failed,
                    check.resolved_path,
                    Some(format!("{e:#}")),
                ));
            }
        }
    }

    let ok = results
        .iter()
        .all(|r| matches!(r.status, OpStatus::Applied | OpStatus::Skipped));
    let applied = results.iter().filter(|r| r.status == OpStatus::Applied).count();
    info!(uid = %diff.meta.uid, ok, aborted, applied, total = results.len(), "apply finished");

    let mut response = ApplyResponse {
        ok,
        aborted,
        results,
        dry_run_report: report,
        snapshot: None,
        persisted: None,
        snapshot_error: None,
    };
    if !aborted && let Some(source) = options.snapshots {
        refresh_snapshot(source, &diff.base_root, &mut response);
    }
    response
}

fn result_for(
    index: usize,
    op: &Operation,
    status: OpStatus,
    resolved_path: Option<PathBuf>,
    message: Option<String>,
) -> OpResult {
    OpResult {
        index,
        op_type: op.op_type(),
        kind: op.kind(),
        status,
        resolved_path,
        message,
    }
}

fn lock_loop(options: &mut ApplyOptions<'_>, path: &Path) -> LockOutcome {
    loop {
        match options.probe.probe(path) {
            // A missing file is left to the operation itself to report.
            LockStatus::Ok | LockStatus::Missing => return LockOutcome::Proceed,
            LockStatus::Locked => {}
        }
        let Some(handler) = options.on_locked.as_mut() else {
            return LockOutcome::Fail("file is locked".to_string());
        };
        match handler(path) {
            LockDecision::Retry => {
                debug!(path = %path.display(), "retrying locked file");
                if options.cancelled() {
                    return LockOutcome::Abort("cancelled while waiting for lock".to_string());
                }
            }
            LockDecision::Skip => return LockOutcome::Skip,
            LockDecision::Abort => return LockOutcome::Abort("aborted at locked file".to_string()),
        }
    }
}

fn perform(op: &Operation, check: &OpCheck) -> Result<()> {
    let source = check.resolved_path.as_deref();
    match (op, source, check.target_path.as_deref()) {
        (Operation::Create { kind, .. }, Some(target), _) => create_entry(target, *kind),
        (Operation::Move { .. } | Operation::Rename { .. }, Some(src), Some(dst)) => {
            if let Some(parent) = dst.parent() {
                fs::create_dir_all(parent).map_err(io_error_with_help("create parent directory", parent))?;
            }
            move_path(src, dst)
        }
        (Operation::Delete { kind, recursive, .. }, Some(target), _) => remove_entry(target, *kind, *recursive),
        _ => anyhow::bail!("operation has no resolved path"),
    }
}

fn create_entry(target: &Path, kind: NodeKind) -> Result<()> {
    match kind {
        NodeKind::Folder => {
            fs::create_dir_all(target).map_err(io_error_with_help("create directory", target))?;
        }
        NodeKind::File => {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(io_error_with_help("create parent directory", parent))?;
            }
            OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(target)
                .map_err(io_error_with_help("create file", target))?;
        }
    }
    Ok(())
}

fn remove_entry(target: &Path, kind: NodeKind, recursive: bool) -> Result<()> {
    match kind {
        NodeKind::File => fs::remove_file(target).map_err(io_error_with_help("remove file", target))?,
        NodeKind::Folder if recursive => {
            fs::remove_dir_all(target).map_err(io_error_with_help("remove directory tree", target))?
        }
        NodeKind::Folder => fs::remove_dir(target).map_err(io_error_with_help("remove directory", target))?,
    }
    Ok(())
}

fn refresh_snapshot(source: &dyn SnapshotSource, base_root: &Path, response: &mut ApplyResponse) {
    let snapshot = match source.generate(base_root) {
        Ok(s) => s,
        Err(e) => {
            warn!(root = %base_root.display(), error = %e, "snapshot regeneration failed");
            response.snapshot_error = Some(format!("{e:#}"));
            return;
        }
    };
    match source.persist(&snapshot) {
        Ok(persisted) => response.persisted = persisted,
        Err(e) => {
            warn!(error = %e, "snapshot persistence failed");
            response.snapshot_error = Some(format!("{e:#}"));
        }
    }
    response.snapshot = Some(snapshot);
}
