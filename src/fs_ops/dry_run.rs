//! Precondition checks.
//!
//! A dry run evaluates every op against the current disk without touching it.
//! Ops later in a diff depend on earlier ones (a rename of something an
//! earlier move relocated, a delete inside a renamed folder), so the dry run
//! keeps a log of what each passing op would have done and looks paths up
//! through it before consulting the disk. The executor runs the same check
//! against the live disk right before each op.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;

use super::resolve::PathResolver;
use super::util::{entry_exists, same_entry};
use crate::diff::{Diff, OpType, Operation};
use crate::path_utils::parent_of;
use crate::tree::NodeKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Precondition {
    Ok,
    MissingSource,
    TargetExists,
    Error,
}

impl Precondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Precondition::Ok => "ok",
            Precondition::MissingSource => "missing-source",
            Precondition::TargetExists => "target-exists",
            Precondition::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpCheck {
    pub index: usize,
    #[serde(rename = "type")]
    pub op_type: OpType,
    pub kind: NodeKind,
    pub precondition: Precondition,
    /// Source for move/rename/delete, the new entry for create.
    pub resolved_path: Option<PathBuf>,
    /// Destination for move/rename.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Tree path the source was found at (a rename may use its fallback).
    #[serde(skip)]
    pub(crate) source_tree_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DryRunIssue {
    pub index: usize,
    pub precondition: Precondition,
    /// `"{Verb} {kind} {path}: {reason}"`.
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DryRunReport {
    pub base_root: PathBuf,
    pub root_name: String,
    pub checks: Vec<OpCheck>,
    pub issues: Vec<DryRunIssue>,
}

impl DryRunReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Evaluate every op's precondition without modifying the filesystem.
pub fn dry_run(diff: &Diff) -> DryRunReport {
    dry_run_with(&PathResolver::for_diff(diff), diff)
}

pub(crate) fn dry_run_with(resolver: &PathResolver, diff: &Diff) -> DryRunReport {
    let mut staged = Staged::default();
    let mut checks = Vec::with_capacity(diff.ops.len());
    let mut issues = Vec::new();

    for (index, op) in diff.ops.iter().enumerate() {
        let check = check_op(resolver, &staged, index, op);
        if check.precondition == Precondition::Ok {
            staged.record(op, &check);
        } else {
            issues.push(DryRunIssue {
                index,
                precondition: check.precondition,
                description: describe(op, &check),
            });
        }
        checks.push(check);
    }

    DryRunReport {
        base_root: resolver.base_root().to_path_buf(),
        root_name: resolver.root_name().to_string(),
        checks,
        issues,
    }
}

fn describe(op: &Operation, check: &OpCheck) -> String {
    let detail = match op {
        Operation::Create { parent_path, name, .. } => format!("{parent_path}/{name}"),
        other => other.anchor_path().to_string(),
    };
    let reason = check
        .message
        .clone()
        .unwrap_or_else(|| check.precondition.as_str().to_string());
    format!("{} {} {}: {}", op.op_type().verb(), op.kind(), detail, reason)
}

/// What a passing op would have changed, in tree-path terms.
#[derive(Debug, Clone)]
enum StagedChange {
    Created(String),
    Relocated { from: String, to: String },
    Removed(String),
}

/// Overlay of staged changes. Empty when checking against the live disk.
#[derive(Debug, Clone, Default)]
pub(crate) struct Staged {
    log: Vec<StagedChange>,
}

/// Result of looking a tree path up through the overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Presence {
    /// On disk, at this (pre-plan) location.
    Disk(PathBuf),
    /// Would be created by an earlier op.
    Planned(String),
    Absent,
}

impl Presence {
    fn exists(&self) -> bool {
        !matches!(self, Presence::Absent)
    }
}

/// `path` relative to `prefix` when `prefix` is `path` or one of its ancestors.
fn strip_tree_prefix<'p>(path: &'p str, prefix: &str) -> Option<&'p str> {
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

impl Staged {
    fn record(&mut self, op: &Operation, check: &OpCheck) {
        let change = match op {
            Operation::Create { parent_path, name, .. } => StagedChange::Created(format!("{parent_path}/{name}")),
            Operation::Move { from_path, .. } => StagedChange::Relocated {
                from: check.source_tree_path.clone().unwrap_or_else(|| from_path.clone()),
                to: op.move_destination().unwrap_or_default(),
            },
            Operation::Rename { from_path, to_path, .. } => StagedChange::Relocated {
                from: check.source_tree_path.clone().unwrap_or_else(|| from_path.clone()),
                to: to_path.clone(),
            },
            Operation::Delete { at_path, .. } => StagedChange::Removed(at_path.clone()),
        };
        self.log.push(change);
    }

    fn locate(&self, resolver: &PathResolver, tree_path: &str) -> io::Result<Presence> {
        let mut current = tree_path.trim_end_matches('/').to_string();
        for change in self.log.iter().rev() {
            match change {
                StagedChange::Created(path) => {
                    if current == *path {
                        return Ok(Presence::Planned(current));
                    }
                    if strip_tree_prefix(&current, path).is_some() {
                        return Ok(Presence::Absent);
                    }
                }
                StagedChange::Relocated { from, to } => {
                    if let Some(rest) = strip_tree_prefix(&current, to) {
                        current = format!("{from}{rest}");
                    } else if strip_tree_prefix(&current, from).is_some() {
                        return Ok(Presence::Absent);
                    }
                }
                StagedChange::Removed(path) => {
                    if strip_tree_prefix(&current, path).is_some() {
                        return Ok(Presence::Absent);
                    }
                }
            }
        }
        let disk = resolver
            .resolve(&current)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
        if entry_exists(&disk)? {
            Ok(Presence::Disk(disk))
        } else {
            Ok(Presence::Absent)
        }
    }
}

/// Tree path a rename's source is expected at when the recorded path is stale.
fn rename_fallback(op: &Operation) -> Option<String> {
    match op {
        Operation::Rename { to_path, from_name, .. } => Some(format!("{}/{from_name}", parent_of(to_path))),
        _ => None,
    }
}

fn same(a: &Presence, b: &Presence) -> bool {
    match (a, b) {
        (Presence::Disk(x), Presence::Disk(y)) => same_entry(x, y),
        (Presence::Planned(x), Presence::Planned(y)) => x == y,
        _ => false,
    }
}

struct Checker<'a> {
    resolver: &'a PathResolver,
    staged: &'a Staged,
    check: OpCheck,
}

impl Checker<'_> {
    fn fail(mut self, precondition: Precondition, message: impl Into<String>) -> OpCheck {
        self.check.precondition = precondition;
        self.check.message = Some(message.into());
        self.check
    }

    fn locate(&self, tree_path: &str) -> Result<Presence, String> {
        self.staged
            .locate(self.resolver, tree_path)
            .map_err(|e| format!("check '{tree_path}': {e}"))
    }

    fn resolve(&self, tree_path: &str) -> Result<PathBuf, String> {
        self.resolver.resolve(tree_path).map_err(|e| e.to_string())
    }
}

/// Check one op. `staged` holds the effects of earlier passing ops (empty
/// when checking the live disk).
pub(crate) fn check_op(resolver: &PathResolver, staged: &Staged, index: usize, op: &Operation) -> OpCheck {
    let mut checker = Checker {
        resolver,
        staged,
        check: OpCheck {
            index,
            op_type: op.op_type(),
            kind: op.kind(),
            precondition: Precondition::Ok,
            resolved_path: None,
            target_path: None,
            message: None,
            source_tree_path: None,
        },
    };

    match op {
        Operation::Create { parent_path, name, .. } => {
            let target = format!("{parent_path}/{name}");
            match checker.resolve(&target) {
                Ok(p) => checker.check.resolved_path = Some(p),
                Err(e) => return checker.fail(Precondition::Error, e),
            }
            match checker.locate(&target) {
                Ok(p) if p.exists() => checker.fail(Precondition::TargetExists, "target already exists"),
                Ok(_) => checker.check,
                Err(e) => checker.fail(Precondition::Error, e),
            }
        }
        Operation::Move { from_path, .. } => {
            let target = op.move_destination().unwrap_or_default();
            source_and_target(checker, from_path, None, &target)
        }
        Operation::Rename { from_path, to_path, .. } => {
            source_and_target(checker, from_path, rename_fallback(op), to_path)
        }
        Operation::Delete { at_path, .. } => {
            match checker.resolve(at_path) {
                Ok(p) => checker.check.resolved_path = Some(p),
                Err(e) => return checker.fail(Precondition::Error, e),
            }
            match checker.locate(at_path) {
                Ok(Presence::Absent) => checker.fail(Precondition::MissingSource, "nothing exists at this path"),
                Ok(_) => checker.check,
                Err(e) => checker.fail(Precondition::Error, e),
            }
        }
    }
}

fn source_and_target(mut checker: Checker<'_>, from: &str, fallback: Option<String>, target: &str) -> OpCheck {
    let mut source_path = from.to_string();
    let mut source = match checker.locate(from) {
        Ok(p) => p,
        Err(e) => return checker.fail(Precondition::Error, e),
    };
    if !source.exists()
        && let Some(alt) = fallback
    {
        match checker.locate(&alt) {
            Ok(p) if p.exists() => {
                source = p;
                source_path = alt;
            }
            Ok(_) => {}
            Err(e) => return checker.fail(Precondition::Error, e),
        }
    }

    match (checker.resolve(&source_path), checker.resolve(target)) {
        (Ok(s), Ok(t)) => {
            checker.check.resolved_path = Some(s);
            checker.check.target_path = Some(t);
            checker.check.source_tree_path = Some(source_path);
        }
        (Err(e), _) | (_, Err(e)) => return checker.fail(Precondition::Error, e),
    }

    if !source.exists() {
        return checker.fail(Precondition::MissingSource, "source does not exist");
    }
    match checker.locate(target) {
        Ok(t) if t.exists() && !same(&source, &t) => {
            checker.fail(Precondition::TargetExists, "target already exists")
        }
        Ok(_) => checker.check,
        Err(e) => checker.fail(Precondition::Error, e),
    }
}
