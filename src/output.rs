//! User-facing terminal output for the binary.
//! Colors only when stdout is a TTY. Reports are rendered here; the library
//! itself never prints.

use owo_colors::OwoColorize;
use serde::Serialize;

use crate::fs_ops::{ApplyResponse, DryRunReport, OpStatus, Precondition};

fn is_tty() -> bool {
    atty::is(atty::Stream::Stdout)
}

pub fn print_info(msg: &str) {
    if is_tty() {
        println!("{} {}", "info:".cyan().bold(), msg);
    } else {
        println!("info: {}", msg);
    }
}

pub fn print_warn(msg: &str) {
    if is_tty() {
        eprintln!("{} {}", "warn:".yellow().bold(), msg);
    } else {
        eprintln!("warn: {}", msg);
    }
}

pub fn print_error(msg: &str) {
    if is_tty() {
        eprintln!("{} {}", "error:".red().bold(), msg);
    } else {
        eprintln!("error: {}", msg);
    }
}

pub fn print_success(msg: &str) {
    if is_tty() {
        println!("{} {}", "ok:".green().bold(), msg);
    } else {
        println!("ok: {}", msg);
    }
}

/// Plain line, no prefix. For output users may script against.
pub fn print_user(msg: &str) {
    println!("{}", msg);
}

/// Pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn precondition_label(p: Precondition) -> String {
    let s = p.as_str();
    if !is_tty() {
        return s.to_string();
    }
    match p {
        Precondition::Ok => s.green().to_string(),
        Precondition::MissingSource | Precondition::TargetExists => s.yellow().to_string(),
        Precondition::Error => s.red().to_string(),
    }
}

fn status_label(status: OpStatus) -> String {
    let s = match status {
        OpStatus::Applied => "applied",
        OpStatus::Skipped => "skipped",
        OpStatus::Failed => "failed",
        OpStatus::Aborted => "aborted",
    };
    if !is_tty() {
        return s.to_string();
    }
    match status {
        OpStatus::Applied => s.green().to_string(),
        OpStatus::Skipped => s.cyan().to_string(),
        OpStatus::Failed => s.red().to_string(),
        OpStatus::Aborted => s.yellow().to_string(),
    }
}

/// One line per checked op, followed by the issue list.
pub fn print_dry_run(report: &DryRunReport) {
    print_user(&format!("Dry run against {}", report.base_root.display()));
    for check in &report.checks {
        let path = check
            .resolved_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let target = check
            .target_path
            .as_deref()
            .map(|p| format!(" -> {}", p.display()))
            .unwrap_or_default();
        print_user(&format!(
            "  #{:<3} {:<6} {:<6} {:<14} {}{}",
            check.index,
            check.op_type.verb(),
            check.kind.as_str(),
            precondition_label(check.precondition),
            path,
            target
        ));
    }
    if report.is_clean() {
        print_success("all preconditions hold");
    } else {
        for issue in &report.issues {
            print_warn(&issue.description);
        }
    }
}

/// Per-op outcome lines plus a summary.
pub fn print_apply(response: &ApplyResponse) {
    for r in &response.results {
        let path = r
            .resolved_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let message = r.message.as_deref().map(|m| format!(" ({m})")).unwrap_or_default();
        print_user(&format!(
            "  #{:<3} {:<6} {:<8} {}{}",
            r.index,
            r.op_type.verb(),
            status_label(r.status),
            path,
            message
        ));
    }
    let applied = response.results.iter().filter(|r| r.status == OpStatus::Applied).count();
    let summary = format!("{applied} of {} operations applied", response.results.len());
    if response.ok {
        print_success(&summary);
    } else if response.aborted {
        print_warn(&format!("aborted; {summary}"));
    } else {
        print_error(&format!("some operations failed; {summary}"));
    }
    if let Some(p) = &response.persisted {
        print_info(&format!("snapshot v{} written to {}", p.version, p.file_path.display()));
    }
    if let Some(e) = &response.snapshot_error {
        print_warn(&format!("snapshot not refreshed: {e}"));
    }
}
