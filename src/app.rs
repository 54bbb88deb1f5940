//! Application orchestrator.
//! Loads and merges config, initializes logging, installs the Ctrl-C handler,
//! then runs the selected subcommand.

use anyhow::{Context, Result, bail};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use reorg::cli::{Args, Command, OnLocked};
use reorg::output as out;
use reorg::{
    ApplyOptions, Config, ConfigSource, DryRunReport, FsLockProbe, History, LockDecision, NoLockProbe,
    SnapshotSource, Tree, apply, apply_edits, default_cache_dir, generate_diff, load_config, load_edits, shutdown,
};

use crate::logging::init_tracing;

const RETRY_DELAY: Duration = Duration::from_millis(500);

pub fn run(args: Args) -> Result<()> {
    let (mut cfg, source) = load_config(args.config.as_deref()).inspect_err(|e| {
        out::print_error(&format!("Failed to load config: {e:#}"));
    })?;
    args.apply_overrides(&mut cfg);
    cfg.validate()?;

    let guard = init_tracing(cfg.log_level, cfg.log_file.as_deref(), args.json).inspect_err(|e| {
        out::print_error(&format!("Failed to initialize logging: {e:#}"));
    })?;

    // Dropping the guard on Ctrl-C flushes buffered file logs.
    let guard_slot = Arc::new(Mutex::new(guard));
    {
        let guard_slot = Arc::clone(&guard_slot);
        if let Err(e) = ctrlc::set_handler(move || {
            shutdown::request();
            out::print_warn("Received interrupt; stopping after the current operation...");
            if let Ok(mut g) = guard_slot.lock() {
                let _ = g.take();
            }
        }) {
            warn!(error = %e, "could not install Ctrl-C handler");
        }
    }

    if let ConfigSource::CreatedTemplate(path) = &source {
        info!(path = %path.display(), "wrote a template config");
    }
    debug!(?args, "starting reorg");

    let result = match &args.command {
        Command::PrintConfig => print_config(&cfg, &source),
        Command::Snapshot { dir, persist } => snapshot(&cfg, dir, *persist),
        Command::Diff { dir, edits } => diff(&cfg, dir, edits),
        Command::Apply {
            dir,
            edits,
            yes,
            on_locked,
        } => apply_edits_to_disk(&cfg, dir, edits, *yes, *on_locked),
    };
    if let Err(e) = &result {
        error!(error = %format!("{e:#}"), "command failed");
    }

    if let Ok(mut g) = guard_slot.lock() {
        let _ = g.take();
    }
    result
}

fn print_config(cfg: &Config, source: &ConfigSource) -> Result<()> {
    match source {
        ConfigSource::File(p) => out::print_info(&format!("Using config file:\n  {}", p.display())),
        ConfigSource::CreatedTemplate(p) => {
            out::print_success(&format!("A template config was written to:\n  {}", p.display()))
        }
        ConfigSource::Defaults => out::print_info("No config file in use; built-in defaults apply."),
    }
    out::print_user(&format!("log_level      = {}", cfg.log_level));
    out::print_user(&format!("log_file       = {}", display_opt(cfg.log_file.as_deref())));
    out::print_user(&format!("cache_dir      = {}", display_opt(cfg.cache_dir.as_deref())));
    out::print_user(&format!("history_limit  = {}", cfg.history_limit));
    out::print_user(&format!("merge_folders  = {}", cfg.merge_folders));
    out::print_user(&format!("probe_locks    = {}", cfg.probe_locks));
    out::print_user(&format!("reserved_names = {}", cfg.names.reserved.join(",")));
    out::print_user(&format!("ignore         = {}", cfg.scan.ignore.join(",")));
    out::print_user(&format!("atomic_markers = {}", cfg.scan.atomic_markers.join(",")));
    Ok(())
}

fn display_opt(p: Option<&Path>) -> String {
    p.map(|p| p.display().to_string()).unwrap_or_else(|| "(unset)".into())
}

fn snapshot(cfg: &Config, dir: &Path, persist: bool) -> Result<()> {
    let mut scanner = cfg.scanner();
    if persist && scanner.cache_dir.is_none() {
        scanner.cache_dir = default_cache_dir();
    }
    let snap = scanner.generate(dir)?;
    if persist {
        match scanner.persist(&snap)? {
            Some(p) => info!(path = %p.file_path.display(), version = p.version, "snapshot persisted"),
            None => bail!("--persist needs a cache directory (--cache-dir or <cache_dir> in the config)"),
        }
    }
    out::print_json(&snap)
}

/// Scan `dir`, build the tree and run the edit script through a history.
fn stage(cfg: &Config, dir: &Path, edits: &Path) -> Result<Tree> {
    let snap = cfg.scanner().generate(dir)?;
    let mut tree = Tree::build_with_policy(&snap, cfg.tree_policy())?;
    let mut history: History = cfg.history();
    let edits = load_edits(edits)?;
    apply_edits(&mut tree, &mut history, &edits)?;
    debug!(edits = edits.len(), undo = history.undo_len(), "edits staged");
    Ok(tree)
}

fn diff(cfg: &Config, dir: &Path, edits: &Path) -> Result<()> {
    let tree = stage(cfg, dir, edits)?;
    out::print_json(&generate_diff(&tree))
}

fn apply_edits_to_disk(cfg: &Config, dir: &Path, edits: &Path, yes: bool, on_locked: OnLocked) -> Result<()> {
    let tree = stage(cfg, dir, edits)?;
    let diff = generate_diff(&tree);
    if diff.is_empty() {
        out::print_info("Nothing to apply.");
        return Ok(());
    }

    let scanner = cfg.scanner();
    let mut options = ApplyOptions::new()
        .with_confirm(|report: &DryRunReport| {
            out::print_dry_run(report);
            yes || confirm_on_stdin(report)
        })
        .with_snapshot_source(&scanner)
        .with_cancel(shutdown::is_requested);
    options = match on_locked.fixed_decision() {
        Some(decision) => options.with_lock_handler(move |path: &Path| {
            warn!(path = %path.display(), %decision, "file is locked");
            if decision == LockDecision::Retry {
                thread::sleep(RETRY_DELAY);
            }
            decision
        }),
        None => options.with_lock_handler(ask_on_stdin),
    };
    options = if cfg.probe_locks {
        options.with_probe(FsLockProbe)
    } else {
        options.with_probe(NoLockProbe)
    };

    let response = apply(&diff, options);
    if response.results.is_empty() && response.aborted {
        out::print_warn("Apply cancelled; nothing was changed.");
        return Ok(());
    }
    out::print_apply(&response);
    if !response.ok {
        bail!("apply did not complete (uid {})", diff.meta.uid);
    }
    Ok(())
}

fn read_answer(prompt: &str) -> Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush().context("flush stdout")?;
    let mut line = String::new();
    let n = io::stdin().lock().read_line(&mut line).context("read stdin")?;
    Ok((n > 0).then(|| line.trim().to_string()))
}

fn confirm_on_stdin(report: &DryRunReport) -> bool {
    let prompt = if report.is_clean() {
        format!("Apply {} operations? [y/N] ", report.checks.len())
    } else {
        format!(
            "{} of {} operations will fail. Apply anyway? [y/N] ",
            report.issues.len(),
            report.checks.len()
        )
    };
    match read_answer(&prompt) {
        Ok(Some(a)) => matches!(a.to_ascii_lowercase().as_str(), "y" | "yes"),
        Ok(None) => false,
        Err(e) => {
            warn!(error = %e, "could not read confirmation");
            false
        }
    }
}

fn ask_on_stdin(path: &Path) -> LockDecision {
    let prompt = format!("'{}' is locked. [r]etry, [s]kip or [a]bort? ", path.display());
    loop {
        match read_answer(&prompt) {
            Ok(Some(a)) => match a.parse::<LockDecision>() {
                Ok(d) => return d,
                Err(e) => out::print_warn(&e),
            },
            // No input left: nobody can unlock it for us.
            Ok(None) => return LockDecision::Abort,
            Err(e) => {
                warn!(error = %e, "could not read lock decision");
                return LockDecision::Abort;
            }
        }
    }
}

