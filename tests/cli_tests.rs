use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::{TempDir, tempdir};

use reorg::cli::{Args, Command as Sub, OnLocked};
use reorg::config::{Config, LogLevel};
use reorg::fs_ops::LockDecision;

#[test]
fn effective_log_level_precedence() {
    let args = Args::parse_from(["reorg", "--debug", "--log-level", "quiet", "print-config"]);
    assert_eq!(args.effective_log_level(), Some(LogLevel::Debug));

    let args = Args::parse_from(["reorg", "--log-level", "info", "print-config"]);
    assert_eq!(args.effective_log_level(), Some(LogLevel::Info));

    let args = Args::parse_from(["reorg", "print-config"]);
    assert_eq!(args.effective_log_level(), None);
}

#[test]
fn apply_overrides_sets_flags() {
    let args = Args::parse_from([
        "reorg",
        "--log-level",
        "quiet",
        "--log-file",
        "/logs/reorg.log",
        "--cache-dir",
        "/cache",
        "print-config",
    ]);
    let mut cfg = Config::default();
    args.apply_overrides(&mut cfg);
    assert_eq!(cfg.log_level, LogLevel::Quiet);
    assert_eq!(cfg.log_file, Some(PathBuf::from("/logs/reorg.log")));
    assert_eq!(cfg.cache_dir, Some(PathBuf::from("/cache")));
}

#[test]
fn unset_flags_leave_config_alone() {
    let args = Args::parse_from(["reorg", "print-config"]);
    let mut cfg = Config {
        log_level: LogLevel::Info,
        cache_dir: Some(PathBuf::from("/keep")),
        ..Config::default()
    };
    args.apply_overrides(&mut cfg);
    assert_eq!(cfg.log_level, LogLevel::Info);
    assert_eq!(cfg.cache_dir, Some(PathBuf::from("/keep")));
}

#[test]
fn apply_subcommand_parses() {
    let args = Args::parse_from(["reorg", "apply", "/data", "--edits", "e.json", "-y", "--on-locked", "skip"]);
    match args.command {
        Sub::Apply {
            dir,
            edits,
            yes,
            on_locked,
        } => {
            assert_eq!(dir, PathBuf::from("/data"));
            assert_eq!(edits, PathBuf::from("e.json"));
            assert!(yes);
            assert_eq!(on_locked, OnLocked::Skip);
            assert_eq!(on_locked.fixed_decision(), Some(LockDecision::Skip));
        }
        other => panic!("unexpected command: {other:?}"),
    }
    assert_eq!(OnLocked::Ask.fixed_decision(), None);
}

#[test]
fn apply_requires_an_edit_script() {
    assert!(Args::try_parse_from(["reorg", "apply", "/data"]).is_err());
}

/// `<tmp>/Work/{a.txt, src/main.rs}` plus a quiet config at `<tmp>/config.xml`.
fn workspace() -> (TempDir, PathBuf, PathBuf) {
    let td = tempdir().unwrap();
    let work = td.path().join("Work");
    fs::create_dir_all(work.join("src")).unwrap();
    fs::write(work.join("a.txt"), "a").unwrap();
    fs::write(work.join("src/main.rs"), "fn main() {}").unwrap();
    let cfg = td.path().join("config.xml");
    fs::write(&cfg, "<config><log_level>quiet</log_level><probe_locks>false</probe_locks></config>").unwrap();
    (td, work, cfg)
}

fn run(cfg: &Path, args: &[&str]) -> Output {
    let me = assert_cmd::cargo::cargo_bin!("reorg");
    Command::new(me)
        .env("REORG_CONFIG", cfg)
        .args(args)
        .output()
        .expect("spawn binary")
}

fn write_edits(td: &TempDir, json: &str) -> PathBuf {
    let path = td.path().join("edits.json");
    fs::write(&path, json).unwrap();
    path
}

#[test]
fn binary_print_config_succeeds() {
    let (_td, _work, cfg) = workspace();
    let out = run(&cfg, &["print-config"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("probe_locks    = false"), "{stdout}");
}

#[test]
fn binary_snapshot_prints_json() {
    let (_td, work, cfg) = workspace();
    let out = run(&cfg, &["snapshot", work.to_str().unwrap()]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["tree"]["name"], "Work");
    assert_eq!(json["tree"]["children"].as_array().unwrap().len(), 2);
}

#[test]
fn binary_snapshot_persists_into_cache_dir() {
    let (td, work, cfg) = workspace();
    let cache = td.path().join("cache");
    let out = run(
        &cfg,
        &["--cache-dir", cache.to_str().unwrap(), "snapshot", "--persist", work.to_str().unwrap()],
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(cache.join("snapshot-v1.json").is_file());
}

#[test]
fn binary_diff_prints_ops_without_touching_disk() {
    let (td, work, cfg) = workspace();
    let edits = write_edits(&td, r#"[{ "op": "rename", "path": "Work/a.txt", "name": "b.txt" }]"#);
    let out = run(&cfg, &["diff", work.to_str().unwrap(), "--edits", edits.to_str().unwrap()]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let ops = json["ops"].as_array().unwrap();
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0]["type"], "rename");
    assert_eq!(ops[0]["toPath"], "Work/b.txt");
    assert!(work.join("a.txt").exists());
}

#[test]
fn binary_apply_moves_files() {
    let (td, work, cfg) = workspace();
    let edits = write_edits(
        &td,
        r#"[
            { "op": "create", "parent": "Work", "name": "notes", "kind": "folder" },
            { "op": "move", "path": "Work/a.txt", "to": "Work/notes" }
        ]"#,
    );
    let out = run(&cfg, &["apply", work.to_str().unwrap(), "--edits", edits.to_str().unwrap(), "--yes"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(fs::read_to_string(work.join("notes/a.txt")).unwrap(), "a");
    assert!(!work.join("a.txt").exists());
}

#[test]
fn binary_apply_exits_non_zero_when_an_op_fails() {
    let (td, work, cfg) = workspace();
    // Ignored by the scanner, so the tree does not know it is there.
    fs::write(work.join(".DS_Store"), "").unwrap();
    let edits = write_edits(
        &td,
        r#"[
            { "op": "create", "parent": "Work", "name": ".DS_Store" },
            { "op": "rename", "path": "Work/a.txt", "name": "z.txt" }
        ]"#,
    );
    let out = run(&cfg, &["apply", work.to_str().unwrap(), "--edits", edits.to_str().unwrap(), "-y"]);
    assert!(!out.status.success());
    // The other op still ran.
    assert!(work.join("z.txt").exists());
}

#[test]
fn binary_rejects_a_bad_edit_script() {
    let (td, work, cfg) = workspace();
    let edits = write_edits(&td, r#"[{ "op": "delete", "path": "Work/ghost.txt" }]"#);
    let out = run(&cfg, &["diff", work.to_str().unwrap(), "--edits", edits.to_str().unwrap()]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Work/ghost.txt"), "{stderr}");
}

#[test]
fn binary_missing_env_config_fails() {
    let td = tempdir().unwrap();
    let out = run(&td.path().join("absent.xml"), &["print-config"]);
    assert!(!out.status.success());
}
