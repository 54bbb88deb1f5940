//! XML configuration support.
//! - Loads settings from config.xml (quick_xml + serde, unknown fields rejected).
//! - Creates a commented template at the default location when missing.
//!
//! List fields are comma-separated and replace the default list wholesale;
//! a missing element keeps the default.

use anyhow::{Context, Result, anyhow, bail};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::paths::{CONFIG_ENV, default_config_path, path_has_symlink_ancestor};
use super::types::{Config, LogLevel};
use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::platform::{set_dir_mode_0700, set_file_mode_0600, write_file_atomic};

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Default, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    log_level: Option<String>,
    log_file: Option<String>,
    cache_dir: Option<String>,
    history_limit: Option<String>,
    merge_folders: Option<String>,
    probe_locks: Option<String>,
    reserved_names: Option<String>,
    ignore: Option<String>,
    atomic_markers: Option<String>,
}

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// A template was just written here; defaults are in effect.
    CreatedTemplate(PathBuf),
    Defaults,
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_bool(field: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        other => bail!("{field}: expected true/false, got '{other}'"),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// Map XmlConfig -> Config on top of the defaults.
fn xml_to_config(parsed: XmlConfig) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(s) = non_empty(parsed.log_level.as_deref()) {
        cfg.log_level = s.parse::<LogLevel>().map_err(|e| anyhow!("log_level: {e}"))?;
    }
    cfg.log_file = non_empty(parsed.log_file.as_deref()).map(PathBuf::from);
    cfg.cache_dir = non_empty(parsed.cache_dir.as_deref()).map(PathBuf::from);
    if let Some(s) = non_empty(parsed.history_limit.as_deref()) {
        cfg.history_limit = s
            .parse()
            .with_context(|| format!("history_limit: expected a number, got '{s}'"))?;
    }
    if let Some(s) = non_empty(parsed.merge_folders.as_deref()) {
        cfg.merge_folders = parse_bool("merge_folders", s)?;
    }
    if let Some(s) = non_empty(parsed.probe_locks.as_deref()) {
        cfg.probe_locks = parse_bool("probe_locks", s)?;
    }
    if let Some(s) = parsed.reserved_names.as_deref() {
        cfg.names.reserved = parse_list(s);
    }
    if let Some(s) = parsed.ignore.as_deref() {
        cfg.scan.ignore = parse_list(s);
    }
    if let Some(s) = parsed.atomic_markers.as_deref() {
        cfg.scan.atomic_markers = parse_list(s);
    }
    Ok(cfg)
}

/// Load a Config from a specific XML file.
pub fn load_config_from_xml_path(path: &Path) -> Result<Config> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config xml '{}'", path.display()))?;
    let parsed: XmlConfig = if contents.trim().is_empty() {
        XmlConfig::default()
    } else {
        from_xml_str(&contents).with_context(|| format!("parse config xml '{}'", path.display()))?
    };
    let cfg = xml_to_config(parsed).with_context(|| format!("in config xml '{}'", path.display()))?;
    debug!(path = %path.display(), "config loaded");
    Ok(cfg)
}

/// Resolve and load the configuration.
///
/// Precedence: `explicit` path, then `$REORG_CONFIG`, then the default path.
/// An explicit or environment path must exist; a missing default file is
/// replaced by a template and defaults are used.
pub fn load_config(explicit: Option<&Path>) -> Result<(Config, ConfigSource)> {
    let from_env = env::var_os(CONFIG_ENV).is_some_and(|v| !v.is_empty());
    let required = explicit.is_some() || from_env;
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => match default_config_path() {
            Some(p) => p,
            None => return Ok((Config::default(), ConfigSource::Defaults)),
        },
    };

    if path.is_file() {
        let cfg = load_config_from_xml_path(&path)?;
        return Ok((cfg, ConfigSource::File(path)));
    }
    if required {
        bail!("config file not found: {}", path.display());
    }
    match create_template_config(&path) {
        Ok(()) => Ok((Config::default(), ConfigSource::CreatedTemplate(path))),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "could not create template config");
            Ok((Config::default(), ConfigSource::Defaults))
        }
    }
}

/// Write the commented default template. Refuses symlinked ancestors and
/// existing files.
pub fn create_template_config(path: &Path) -> Result<()> {
    if path_has_symlink_ancestor(path)? {
        bail!("Refusing to create config: ancestor of {} is a symlink", path.display());
    }
    if path.exists() {
        bail!("Config file already exists: {}", path.display());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create config dir '{}'", parent.display()))?;
        let _ = set_dir_mode_0700(parent);
    }

    let defaults = Config::default();
    let content = format!(
        "<!--\n  reorg configuration (XML)\n\n  log_level       -> quiet | normal | info | debug\n  log_file        -> path to a log file (optional)\n  cache_dir       -> directory for persisted snapshots (optional)\n  history_limit   -> undo steps kept per session\n  merge_folders   -> moving a folder onto a same-named folder merges them (true/false)\n  probe_locks     -> check files for locks before touching them (true/false)\n  reserved_names  -> comma-separated names refused for new nodes\n  ignore          -> comma-separated entry names skipped when scanning\n  atomic_markers  -> comma-separated file names marking a folder as one opaque unit\n\n  CLI flags override values here.\n-->\n<config>\n  <log_level>{}</log_level>\n  <log_file></log_file>\n  <cache_dir></cache_dir>\n  <history_limit>{}</history_limit>\n  <merge_folders>{}</merge_folders>\n  <probe_locks>{}</probe_locks>\n  <reserved_names>{}</reserved_names>\n  <ignore>{}</ignore>\n  <atomic_markers>{}</atomic_markers>\n</config>\n",
        defaults.log_level,
        DEFAULT_HISTORY_LIMIT,
        defaults.merge_folders,
        defaults.probe_locks,
        defaults.names.reserved.join(","),
        defaults.scan.ignore.join(","),
        defaults.scan.atomic_markers.join(","),
    );

    write_file_atomic(path, content.as_bytes())?;
    let _ = set_file_mode_0600(path);

    info!("Created template config at {}", path.display());
    Ok(())
}
