//! Pure path and name helpers.
//!
//! - `normalize` collapses `.`/`..`, keeps a drive-letter or slash root verbatim
//!   and strips trailing separators.
//! - `ensure_valid_name` checks a single node name against a `NamePolicy`.
//! - `split_stem_and_extension` / `with_numeric_suffix` implement the
//!   `name-N.ext` conflict-suffix scheme used by the tree.

use serde::{Deserialize, Serialize};

use crate::errors::{NameError, PathError};

/// Characters never allowed inside a node name.
pub const INVALID_NAME_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// How `normalize` treats `..` segments that would climb above the start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// `..` past the root is an error.
    RelativeOnly,
    /// `..` past a root is dropped; leading `..` on relative paths is kept.
    Lenient,
}

/// Name validation rules. Handed to each tree at construction so sessions can
/// run with different reserved-name tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamePolicy {
    pub reserved: Vec<String>,
}

impl Default for NamePolicy {
    fn default() -> Self {
        let mut reserved: Vec<String> = ["CON", "PRN", "AUX", "NUL"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        reserved.extend((1..=9).map(|n| format!("COM{n}")));
        reserved.extend((1..=9).map(|n| format!("LPT{n}")));
        Self { reserved }
    }
}

impl NamePolicy {
    /// A policy without any reserved names.
    pub fn permissive() -> Self {
        Self { reserved: Vec::new() }
    }

    fn is_reserved(&self, name: &str) -> bool {
        let head = name.split('.').next().unwrap_or(name);
        self.reserved
            .iter()
            .any(|r| r.eq_ignore_ascii_case(name) || r.eq_ignore_ascii_case(head))
    }
}

/// Split off a drive (`C:` / `C:/`) or slash root. Returns (root, rest).
fn split_root(p: &str) -> (&str, &str) {
    let bytes = p.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        if bytes.len() >= 3 && bytes[2] == b'/' {
            return (&p[..3], &p[3..]);
        }
        return (&p[..2], &p[2..]);
    }
    if bytes.first() == Some(&b'/') {
        return (&p[..1], &p[1..]);
    }
    ("", p)
}

/// Normalize a slash- or backslash-separated path.
///
/// Idempotent: `normalize(normalize(p)?, k)? == normalize(p, k)?`.
pub fn normalize(raw: &str, kind: PathKind) -> Result<String, PathError> {
    let unified = raw.replace('\\', "/");
    let (root, rest) = split_root(&unified);

    let mut out: Vec<&str> = Vec::new();
    for seg in rest.split('/') {
        match seg {
            "" | "." => continue,
            ".." => match out.last() {
                Some(&last) if last != ".." => {
                    out.pop();
                }
                _ => match kind {
                    PathKind::RelativeOnly => {
                        return Err(PathError::PathEscapesRoot(raw.to_string()));
                    }
                    // Rooted paths cannot climb above the root.
                    PathKind::Lenient if !root.is_empty() => {}
                    PathKind::Lenient => out.push(".."),
                },
            },
            other => out.push(other),
        }
    }

    let joined = out.join("/");
    if root.is_empty() {
        if joined.is_empty() {
            return Ok(".".to_string());
        }
        return Ok(joined);
    }
    Ok(format!("{root}{joined}"))
}

/// Validate a single node name.
pub fn ensure_valid_name(name: &str, policy: &NamePolicy) -> Result<(), NameError> {
    if name.trim().is_empty() {
        return Err(NameError::EmptyName);
    }
    if name == "." || name == ".." {
        return Err(NameError::InvalidCharacters(name.to_string()));
    }
    if name
        .chars()
        .any(|c| INVALID_NAME_CHARS.contains(&c) || c.is_ascii_control())
    {
        return Err(NameError::InvalidCharacters(name.to_string()));
    }
    if policy.is_reserved(name) {
        return Err(NameError::ReservedName(name.to_string()));
    }
    Ok(())
}

/// Split at the last dot. Dotfiles (`.env`) have no extension.
pub fn split_stem_and_extension(name: &str) -> (&str, Option<&str>) {
    if name.starts_with('.') {
        return (name, None);
    }
    match name.rfind('.') {
        Some(pos) if pos + 1 < name.len() => (&name[..pos], Some(&name[pos + 1..])),
        _ => (name, None),
    }
}

/// `main.tsx` + 2 -> `main-2.tsx`; `docs` + 1 -> `docs-1`.
pub fn with_numeric_suffix(name: &str, n: u64) -> String {
    match split_stem_and_extension(name) {
        (stem, Some(ext)) => format!("{stem}-{n}.{ext}"),
        (stem, None) => format!("{stem}-{n}"),
    }
}

/// Split a tree path into its non-empty segments.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(['/', '\\']).filter(|s| !s.is_empty())
}

/// Number of segments in a tree path (`Root` = 1, `Root/a` = 2).
pub fn depth(path: &str) -> usize {
    segments(path).count()
}

/// Everything before the last segment; empty for single-segment paths.
pub fn parent_of(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(pos) => &trimmed[..pos],
        None => "",
    }
}

/// The last segment of a tree path.
pub fn base_name(path: &str) -> &str {
    segments(path).last().unwrap_or("")
}
