//! Locked-file detection and the decision protocol around it.
//!
//! The executor asks a `LockProbe` before touching a file and, when the file
//! is locked, asks the caller's handler for a `LockDecision`. The default
//! probe opens the file for writing (never creating or truncating it) and
//! then tries a non-blocking exclusive advisory lock on the handle:
//! - open fails with NotFound        -> Missing
//! - open fails any other way        -> Locked (EBUSY/EPERM/EACCES included)
//! - advisory lock held elsewhere    -> Locked
//!
//! The probe's handle and lock are released before it returns.

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::str::FromStr;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockStatus {
    Ok,
    Locked,
    Missing,
}

/// What to do about a locked file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockDecision {
    /// Probe again.
    Retry,
    /// Leave this op out; the run continues.
    Skip,
    /// Stop: this and every remaining op is aborted.
    Abort,
}

impl FromStr for LockDecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "retry" | "r" => Ok(LockDecision::Retry),
            "skip" | "s" => Ok(LockDecision::Skip),
            "abort" | "a" => Ok(LockDecision::Abort),
            other => Err(format!("unknown lock decision: {other}")),
        }
    }
}

impl fmt::Display for LockDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LockDecision::Retry => "retry",
            LockDecision::Skip => "skip",
            LockDecision::Abort => "abort",
        })
    }
}

pub trait LockProbe {
    fn probe(&self, path: &Path) -> LockStatus;
}

impl<F> LockProbe for F
where
    F: Fn(&Path) -> LockStatus,
{
    fn probe(&self, path: &Path) -> LockStatus {
        self(path)
    }
}

/// Open-for-write plus advisory-lock probe.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLockProbe;

impl LockProbe for FsLockProbe {
    fn probe(&self, path: &Path) -> LockStatus {
        let file = match OpenOptions::new().write(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                let status = classify_open_error(&e);
                trace!(path = %path.display(), error = %e, ?status, "lock probe: open failed");
                return status;
            }
        };
        match file.try_lock_exclusive() {
            // Dropping the handle releases the lock.
            Ok(()) => LockStatus::Ok,
            Err(e) => {
                trace!(path = %path.display(), error = %e, "lock probe: advisory lock held");
                LockStatus::Locked
            }
        }
    }
}

/// Reports every file as unlocked. Used when lock probing is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLockProbe;

impl LockProbe for NoLockProbe {
    fn probe(&self, _path: &Path) -> LockStatus {
        LockStatus::Ok
    }
}

fn classify_open_error(e: &io::Error) -> LockStatus {
    if e.kind() == io::ErrorKind::NotFound {
        return LockStatus::Missing;
    }
    LockStatus::Locked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decisions_parse_case_insensitively() {
        assert_eq!("Retry".parse::<LockDecision>().unwrap(), LockDecision::Retry);
        assert_eq!(" s ".parse::<LockDecision>().unwrap(), LockDecision::Skip);
        assert_eq!("ABORT".parse::<LockDecision>().unwrap(), LockDecision::Abort);
        assert!("later".parse::<LockDecision>().is_err());
    }

    #[test]
    fn open_errors_are_conservative() {
        let not_found = io::Error::new(io::ErrorKind::NotFound, "x");
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "x");
        let other = io::Error::other("x");
        assert_eq!(classify_open_error(&not_found), LockStatus::Missing);
        assert_eq!(classify_open_error(&denied), LockStatus::Locked);
        assert_eq!(classify_open_error(&other), LockStatus::Locked);
    }

    #[test]
    fn probe_sees_missing_and_free_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        assert_eq!(FsLockProbe.probe(&path), LockStatus::Missing);
        std::fs::write(&path, b"x").unwrap();
        assert_eq!(FsLockProbe.probe(&path), LockStatus::Ok);
        // Probing never truncates.
        assert_eq!(std::fs::read(&path).unwrap(), b"x");
    }

    #[cfg(unix)]
    #[test]
    fn probe_sees_advisory_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("held.txt");
        std::fs::write(&path, b"x").unwrap();
        let holder = std::fs::File::open(&path).unwrap();
        FileExt::try_lock_exclusive(&holder).unwrap();
        assert_eq!(FsLockProbe.probe(&path), LockStatus::Locked);
        drop(holder);
        assert_eq!(FsLockProbe.probe(&path), LockStatus::Ok);
    }
}
