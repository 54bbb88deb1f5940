//! I/O error enrichment.
//!
//! Adapters that turn a bare `io::Error` into a message naming the operation,
//! the path, and a platform hint. Usable with `map_err` in both
//! `anyhow::Result` and `io::Result` code:
//!
//!   fs::create_dir_all(dir).map_err(io_error_with_help("create dir", dir))?;
//!   File::open(p).map_err(io_error_with_help_io("open file", p))?;

use anyhow::anyhow;
use std::io;
use std::path::Path;

fn os_hint(code: i32) -> Option<&'static str> {
    #[cfg(unix)]
    {
        match code {
            libc::EACCES | libc::EPERM => Some("permission denied; check ownership and write permissions"),
            libc::EXDEV => Some("cross-filesystem; rename not possible, copy required"),
            libc::EBUSY => Some("resource busy; another process is using it"),
            libc::ENOENT => Some("path not found; it may have moved since the snapshot"),
            libc::EEXIST => Some("already exists; the destination is occupied"),
            libc::ENOTEMPTY => Some("directory not empty; it holds entries the snapshot did not know about"),
            libc::ENOTDIR => Some("a path component is not a directory"),
            libc::EISDIR => Some("is a directory"),
            libc::ENOSPC => Some("insufficient space on device"),
            libc::EROFS => Some("read-only filesystem"),
            libc::ELOOP => Some("too many symbolic link levels"),
            libc::ENAMETOOLONG => Some("filename or path too long"),
            libc::EMFILE | libc::ENFILE => Some("too many open files"),
            _ => None,
        }
    }
    #[cfg(windows)]
    {
        match code {
            5 => Some("access denied; check permissions"),
            17 => Some("not same device; rename not possible, copy required"),
            32 | 33 => Some("sharing violation; the file is in use"),
            2 | 3 => Some("path not found; it may have moved since the snapshot"),
            80 | 183 => Some("already exists; the destination is occupied"),
            145 => Some("directory not empty"),
            112 => Some("insufficient disk space"),
            206 => Some("filename or path too long"),
            _ => None,
        }
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = code;
        None
    }
}

fn kind_hint(kind: io::ErrorKind) -> Option<&'static str> {
    match kind {
        io::ErrorKind::PermissionDenied => Some("permission denied"),
        io::ErrorKind::NotFound => Some("path not found"),
        io::ErrorKind::AlreadyExists => Some("already exists"),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Some("busy; retry later"),
        _ => None,
    }
}

/// `"{op} '{path}': {error}; {hint} [os code: N]"`.
pub fn io_error_message(op: &str, path: &Path, e: &io::Error) -> String {
    let mut msg = format!("{} '{}': {}", op, path.display(), e);
    match e.raw_os_error() {
        Some(code) => {
            if let Some(hint) = os_hint(code) {
                msg.push_str("; ");
                msg.push_str(hint);
            }
            msg.push_str(&format!(" [os code: {code}]"));
        }
        None => {
            if let Some(hint) = kind_hint(e.kind()) {
                msg.push_str("; ");
                msg.push_str(hint);
            }
        }
    }
    msg
}

/// `map_err` adapter for `anyhow::Result` code.
pub fn io_error_with_help<'a>(op: &'a str, path: &'a Path) -> impl FnOnce(io::Error) -> anyhow::Error + 'a {
    move |e: io::Error| anyhow!(io_error_message(op, path, &e))
}

/// `map_err` adapter for `io::Result` code; keeps the original `ErrorKind`.
pub fn io_error_with_help_io<'a>(op: &'a str, path: &'a Path) -> impl FnOnce(io::Error) -> io::Error + 'a {
    move |e: io::Error| io::Error::new(e.kind(), io_error_message(op, path, &e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_names_op_and_path() {
        let e = io::Error::new(io::ErrorKind::NotFound, "gone");
        let msg = io_error_message("remove file", Path::new("/x/y"), &e);
        assert!(msg.starts_with("remove file '/x/y': gone"));
        assert!(msg.contains("path not found"));
    }

    #[cfg(unix)]
    #[test]
    fn os_code_is_reported() {
        let e = io::Error::from_raw_os_error(libc::EBUSY);
        let msg = io_error_message("rename", Path::new("a"), &e);
        assert!(msg.contains("resource busy"));
        assert!(msg.contains(&format!("[os code: {}]", libc::EBUSY)));
    }
}
