use std::io;
use std::path::Path;

use reorg::fs_ops::{io_error_message, io_error_with_help, io_error_with_help_io};

#[test]
fn notfound_hint_names_op_and_path() {
    let p = Path::new("/nonexistent/Projects/a.txt");
    let err = io_error_with_help("remove file", p)(io::Error::from(io::ErrorKind::NotFound));
    let msg = err.to_string();
    assert!(msg.starts_with("remove file '/nonexistent/Projects/a.txt'"), "{msg}");
    assert!(msg.contains("path not found"));
}

#[cfg(unix)]
#[test]
fn os_codes_get_platform_hints() {
    let p = Path::new("/tmp");
    let cases = [
        (libc::ENOSPC, "insufficient space"),
        (libc::EROFS, "read-only filesystem"),
        (libc::ENOTEMPTY, "directory not empty"),
        (libc::EXDEV, "cross-filesystem"),
        (libc::EBUSY, "resource busy"),
    ];
    for (code, hint) in cases {
        let msg = io_error_message("rename", p, &io::Error::from_raw_os_error(code));
        assert!(msg.contains(hint), "code {code}: {msg}");
        assert!(msg.contains(&format!("[os code: {code}]")), "{msg}");
    }
}

#[test]
fn io_adapter_preserves_kind() {
    let p = Path::new("/tmp/test.txt");
    let wrapped = io_error_with_help_io("create file", p)(io::Error::from(io::ErrorKind::AlreadyExists));
    assert_eq!(wrapped.kind(), io::ErrorKind::AlreadyExists);
    assert!(wrapped.to_string().contains("already exists"));
}
