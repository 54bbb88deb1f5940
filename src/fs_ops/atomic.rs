//! Rename with a copy fallback.
//! - Same filesystem: a single `rename`, then a best-effort fsync of the
//!   destination directory (Unix).
//! - Across filesystems (EXDEV): copy the entry (directories via walkdir),
//!   then remove the source.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::helpers::io_error_with_help;
use super::util::{fsync_dir, is_cross_device};

/// Move `src` to `dst`. The destination must not exist.
pub fn move_path(src: &Path, dst: &Path) -> Result<()> {
    match fs::rename(src, dst) {
        Ok(()) => {
            #[cfg(unix)]
            if let Some(parent) = dst.parent() {
                // A failed fsync does not undo a successful rename.
                let _ = fsync_dir(parent);
            }
            debug!(src = %src.display(), dst = %dst.display(), "renamed");
            Ok(())
        }
        Err(e) if is_cross_device(&e) => {
            warn!(src = %src.display(), dst = %dst.display(), "cross-device move; copying");
            copy_then_remove(src, dst)
        }
        Err(e) => Err(io_error_with_help("rename", src)(e)),
    }
}

fn copy_then_remove(src: &Path, dst: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(src).map_err(io_error_with_help("stat source", src))?;
    if !meta.is_dir() {
        copy_entry(src, dst, &meta)?;
        fs::remove_file(src).map_err(io_error_with_help("remove source file", src))?;
        return Ok(());
    }

    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.with_context(|| format!("walk {}", src.display()))?;
        let rel = entry.path().strip_prefix(src)?;
        let target = dst.join(rel);
        let ft = entry.file_type();
        if ft.is_dir() {
            fs::create_dir_all(&target).map_err(io_error_with_help("create directory", &target))?;
        } else {
            let meta = entry
                .metadata()
                .with_context(|| format!("stat {}", entry.path().display()))?;
            copy_entry(entry.path(), &target, &meta)?;
        }
    }
    fs::remove_dir_all(src).map_err(io_error_with_help("remove source directory", src))?;
    Ok(())
}

fn copy_entry(src: &Path, dst: &Path, meta: &fs::Metadata) -> Result<()> {
    #[cfg(unix)]
    if meta.file_type().is_symlink() {
        let link = fs::read_link(src).map_err(io_error_with_help("read symlink", src))?;
        std::os::unix::fs::symlink(&link, dst).map_err(io_error_with_help("create symlink", dst))?;
        return Ok(());
    }
    #[cfg(not(unix))]
    let _ = meta;
    fs::copy(src, dst).map_err(io_error_with_help("copy file", dst))?;
    Ok(())
}
