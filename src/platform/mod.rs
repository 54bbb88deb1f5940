//! Platform-specific helpers.
//! Hides Unix/Windows differences (file modes, durable writes) behind one API.

mod temp;
#[cfg(unix)]
mod unix;
#[cfg(not(unix))]
mod windows;

pub use temp::tmp_sibling_name;

#[cfg(unix)]
pub use unix::{open_log_file_secure_append, set_dir_mode_0700, set_file_mode_0600, write_file_atomic};

#[cfg(not(unix))]
pub use windows::{open_log_file_secure_append, set_dir_mode_0700, set_file_mode_0600, write_file_atomic};
