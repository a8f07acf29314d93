//! File permissions
//!
//! Handles file permission management.

use std::fs;
use std::io;
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Mode applied to every placed upload: readable, never executable
pub const FILE_MODE: u32 = 0o644;

/// Check if a path carries any write permission bit
pub fn is_writable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|metadata| !metadata.permissions().readonly())
        .unwrap_or(false)
}

/// Apply the standard non-executable file mode
#[cfg(unix)]
pub fn set_file_mode(path: &Path) -> io::Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(FILE_MODE))
}

#[cfg(not(unix))]
pub fn set_file_mode(_path: &Path) -> io::Result<()> {
    Ok(())
}
