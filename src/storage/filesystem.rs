//! File system operations
//!
//! Thin wrappers over `std::fs` that apply the server's standard modes.

use std::fs::{self, DirBuilder};
use std::io::Result;
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::DirBuilderExt;

const DIRECTORY_MODE: u32 = 0o755;

/// Create a single directory; fails with `AlreadyExists` if anything is there
pub fn create_directory(path: &Path) -> Result<()> {
    let mut builder = DirBuilder::new();
    #[cfg(unix)]
    builder.mode(DIRECTORY_MODE);
    builder.create(path)
}

/// Create a directory and any missing parents
pub fn create_directory_all(path: &Path) -> Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(DIRECTORY_MODE);
    builder.create(path)
}

/// Check if anything (file, directory or link) exists at `path` without following links
pub fn entry_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Check if directory exists
pub fn directory_exists(path: &Path) -> bool {
    path.is_dir()
}
