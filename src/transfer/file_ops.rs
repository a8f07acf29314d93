//! Upload placement
//!
//! Moves spooled uploads into a directory under the root. Each item is
//! handled on its own: a bad name or a failed move is recorded and the
//! batch carries on. Existing files are never overwritten; a free name is
//! reserved with an exclusive create before the bytes are moved over it.

use log::{error, info, warn};
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use crate::error::{PathError, StorageError, UploadError};
use crate::storage::filesystem::{create_directory_all, directory_exists, entry_exists};
use crate::storage::permissions::set_file_mode;
use crate::storage::validation::{ResolvedPath, Root};
use crate::transfer::results::{UploadFailure, UploadItem, UploadReport};

const MAX_COLLISION_ATTEMPTS: u32 = 10_000;

/// Places every item of a batch into `target_dir`, creating it if needed.
///
/// Only a bad target directory fails the whole call; item failures are
/// reported in the returned [`UploadReport`].
pub fn place_uploads(
    root: &Root,
    target_dir: &str,
    items: Vec<UploadItem>,
) -> Result<UploadReport, StorageError> {
    let target = root.resolve_lenient(target_dir)?;
    if entry_exists(target.as_path()) && !directory_exists(target.as_path()) {
        return Err(PathError::NotADirectory(target.relative().to_string()).into());
    }
    if !directory_exists(target.as_path()) {
        create_directory_all(target.as_path())
            .map_err(|e| StorageError::from_io(target.relative(), e))?;
        info!("Created upload directory {:?}", target.relative());
    }
    // Confinement is checked again now that the directory exists.
    let target = root.resolve_dir(target_dir)?;

    let mut uploaded_files = Vec::new();
    let mut errors = Vec::new();

    for item in items {
        let declared = item.declared_name.clone();
        match place_one(&target, item) {
            Ok(name) => {
                info!("Uploaded {:?} as {:?} into {:?}", declared, name, target.relative());
                uploaded_files.push(name);
            }
            Err(e) => {
                warn!("Upload of {:?} failed: {}", declared, e);
                errors.push(UploadFailure {
                    file: declared,
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(UploadReport::new(uploaded_files, errors))
}

fn place_one(dir: &ResolvedPath, item: UploadItem) -> Result<String, UploadError> {
    let source = item.payload?;

    let clean = sanitize_filename(&item.declared_name)
        .ok_or_else(|| UploadError::InvalidName(item.declared_name.clone()))?;

    let (final_path, final_name) = reserve_name(dir.as_path(), &clean).map_err(|e| {
        error!("No free name for {:?} in {}: {}", clean, dir.as_path().display(), e);
        UploadError::Write(e.to_string())
    })?;

    if let Err(e) = move_into_place(&source, &final_path) {
        error!(
            "Failed to move {} to {}: {}",
            source.display(),
            final_path.display(),
            e
        );
        let _ = fs::remove_file(&final_path);
        return Err(UploadError::Write(e.to_string()));
    }

    if let Err(e) = set_file_mode(&final_path) {
        warn!("Failed to set mode on {}: {}", final_path.display(), e);
    }

    Ok(final_name)
}

/// Keeps only `[A-Za-z0-9_.-]`. `None` when nothing usable is left.
pub fn sanitize_filename(declared: &str) -> Option<String> {
    let clean: String = declared
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    match clean.as_str() {
        "" | "." | ".." => None,
        _ => Some(clean),
    }
}

/// `name.ext` for attempt 0, then `name(1).ext`, `name(2).ext`, ...
pub fn candidate_name(clean: &str, attempt: u32) -> String {
    if attempt == 0 {
        return clean.to_string();
    }
    match clean.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}({attempt}).{ext}"),
        _ => format!("{clean}({attempt})"),
    }
}

fn reserve_name(dir: &Path, clean: &str) -> io::Result<(PathBuf, String)> {
    for attempt in 0..MAX_COLLISION_ATTEMPTS {
        let name = candidate_name(clean, attempt);
        let path = dir.join(&name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => return Ok((path, name)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(
        ErrorKind::AlreadyExists,
        "too many files with this name",
    ))
}

/// Renames over the reserved file; copies in chunks when the staging area
/// lives on another filesystem.
fn move_into_place(source: &Path, destination: &Path) -> io::Result<()> {
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            let mut reader = File::open(source)?;
            let mut writer = OpenOptions::new()
                .write(true)
                .truncate(true)
                .open(destination)?;
            io::copy(&mut reader, &mut writer)?;
            writer.sync_all()?;
            fs::remove_file(source)
        }
        Err(e) => Err(e),
    }
}
