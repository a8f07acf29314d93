//! Storage operations
//!
//! Create-folder, rename and recursive delete. Every path argument goes
//! through the root resolver before anything touches the filesystem.

use log::{error, info};
use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

use crate::error::StorageError;
use crate::storage::filesystem::{create_directory, entry_exists};
use crate::storage::permissions::is_writable;
use crate::storage::results::{DeleteFailure, DeleteReport, MutationResult};
use crate::storage::validation::{EntryName, Root};

/// Creates a new folder `name` inside `parent`.
///
/// Not idempotent: a second call with the same name fails with
/// `AlreadyExists`. Two racing calls are settled by the non-recursive
/// `mkdir`, whose `EEXIST` maps to the same error.
pub fn create_folder(root: &Root, parent: &str, name: &str) -> Result<MutationResult, StorageError> {
    let name = EntryName::parse(name)?;
    let parent = root.resolve_dir(parent)?;
    let target = parent.child(&name);

    if entry_exists(target.as_path()) {
        return Err(StorageError::AlreadyExists(target.relative().to_string()));
    }

    create_directory(target.as_path()).map_err(|e| {
        error!("Failed to create folder {}: {}", target.as_path().display(), e);
        StorageError::from_io(target.relative(), e)
    })?;

    info!("Created folder {:?}", target.relative());
    Ok(MutationResult::ok("Folder created successfully"))
}

/// Renames the entry at `old_path` to `new_name` within the same directory.
pub fn rename_entry(
    root: &Root,
    old_path: &str,
    new_name: &str,
) -> Result<MutationResult, StorageError> {
    let name = EntryName::parse(new_name)?;
    let source = root.resolve_entry(old_path)?;
    let target = source.sibling(&name);

    if entry_exists(target.as_path()) {
        return Err(StorageError::AlreadyExists(target.relative().to_string()));
    }

    fs::rename(source.as_path(), target.as_path()).map_err(|e| {
        error!(
            "Failed to rename {} to {}: {}",
            source.as_path().display(),
            target.as_path().display(),
            e
        );
        StorageError::from_io(target.relative(), e)
    })?;

    info!("Renamed {:?} to {:?}", source.relative(), target.relative());
    Ok(MutationResult::ok("Renamed successfully"))
}

/// Deletes a file, link or directory tree.
///
/// Directories are removed depth-first, children before parents, without
/// following links. Failures are collected rather than stopping the walk;
/// whatever could not be removed is reported and nothing is restored.
pub fn delete_entry(root: &Root, path: &str) -> Result<DeleteReport, StorageError> {
    let entry = root.resolve_entry(path)?;
    let deleted_file = entry.name().unwrap_or_default().to_string();

    let metadata = fs::symlink_metadata(entry.as_path())
        .map_err(|e| StorageError::from_io(entry.relative(), e))?;

    let removed = if metadata.is_dir() {
        let (removed, failures) = remove_tree(root, entry.as_path(), remove_node);
        if !failures.is_empty() {
            error!(
                "Delete of {:?} left {} entries behind ({} removed)",
                entry.relative(),
                failures.len(),
                removed
            );
            return Err(StorageError::PartialDelete {
                path: entry.relative().to_string(),
                failures,
            });
        }
        removed
    } else {
        fs::remove_file(entry.as_path()).map_err(|e| {
            error!("Failed to delete {}: {}", entry.as_path().display(), e);
            StorageError::from_io(entry.relative(), e)
        })?;
        1
    };

    info!("Deleted {:?} ({} entries)", entry.relative(), removed);
    Ok(DeleteReport {
        success: true,
        message: "Deleted successfully".to_string(),
        deleted_file,
        removed,
    })
}

fn remove_node(path: &Path, is_dir: bool) -> io::Result<()> {
    if is_dir {
        fs::remove_dir(path)
    } else {
        fs::remove_file(path)
    }
}

fn remove_tree<F>(root: &Root, dir: &Path, remove: F) -> (usize, Vec<DeleteFailure>)
where
    F: Fn(&Path, bool) -> io::Result<()>,
{
    let mut removed = 0;
    let mut failures = Vec::new();

    for item in WalkDir::new(dir).follow_links(false).contents_first(true) {
        let (path, result) = match item {
            Ok(node) => {
                let result = remove(node.path(), node.file_type().is_dir());
                (node.path().to_path_buf(), result)
            }
            Err(e) => {
                let path = e.path().unwrap_or(dir).to_path_buf();
                let cause = e
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::other("filesystem loop"));
                (path, Err(cause))
            }
        };

        match result {
            Ok(()) => removed += 1,
            Err(e) => failures.push(DeleteFailure {
                path: relative_to_root(root, &path),
                reason: e.to_string(),
                parent_writable: path.parent().is_some_and(is_writable),
            }),
        }
    }

    (removed, failures)
}

fn relative_to_root(root: &Root, path: &Path) -> String {
    path.strip_prefix(root.path())
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default()
}
