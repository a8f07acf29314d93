//! Directory listing implementation

use chrono::{DateTime, Local};
use log::{debug, info, warn};
use std::fs::{self, Metadata};
use std::io;
use std::path::Path;
use std::time::SystemTime;

use crate::error::{PathError, StorageError};
use crate::navigate::classify::{classify, extension_of};
use crate::navigate::results::{Breadcrumb, Entry, EntryKind, Listing};
use crate::navigate::sort::sort_entries;
use crate::storage::validation::{Root, join_relative};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Lists the direct children of a directory under the root.
///
/// Folders come first, then files, each group in natural name order.
pub fn list_directory(
    root: &Root,
    relative: &str,
    root_label: &str,
) -> Result<Listing, StorageError> {
    let dir = root.resolve_dir(relative)?;

    let read_dir = fs::read_dir(dir.as_path()).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            StorageError::Path(PathError::NotFound(dir.relative().to_string()))
        }
        _ => StorageError::from_io(dir.relative(), e),
    })?;

    let mut items = Vec::new();
    for child in read_dir {
        let child = match child {
            Ok(child) => child,
            Err(e) => {
                warn!("Skipping unreadable entry in {:?}: {}", dir.relative(), e);
                continue;
            }
        };

        let name = child.file_name().to_string_lossy().to_string();
        let path = child.path();
        let metadata = match entry_metadata(root, &path) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Skipping {:?} in {:?}: {}", name, dir.relative(), e);
                continue;
            }
        };

        let item_path = join_relative(dir.relative(), &name);
        let modified = format_timestamp(metadata.modified().ok());

        let entry = if metadata.is_dir() {
            Entry {
                id: entry_id(&item_path),
                name,
                path: item_path,
                modified,
                kind: EntryKind::Folder,
                size: None,
                extension: None,
                mime_type: None,
            }
        } else {
            let extension = extension_of(&name);
            let mime_type = mime_guess::from_path(&name)
                .first_or_octet_stream()
                .to_string();
            Entry {
                id: entry_id(&item_path),
                kind: classify(&extension),
                size: Some(metadata.len()),
                extension: Some(extension),
                mime_type: Some(mime_type),
                name,
                path: item_path,
                modified,
            }
        };
        items.push(entry);
    }

    sort_entries(&mut items);

    info!(
        "Listed directory {:?} - {} entries",
        dir.relative(),
        items.len()
    );

    Ok(Listing {
        success: true,
        current_path: dir.relative().to_string(),
        breadcrumbs: build_breadcrumbs(dir.relative(), root_label),
        items,
    })
}

/// Root first with an empty path, then one crumb per segment.
pub fn build_breadcrumbs(relative: &str, root_label: &str) -> Vec<Breadcrumb> {
    let mut breadcrumbs = vec![Breadcrumb {
        name: root_label.to_string(),
        path: String::new(),
    }];

    let mut accumulated = String::new();
    for part in relative.split('/').filter(|p| !p.is_empty()) {
        accumulated = join_relative(&accumulated, part);
        breadcrumbs.push(Breadcrumb {
            name: part.to_string(),
            path: accumulated.clone(),
        });
    }

    breadcrumbs
}

/// Links are followed only when their target stays under the root;
/// otherwise the link itself is described.
fn entry_metadata(root: &Root, path: &Path) -> io::Result<Metadata> {
    let own = fs::symlink_metadata(path)?;
    if !own.file_type().is_symlink() {
        return Ok(own);
    }
    match path.canonicalize() {
        Ok(target) if target.starts_with(root.path()) => fs::metadata(&target),
        _ => {
            debug!("Not following link {} out of the root", path.display());
            Ok(own)
        }
    }
}

fn entry_id(relative: &str) -> String {
    format!("{:x}", md5::compute(relative.as_bytes()))
}

fn format_timestamp(time: Option<SystemTime>) -> String {
    let time = time.unwrap_or(SystemTime::UNIX_EPOCH);
    DateTime::<Local>::from(time).format(TIMESTAMP_FORMAT).to_string()
}
