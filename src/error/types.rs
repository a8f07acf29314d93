//! Error types
//!
//! Defines domain-specific error types for each module of the file manager.
//! Messages carry the client-supplied relative path only; absolute paths
//! stay in the log.

use std::io;
use thiserror::Error;

use crate::storage::DeleteFailure;

/// Path resolution errors
#[derive(Debug, Error)]
pub enum PathError {
    #[error("Access denied: {0}")]
    Confinement(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("Not a directory: {0}")]
    NotADirectory(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Storage module errors (listing and mutations)
#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Permission denied: {path}: {source}")]
    PermissionDenied {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Partially deleted {path}: {} entries could not be removed", failures.len())]
    PartialDelete {
        path: String,
        failures: Vec<DeleteFailure>,
    },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl StorageError {
    /// Maps an OS error from a mutation on `path` into the shared taxonomy.
    pub fn from_io(path: &str, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::AlreadyExists => StorageError::AlreadyExists(path.to_string()),
            io::ErrorKind::NotFound => StorageError::Path(PathError::NotFound(path.to_string())),
            io::ErrorKind::PermissionDenied => StorageError::PermissionDenied {
                path: path.to_string(),
                source: error,
            },
            _ => StorageError::Io(error),
        }
    }
}

/// Errors reported by the transport for a single upload item
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("File exceeds the maximum upload size of {limit_mb} MB")]
    SizeExceeded { limit_mb: u64 },
    #[error("File was only partially uploaded")]
    Partial,
    #[error("No file was uploaded")]
    NoFile,
    #[error("Failed to write uploaded file to staging")]
    WriteRejected,
}

/// Per-item upload errors; never abort a batch
#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error("Invalid file name: {0}")]
    InvalidName(String),
    #[error("Could not move uploaded file into place: {0}")]
    Write(String),
}

/// Range header errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("Invalid range parameter: {0}")]
    Malformed(String),
    #[error("Requested range not satisfiable (size {size})")]
    NotSatisfiable { size: u64 },
}

/// General error that encompasses all error types, returned by the HTTP layer
#[derive(Debug, Error)]
pub enum FileManagerError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PathError> for FileManagerError {
    fn from(error: PathError) -> Self {
        FileManagerError::Storage(StorageError::Path(error))
    }
}
