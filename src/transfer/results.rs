//! Result types for transfer operations

use serde::Serialize;
use std::path::PathBuf;

use crate::error::TransferError;

/// One pending upload, consumed exactly once by the placer
#[derive(Debug)]
pub struct UploadItem {
    /// File name as declared by the client; untrusted
    pub declared_name: String,
    /// Spooled bytes, or the error the transport already reported
    pub payload: Result<PathBuf, TransferError>,
}

impl UploadItem {
    pub fn spooled(declared_name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            declared_name: declared_name.into(),
            payload: Ok(path.into()),
        }
    }

    pub fn failed(declared_name: impl Into<String>, error: TransferError) -> Self {
        Self {
            declared_name: declared_name.into(),
            payload: Err(error),
        }
    }
}

/// A batch item that was not placed
#[derive(Debug, Clone, Serialize)]
pub struct UploadFailure {
    pub file: String,
    pub error: String,
}

/// Outcome of an upload batch; partial failures are embedded, not raised
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReport {
    pub success: bool,
    pub uploaded: usize,
    pub failed: usize,
    pub uploaded_files: Vec<String>,
    pub errors: Vec<UploadFailure>,
}

impl UploadReport {
    pub fn new(uploaded_files: Vec<String>, errors: Vec<UploadFailure>) -> Self {
        Self {
            success: errors.is_empty(),
            uploaded: uploaded_files.len(),
            failed: errors.len(),
            uploaded_files,
            errors,
        }
    }
}
