//! Storage result types
//!
//! Defines result structures returned by storage operations.

use serde::Serialize;

/// Result of a create-folder or rename operation
#[derive(Debug, Clone, Serialize)]
pub struct MutationResult {
    pub success: bool,
    pub message: String,
}

impl MutationResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Result of a successful delete
#[derive(Debug, Clone, Serialize)]
pub struct DeleteReport {
    pub success: bool,
    pub message: String,
    pub deleted_file: String,
    /// Number of filesystem nodes removed, the entry itself included
    #[serde(skip)]
    pub removed: usize,
}

/// One node a recursive delete could not remove
#[derive(Debug, Clone, Serialize)]
pub struct DeleteFailure {
    /// Relative path of the node that is still present
    pub path: String,
    /// OS-reported cause
    pub reason: String,
    /// Whether the directory holding the node was writable
    pub parent_writable: bool,
}
