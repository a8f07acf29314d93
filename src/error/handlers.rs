//! Error handlers
//!
//! Maps errors to HTTP status codes and the JSON failure envelope.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::{error, warn};
use serde::Serialize;

use crate::error::types::{FileManagerError, PathError, RangeError, StorageError};
use crate::storage::DeleteFailure;

/// Failure body shared by every JSON endpoint
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<Vec<DeleteFailure>>,
}

/// Log an error at a level matching its severity
pub fn handle_error(err: &FileManagerError) {
    match error_to_status(err) {
        StatusCode::INTERNAL_SERVER_ERROR => error!("File manager error: {err}"),
        _ => warn!("Request rejected: {err}"),
    }
}

/// Convert error to HTTP status code
pub fn error_to_status(err: &FileManagerError) -> StatusCode {
    match err {
        FileManagerError::Storage(e) => storage_status(e),
        FileManagerError::Range(RangeError::Malformed(_)) => StatusCode::BAD_REQUEST,
        FileManagerError::Range(RangeError::NotSatisfiable { .. }) => {
            StatusCode::RANGE_NOT_SATISFIABLE
        }
        FileManagerError::BadRequest(_) => StatusCode::BAD_REQUEST,
        FileManagerError::Io(_) | FileManagerError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn storage_status(err: &StorageError) -> StatusCode {
    match err {
        StorageError::Path(PathError::Confinement(_)) => StatusCode::FORBIDDEN,
        StorageError::Path(PathError::NotFound(_)) => StatusCode::NOT_FOUND,
        StorageError::Path(PathError::InvalidName(_) | PathError::NotADirectory(_)) => {
            StatusCode::BAD_REQUEST
        }
        StorageError::AlreadyExists(_) => StatusCode::BAD_REQUEST,
        StorageError::Path(PathError::Io(_))
        | StorageError::PermissionDenied { .. }
        | StorageError::PartialDelete { .. }
        | StorageError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Message shown to the client. I/O details are replaced by a generic text.
fn public_message(err: &FileManagerError) -> String {
    match err {
        FileManagerError::Io(_)
        | FileManagerError::Internal(_)
        | FileManagerError::Storage(StorageError::Io(_))
        | FileManagerError::Storage(StorageError::Path(PathError::Io(_))) => {
            "Internal server error".to_string()
        }
        other => other.to_string(),
    }
}

/// Plain-text failure for endpoints that do not speak JSON (downloads)
pub fn text_response(err: FileManagerError) -> Response {
    handle_error(&err);
    (error_to_status(&err), public_message(&err)).into_response()
}

impl IntoResponse for FileManagerError {
    fn into_response(self) -> Response {
        handle_error(&self);
        let status = error_to_status(&self);
        let error = public_message(&self);
        let debug = match self {
            FileManagerError::Storage(StorageError::PartialDelete { failures, .. }) => {
                Some(failures)
            }
            _ => None,
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                error,
                debug,
            }),
        )
            .into_response()
    }
}
