//! Request handlers
//!
//! Decode each request into a typed value, run the blocking filesystem work
//! off the async runtime and encode the result.

use axum::Json;
use axum::body::Body;
use axum::extract::multipart::Field;
use axum::extract::{Multipart, Query, State};
use axum::http::header::RANGE;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use log::{debug, error, warn};
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

use crate::error::handlers::text_response;
use crate::error::{FileManagerError, TransferError};
use crate::navigate::{Listing, list_directory};
use crate::server::core::AppState;
use crate::storage::{self, DeleteReport, MutationResult};
use crate::transfer::{UploadItem, UploadReport, place_uploads, prepare_stream};

#[derive(Debug, Deserialize)]
pub struct PathQuery {
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateFolderRequest {
    #[serde(default)]
    pub path: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    pub old_path: String,
    pub new_name: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub path: String,
}

type ApiResult<T> = Result<Json<T>, FileManagerError>;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PathQuery>,
) -> ApiResult<Listing> {
    let listing = blocking(move || {
        list_directory(&state.root, &query.path, &state.config.root_label)
    })
    .await?;
    Ok(Json(listing))
}

pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateFolderRequest>,
) -> ApiResult<MutationResult> {
    let result =
        blocking(move || storage::create_folder(&state.root, &request.path, &request.name)).await?;
    Ok(Json(result))
}

pub async fn rename(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RenameRequest>,
) -> ApiResult<MutationResult> {
    let result = blocking(move || {
        storage::rename_entry(&state.root, &request.old_path, &request.new_name)
    })
    .await?;
    Ok(Json(result))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DeleteRequest>,
) -> ApiResult<DeleteReport> {
    let report = blocking(move || storage::delete_entry(&state.root, &request.path)).await?;
    Ok(Json(report))
}

/// Spools every `files`/`files[]` part to the staging directory, then places
/// the batch into the directory named by the `path` part.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<UploadReport> {
    let staging = state.config.staging_path();
    let limit = UploadLimit {
        bytes: state.config.max_file_size_bytes(),
        mb: state.config.max_file_size_mb,
    };

    let mut target = String::new();
    let mut items = Vec::new();
    // Spooled files are removed when these drop, unless already moved.
    let mut spooled: Vec<TempPath> = Vec::new();
    let mut saw_file = false;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) if saw_file => {
                warn!("Upload stream ended early: {}", e);
                break;
            }
            Err(e) => {
                return Err(FileManagerError::BadRequest(format!(
                    "Malformed upload request: {e}"
                )));
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "path" => {
                target = field.text().await.map_err(|e| {
                    FileManagerError::BadRequest(format!("Unreadable path field: {e}"))
                })?;
            }
            "files" | "files[]" => {
                saw_file = true;
                let declared = field.file_name().unwrap_or_default().to_string();
                if declared.is_empty() {
                    items.push(UploadItem::failed(declared, TransferError::NoFile));
                    continue;
                }
                match spool(field, &staging, limit).await {
                    Ok(path) => {
                        items.push(UploadItem::spooled(declared, path.to_path_buf()));
                        spooled.push(path);
                    }
                    Err(e) => {
                        let broken = e == TransferError::Partial;
                        items.push(UploadItem::failed(declared, e));
                        if broken {
                            break;
                        }
                    }
                }
            }
            other => debug!("Ignoring upload field {:?}", other),
        }
    }

    if !saw_file {
        return Err(FileManagerError::BadRequest("No files uploaded".into()));
    }

    let report = blocking(move || place_uploads(&state.root, &target, items)).await?;
    drop(spooled);
    Ok(Json(report))
}

#[derive(Debug, Clone, Copy)]
struct UploadLimit {
    bytes: u64,
    mb: u64,
}

/// Writes one multipart part to a fresh staging file, enforcing the size limit.
async fn spool(
    mut field: Field<'_>,
    staging: &Path,
    limit: UploadLimit,
) -> Result<TempPath, TransferError> {
    let (file, path) = tempfile::Builder::new()
        .prefix(".upload-")
        .tempfile_in(staging)
        .map_err(|e| {
            error!("Failed to create staging file in {}: {}", staging.display(), e);
            TransferError::WriteRejected
        })?
        .into_parts();
    let mut file = tokio::fs::File::from_std(file);

    let mut written: u64 = 0;
    loop {
        match field.chunk().await {
            Ok(Some(bytes)) => {
                written = written.saturating_add(bytes.len() as u64);
                if written > limit.bytes {
                    return Err(TransferError::SizeExceeded { limit_mb: limit.mb });
                }
                file.write_all(&bytes).await.map_err(|e| {
                    error!("Failed to write staging file {}: {}", path.display(), e);
                    TransferError::WriteRejected
                })?;
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Upload part interrupted: {}", e);
                return Err(TransferError::Partial);
            }
        }
    }

    file.flush().await.map_err(|_| TransferError::WriteRejected)?;
    Ok(path)
}

/// Serves a file, honoring a single `Range` header. Failures get a short
/// text body.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PathQuery>,
    headers: HeaderMap,
) -> Response {
    let range = headers
        .get(RANGE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    match stream_file(state, query.path, range).await {
        Ok(response) => response,
        Err(e) => text_response(e),
    }
}

async fn stream_file(
    state: Arc<AppState>,
    path: String,
    range: Option<String>,
) -> Result<Response, FileManagerError> {
    let chunk_size = state.config.stream_chunk_size;
    let plan = blocking(move || prepare_stream(&state.root, &path, range.as_deref())).await?;

    let body = match &plan.body {
        Some(span) => Body::from_stream(ReaderStream::with_capacity(span.open().await?, chunk_size)),
        None => Body::empty(),
    };

    let status = StatusCode::from_u16(plan.status)
        .map_err(|e| FileManagerError::Internal(e.to_string()))?;
    let mut response = (status, body).into_response();
    for (name, value) in plan.headers {
        let value =
            HeaderValue::from_str(&value).map_err(|e| FileManagerError::Internal(e.to_string()))?;
        response
            .headers_mut()
            .insert(HeaderName::from_static(name), value);
    }
    Ok(response)
}

/// Runs filesystem work on the blocking pool.
async fn blocking<T, E, F>(work: F) -> Result<T, FileManagerError>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<FileManagerError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| FileManagerError::Internal(format!("worker task failed: {e}")))?
        .map_err(Into::into)
}
