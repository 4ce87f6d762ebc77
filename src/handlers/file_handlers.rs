//! HTTP handlers for the upload lifecycle and file management.
//! Each handler resolves the caller, then delegates to `FileService`.

use crate::{
    errors::AppError,
    handlers::identity::CallerIdentity,
    models::{
        file::FileRecord,
        upload::{
            BeginUploadRequest, CompleteUploadRequest, CompletionConfirmation,
            DownloadUrlResponse, MessageResponse, UploadPlanResult,
        },
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
};
use serde::Deserialize;
use uuid::Uuid;

/// Query params accepted by `GET /downloads`.
#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    #[serde(rename = "fileID", alias = "fileId")]
    pub file_id: Option<String>,
}

/// Unwrap a JSON body, reporting malformed input as a validation failure.
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::bad_request(format!("invalid request body: {rejection}")))
}

fn parse_file_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::bad_request(format!("`{raw}` is not a valid fileID")))
}

/// `POST /uploads` - plan an upload and return presigned URL(s).
pub async fn begin_upload(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<BeginUploadRequest>, JsonRejection>,
) -> Result<Json<UploadPlanResult>, AppError> {
    let req = json_body(body)?;
    let plan = state.files.begin_upload(caller.as_str(), req).await?;
    Ok(Json(plan))
}

/// `POST /uploads/complete` - finalize a multipart upload.
pub async fn complete_upload(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CompleteUploadRequest>, JsonRejection>,
) -> Result<Json<CompletionConfirmation>, AppError> {
    let req = json_body(body)?;
    let confirmation = state.files.complete_upload(caller.as_str(), req).await?;
    Ok(Json(confirmation))
}

/// `GET /downloads?fileID=` - presigned GET URL for a file.
pub async fn download_url(
    State(state): State<AppState>,
    caller: Result<CallerIdentity, AppError>,
    Query(q): Query<DownloadQuery>,
) -> Result<Json<DownloadUrlResponse>, AppError> {
    let raw = q
        .file_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("fileID is required"))?;
    let file_id = parse_file_id(&raw)?;
    let caller = caller.ok();

    let response = state
        .files
        .generate_download_url(file_id, caller.as_ref().map(CallerIdentity::as_str))
        .await?;
    Ok(Json(response))
}

/// `GET /files` - the caller's files, newest first.
pub async fn list_files(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<FileRecord>>, AppError> {
    Ok(Json(state.files.list_files(caller.as_str()).await?))
}

/// `GET /files/{fileId}` - one file's metadata.
pub async fn get_file(
    State(state): State<AppState>,
    caller: Result<CallerIdentity, AppError>,
    Path(file_id): Path<String>,
) -> Result<Json<FileRecord>, AppError> {
    let file_id = parse_file_id(&file_id)?;
    let caller = caller.ok();
    let record = state
        .files
        .get_file(file_id, caller.as_ref().map(CallerIdentity::as_str))
        .await?;
    Ok(Json(record))
}

/// `DELETE /files/{fileId}` - delete a file owned by the caller.
pub async fn delete_file(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(file_id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let file_id = parse_file_id(&file_id)?;
    state.files.delete_file(caller.as_str(), file_id).await?;
    Ok(Json(MessageResponse {
        message: format!("File {} deleted successfully", file_id),
    }))
}
