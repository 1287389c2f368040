use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use bytes::BytesMut;

use crate::error::{AppError, Result};
use crate::models::{
    CurrentUser, DashboardSummary, FileListQuery, FileRecord, MessageResponse, ToggleShareRequest,
    ToggleShareResponse,
};
use crate::services::FileService;
use crate::AppState;

/// Upload a file
/// POST /upload
pub async fn upload(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<Json<MessageResponse>> {
    let mut file_data: Option<BytesMut> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to process multipart: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name.as_str() != "file" {
            continue;
        }

        file_name = field.file_name().map(|s| s.to_string());

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read file: {}", e)))?;

        let mut buf = BytesMut::with_capacity(data.len());
        buf.extend_from_slice(&data);
        file_data = Some(buf);
    }

    let file_data =
        file_data.ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;
    let file_name =
        file_name.ok_or_else(|| AppError::BadRequest("No file name provided".to_string()))?;

    FileService::upload(
        &state.db,
        &state.blobs,
        state.scanner.as_ref(),
        &current_user.id,
        &file_name,
        file_data.freeze(),
        state.config.storage.shared_by_default,
    )
    .await?;

    Ok(Json(MessageResponse {
        message: "File uploaded and scanned. No infection detected.".to_string(),
    }))
}

/// Dashboard aggregate for the authenticated user
/// GET /dashboard/summary
pub async fn dashboard_summary(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<DashboardSummary>> {
    let summary = FileService::summary(&state.db, &current_user.id).await?;
    Ok(Json(summary))
}

/// List files owned by a user, optionally including files shared by others
/// GET /files/:userId?shared=
pub async fn list_files(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(user_id): Path<String>,
    Query(query): Query<FileListQuery>,
) -> Result<Json<Vec<FileRecord>>> {
    if user_id != current_user.id && !current_user.is_admin() {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }

    let records =
        FileService::list(&state.db, &user_id, query.shared.unwrap_or(false)).await?;
    Ok(Json(records))
}

/// Toggle shared status of a file
/// PUT /files/toggleShare/:fileId
pub async fn toggle_share(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(file_id): Path<String>,
    Json(req): Json<ToggleShareRequest>,
) -> Result<Json<ToggleShareResponse>> {
    let shared = FileService::toggle_share(&state.db, &current_user, &file_id, req.shared).await?;
    Ok(Json(ToggleShareResponse {
        message: "Shared status updated successfully".to_string(),
        shared,
    }))
}

/// Download a file
/// GET /download/:fileId
pub async fn download(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(file_id): Path<String>,
) -> Result<Response> {
    let (record, data) = FileService::download(
        &state.db,
        &state.blobs,
        state.scanner.as_ref(),
        &current_user,
        &file_id,
    )
    .await?;

    let content_type = mime_guess::from_path(&record.original_filename)
        .first_or_octet_stream()
        .to_string();

    let fallback_name = record.original_filename.replace(['"', '\\'], "_");
    let encoded_name = urlencoding::encode(&record.original_filename);

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, data.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"{}\"; filename*=UTF-8''{}",
                fallback_name, encoded_name
            ),
        )
        .body(Body::from(data))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

/// Delete a file
/// DELETE /files/:fileId
pub async fn delete_file(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(file_id): Path<String>,
) -> Result<impl IntoResponse> {
    FileService::delete(&state.db, &state.blobs, &current_user, &file_id).await?;
    Ok(Json(MessageResponse {
        message: "File deleted successfully".to_string(),
    }))
}
