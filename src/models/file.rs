use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// File metadata row. The `path` must point at a live blob for as long as
/// the row exists; upload only inserts after the blob is stored and clean,
/// and delete removes the blob before the row.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FileRecord {
    pub id: String,
    pub original_filename: String,
    pub stored_filename: String,
    pub path: String,
    pub uploaded_by: String,
    pub size: i64,
    pub shared: bool,
    pub uploaded_at: String,
}

/// Dashboard aggregate for one user
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub uploaded_files: i64,
    pub storage_used: i64,
    pub shared_files: i64,
}

/// Toggle share request
#[derive(Debug, Deserialize)]
pub struct ToggleShareRequest {
    pub shared: bool,
}

/// Toggle share response
#[derive(Debug, Serialize)]
pub struct ToggleShareResponse {
    pub message: String,
    pub shared: bool,
}

/// File list query parameters
#[derive(Debug, Deserialize)]
pub struct FileListQuery {
    /// When true, include files shared by other users.
    pub shared: Option<bool>,
}

/// Generic acknowledgement body
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
