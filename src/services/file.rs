use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

use crate::authz;
use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{CurrentUser, DashboardSummary, FileRecord};
use crate::scanner::{MalwareScanner, ScanVerdict};
use crate::storage::BlobStore;
use crate::validation;

/// File lifecycle service. Sequences every operation so that the metadata
/// row and the blob can never disagree: a row is inserted only after its
/// blob is stored and scanned clean, and a row is removed only after its
/// blob is gone.
pub struct FileService;

impl FileService {
    /// Upload a file: validate, persist the blob, scan it, then commit the
    /// metadata row. Any failure after the blob write deletes the blob
    /// again before the error is returned.
    pub async fn upload(
        db: &Database,
        blobs: &BlobStore,
        scanner: &dyn MalwareScanner,
        user_id: &str,
        file_name: &str,
        data: Bytes,
        shared_by_default: bool,
    ) -> Result<FileRecord> {
        // Cheap checks first; nothing has touched a store yet.
        validation::check_filename(file_name)?;
        validation::check_type(file_name)?;
        validation::check_size(data.len() as u64)?;

        let stored_name = BlobStore::generate_stored_name(file_name);
        blobs.write(&stored_name, &data).await?;

        // The scan needs the bytes on disk. From here on, every failure
        // path must remove the blob before returning.
        match scanner.scan(&blobs.full_path(&stored_name)).await {
            Ok(ScanVerdict::Clean) => {}
            Ok(ScanVerdict::Infected) => {
                Self::cleanup_blob(blobs, &stored_name).await;
                return Err(AppError::ScanFailure(
                    "File is infected and not allowed to be uploaded".to_string(),
                ));
            }
            Err(e) => {
                Self::cleanup_blob(blobs, &stored_name).await;
                return Err(e);
            }
        }

        let file_id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let path = blobs.record_path(&stored_name);

        let inserted = sqlx::query(
            r#"
            INSERT INTO files (id, original_filename, stored_filename, path, uploaded_by, size, shared, uploaded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&file_id)
        .bind(file_name)
        .bind(&stored_name)
        .bind(&path)
        .bind(user_id)
        .bind(data.len() as i64)
        .bind(shared_by_default)
        .bind(&now)
        .execute(db.pool())
        .await;

        if let Err(e) = inserted {
            tracing::error!("Failed to save file metadata: {}", e);
            Self::cleanup_blob(blobs, &stored_name).await;
            return Err(e.into());
        }

        tracing::info!(file_id = %file_id, user_id = %user_id, size = data.len(), "File uploaded");
        Self::get_record(db, &file_id).await
    }

    /// Best-effort removal of a blob on a rejection path. The rejection
    /// response is already decided; a cleanup failure is logged and does
    /// not change it.
    async fn cleanup_blob(blobs: &BlobStore, stored_name: &str) {
        match blobs.delete(stored_name).await {
            Ok(()) | Err(AppError::NotFound(_)) => {}
            Err(e) => {
                tracing::error!("Failed to clean up rejected blob {}: {}", stored_name, e);
            }
        }
    }

    /// Get a file record by ID
    pub async fn get_record(db: &Database, file_id: &str) -> Result<FileRecord> {
        let record: FileRecord = sqlx::query_as("SELECT * FROM files WHERE id = ?")
            .bind(file_id)
            .fetch_optional(db.pool())
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        Ok(record)
    }

    /// List files for a user, newest first. With `include_shared`, the
    /// result is the union of owned files and files shared by others; the
    /// two sets are disjoint by construction, so no deduplication pass is
    /// needed.
    pub async fn list(
        db: &Database,
        user_id: &str,
        include_shared: bool,
    ) -> Result<Vec<FileRecord>> {
        let records: Vec<FileRecord> = if include_shared {
            sqlx::query_as(
                "SELECT * FROM files WHERE uploaded_by = ? OR (shared = 1 AND uploaded_by != ?) ORDER BY uploaded_at DESC",
            )
            .bind(user_id)
            .bind(user_id)
            .fetch_all(db.pool())
            .await?
        } else {
            sqlx::query_as("SELECT * FROM files WHERE uploaded_by = ? ORDER BY uploaded_at DESC")
                .bind(user_id)
                .fetch_all(db.pool())
                .await?
        };

        Ok(records)
    }

    /// Per-user dashboard aggregate in a single query. Empty users get
    /// zeroes, not nulls.
    pub async fn summary(db: &Database, user_id: &str) -> Result<DashboardSummary> {
        let (uploaded_files, storage_used, shared_files): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(size), 0),
                COALESCE(SUM(CASE WHEN shared = 1 THEN 1 ELSE 0 END), 0)
            FROM files
            WHERE uploaded_by = ?
            "#,
        )
        .bind(user_id)
        .fetch_one(db.pool())
        .await?;

        Ok(DashboardSummary {
            uploaded_files,
            storage_used,
            shared_files,
        })
    }

    /// Fetch a file for download: visibility check, then the same type
    /// allow-list and a fresh scan before any byte leaves the store. The
    /// re-scan catches blobs written before a newer scanner rule existed.
    pub async fn download(
        db: &Database,
        blobs: &BlobStore,
        scanner: &dyn MalwareScanner,
        user: &CurrentUser,
        file_id: &str,
    ) -> Result<(FileRecord, Bytes)> {
        let record = Self::get_record(db, file_id).await?;

        if !authz::visible_to(user, &record) {
            return Err(AppError::Forbidden("Access denied".to_string()));
        }

        validation::check_type(&record.original_filename)?;

        match scanner.scan(&blobs.full_path(&record.stored_filename)).await? {
            ScanVerdict::Clean => {}
            ScanVerdict::Infected => {
                return Err(AppError::ScanFailure(
                    "Virus detected in the file".to_string(),
                ));
            }
        }

        let data = blobs.read(&record.stored_filename).await?;
        Ok((record, data))
    }

    /// Flip the shared flag. Owner-only.
    pub async fn toggle_share(
        db: &Database,
        user: &CurrentUser,
        file_id: &str,
        shared: bool,
    ) -> Result<bool> {
        let record = Self::get_record(db, file_id).await?;

        if !authz::can_toggle_share(user, &record) {
            return Err(AppError::Forbidden("Access denied".to_string()));
        }

        sqlx::query("UPDATE files SET shared = ? WHERE id = ?")
            .bind(shared)
            .bind(file_id)
            .execute(db.pool())
            .await?;

        Ok(shared)
    }

    /// Delete a file. Admin-only. The blob goes first; the row is only
    /// removed once the blob is confirmed gone, so a failure in between
    /// leaves an orphan blob (harmless, collectable) rather than a row
    /// pointing at nothing.
    pub async fn delete(
        db: &Database,
        blobs: &BlobStore,
        user: &CurrentUser,
        file_id: &str,
    ) -> Result<()> {
        let record = Self::get_record(db, file_id).await?;

        if !authz::can_delete(user) {
            return Err(AppError::Forbidden(
                "Only administrators can delete files".to_string(),
            ));
        }

        match blobs.delete(&record.stored_filename).await {
            Ok(()) => {}
            Err(AppError::NotFound(_)) => {
                // The row outlived its blob; removing it restores consistency.
                tracing::warn!(
                    file_id = %file_id,
                    path = %record.path,
                    "Blob already absent during delete, removing orphan row"
                );
            }
            Err(e) => return Err(e),
        }

        sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(file_id)
            .execute(db.pool())
            .await?;

        tracing::info!(file_id = %file_id, "File deleted");
        Ok(())
    }
}
