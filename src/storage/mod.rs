use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};

/// Local file system blob store. Blobs are opaque byte payloads addressed by
/// their stored name inside a single base directory.
pub struct BlobStore {
    base_path: PathBuf,
}

impl BlobStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Ensure the base directory exists.
    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.base_path).await?;
        Ok(())
    }

    /// Generate a collision-resistant stored name. The random infix keeps two
    /// same-millisecond uploads of the same filename from colliding.
    pub fn generate_stored_name(original_filename: &str) -> String {
        let millis = Utc::now().timestamp_millis();
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(6)
            .map(char::from)
            .collect::<String>()
            .to_lowercase();
        format!("{}-{}-{}", millis, suffix, original_filename)
    }

    /// Absolute-or-relative path of a stored blob on disk.
    pub fn full_path(&self, stored_name: &str) -> PathBuf {
        self.base_path.join(stored_name)
    }

    /// Path string persisted in the metadata row.
    pub fn record_path(&self, stored_name: &str) -> String {
        self.full_path(stored_name).to_string_lossy().into_owned()
    }

    /// Durably store a payload under the given name.
    pub async fn write(&self, stored_name: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(stored_name);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&full_path).await?;
        file.write_all(data).await?;
        file.flush().await?;

        tracing::debug!("Stored blob at {:?}", full_path);
        Ok(())
    }

    /// Read a blob back in full.
    pub async fn read(&self, stored_name: &str) -> Result<Bytes> {
        let full_path = self.full_path(stored_name);

        let data = fs::read(&full_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::NotFound(format!("Blob not found: {}", stored_name))
            } else {
                AppError::Storage(format!("Failed to read blob: {}", e))
            }
        })?;

        Ok(Bytes::from(data))
    }

    /// Delete a blob. An already-absent blob reports `NotFound` so callers
    /// can tell an orphan row from a healthy blob/row pair; cleanup paths
    /// that do not care can ignore that variant.
    pub async fn delete(&self, stored_name: &str) -> Result<()> {
        let full_path = self.full_path(stored_name);

        fs::remove_file(&full_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::NotFound(format!("Blob not found: {}", stored_name))
            } else {
                AppError::Storage(format!("Failed to delete blob: {}", e))
            }
        })?;

        tracing::debug!("Deleted blob {:?}", full_path);
        Ok(())
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}
