use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::ScannerConfig;
use crate::error::{AppError, Result};

/// Outcome of submitting a blob to the detection service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanVerdict {
    Clean,
    Infected,
}

/// Malware scanning client. Implementations submit an already-persisted blob
/// to an external detection service; they never mutate local state. Transport
/// and service failures surface as `ScanFailure` so callers reject rather
/// than fail open.
#[async_trait]
pub trait MalwareScanner: Send + Sync {
    async fn scan(&self, blob_path: &Path) -> Result<ScanVerdict>;
}

/// HTTP scanner submitting blobs to a detection API.
pub struct HttpScanner {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

/// Subset of the detection report we act on: the number of engines that
/// flagged the file.
#[derive(Debug, Deserialize)]
struct ScanReport {
    #[serde(default)]
    positives: u32,
}

impl HttpScanner {
    pub fn new(config: &ScannerConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            tracing::warn!(
                "Scanner API key is not configured; scans will fail and uploads will be rejected"
            );
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build scanner client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl MalwareScanner for HttpScanner {
    async fn scan(&self, blob_path: &Path) -> Result<ScanVerdict> {
        let data = tokio::fs::read(blob_path).await.map_err(|e| {
            AppError::ScanFailure(format!("Failed to read blob for scanning: {}", e))
        })?;

        let file_name = blob_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        let part = reqwest::multipart::Part::bytes(data).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/files", self.api_url))
            .header("x-apikey", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Scanner request failed: {}", e);
                AppError::ScanFailure("Error scanning file for viruses".to_string())
            })?;

        if !response.status().is_success() {
            tracing::error!("Scanner returned status {}", response.status());
            return Err(AppError::ScanFailure(
                "Error scanning file for viruses".to_string(),
            ));
        }

        let report: ScanReport = response.json().await.map_err(|e| {
            tracing::error!("Scanner returned an unreadable report: {}", e);
            AppError::ScanFailure("Error scanning file for viruses".to_string())
        })?;

        if report.positives > 0 {
            tracing::warn!(
                path = %blob_path.display(),
                positives = report.positives,
                "Scanner flagged blob as infected"
            );
            Ok(ScanVerdict::Infected)
        } else {
            Ok(ScanVerdict::Clean)
        }
    }
}
