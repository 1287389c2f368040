use std::time::Duration;

use serde::Deserialize;

use crate::config::CaptchaConfig;
use crate::error::{AppError, Result};

/// Pass/fail bot check against an external verification service. An empty
/// secret disables the check entirely.
pub struct CaptchaVerifier {
    client: reqwest::Client,
    verify_url: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    success: bool,
}

impl CaptchaVerifier {
    pub fn new(config: &CaptchaConfig) -> Result<Self> {
        if config.secret_key.is_empty() {
            tracing::warn!("Captcha secret is not configured; bot checks are disabled");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build captcha client: {}", e)))?;

        Ok(Self {
            client,
            verify_url: config.verify_url.clone(),
            secret_key: config.secret_key.clone(),
        })
    }

    /// Verify a client-supplied token. Network failures and negative
    /// verdicts both fail the check.
    pub async fn verify(&self, token: Option<&str>) -> Result<()> {
        if self.secret_key.is_empty() {
            return Ok(());
        }

        let token = token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::BadRequest("Captcha verification failed".to_string()))?;

        let params = [("secret", self.secret_key.as_str()), ("response", token)];

        let response = self
            .client
            .post(&self.verify_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Captcha verification request failed: {}", e);
                AppError::BadRequest("Captcha verification failed".to_string())
            })?;

        let verdict: VerifyResponse = response.json().await.map_err(|e| {
            tracing::error!("Captcha verifier returned an unreadable response: {}", e);
            AppError::BadRequest("Captcha verification failed".to_string())
        })?;

        if !verdict.success {
            return Err(AppError::BadRequest(
                "Captcha verification failed".to_string(),
            ));
        }

        Ok(())
    }
}
