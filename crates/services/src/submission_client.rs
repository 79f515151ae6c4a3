use std::env;

use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use crate::error::SubmissionError;
use crate::sessions::SubmissionPayload;

#[derive(Clone, Debug)]
pub struct SubmissionConfig {
    pub endpoint: String,
    pub token: Option<String>,
}

impl SubmissionConfig {
    /// Reads `EXAM_SUBMIT_URL` and optional `EXAM_SUBMIT_TOKEN`.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let endpoint = env::var("EXAM_SUBMIT_URL").ok()?;
        if endpoint.trim().is_empty() {
            return None;
        }
        let token = env::var("EXAM_SUBMIT_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        Some(Self { endpoint, token })
    }
}

/// Grader acknowledgement; only the optional attempt id is read.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    #[serde(default)]
    pub attempt_id: Option<String>,
}

/// Posts a completed session's payload to the grading backend.
///
/// One request per call; retrying is left to the caller.
#[derive(Clone)]
pub struct SubmissionClient {
    client: Client,
    config: Option<SubmissionConfig>,
}

impl SubmissionClient {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(SubmissionConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<SubmissionConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// # Errors
    ///
    /// Returns `SubmissionError` when no endpoint is configured, the request
    /// fails, or the backend answers with a non-success status.
    pub async fn submit(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let config = self.config.as_ref().ok_or(SubmissionError::Disabled)?;

        let mut request = self.client.post(&config.endpoint).json(payload);
        if let Some(token) = &config.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(SubmissionError::HttpStatus(response.status()));
        }

        let body = response.text().await?;
        let receipt: SubmissionReceipt = serde_json::from_str(&body).unwrap_or_default();
        info!(
            session = %payload.session_id,
            attempt = ?receipt.attempt_id,
            "submission delivered"
        );
        Ok(receipt)
    }
}
