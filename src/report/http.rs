//! HTTP report emitter
//!
//! Posts submissions as JSON to `<endpoint>/v1/runs` with bearer auth.

use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

use super::emitter::{Receipt, ReportEmitter, ReportingError};
use super::submission::RunSubmission;

const RUNS_PATH: &str = "/v1/runs";

/// Blocking HTTP client for the reporting service
#[derive(Clone)]
pub struct HttpEmitter {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    timeout_secs: u64,
}

impl HttpEmitter {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self, ReportingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ReportingError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: None,
            timeout_secs,
        })
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.filter(|k| !k.is_empty());
        self
    }

    /// Full URL for run creation
    pub fn runs_url(&self) -> String {
        format!("{}{}", self.endpoint.trim_end_matches('/'), RUNS_PATH)
    }
}

impl ReportEmitter for HttpEmitter {
    fn emit(&self, submission: &RunSubmission) -> Result<Receipt, ReportingError> {
        let url = self.runs_url();
        debug!(
            "Posting run for {} ({} steps) to {}",
            submission.serial_number(),
            submission.steps.len(),
            url
        );

        let mut request = self.client.post(&url).json(submission);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                ReportingError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                ReportingError::ConnectionRefused(url.clone())
            } else {
                ReportingError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ReportingError::Unauthorized(status.as_u16()));
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ReportingError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let receipt: Receipt = response
            .json()
            .map_err(|e| ReportingError::InvalidResponse(e.to_string()))?;

        debug!("Run accepted as {}", receipt.id);
        Ok(receipt)
    }
}
