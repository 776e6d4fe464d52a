//! Report emitter boundary
//!
//! Delivery of a finished run to the test-management service. Emitters do
//! not touch the run result; a failure here leaves it intact for the caller.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use super::submission::RunSubmission;

/// Reporting errors
#[derive(Error, Debug)]
pub enum ReportingError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Connection refused to {0}")]
    ConnectionRefused(String),

    #[error("Authentication rejected (HTTP {0})")]
    Unauthorized(u16),

    #[error("Reporting service returned HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid response from reporting service: {0}")]
    InvalidResponse(String),

    #[error("Failed to write report {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize submission: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Acknowledgement returned for an accepted submission
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Sends run submissions somewhere
pub trait ReportEmitter {
    fn emit(&self, submission: &RunSubmission) -> Result<Receipt, ReportingError>;
}

impl<E: ReportEmitter + ?Sized> ReportEmitter for &E {
    fn emit(&self, submission: &RunSubmission) -> Result<Receipt, ReportingError> {
        (**self).emit(submission)
    }
}

impl<E: ReportEmitter + ?Sized> ReportEmitter for Box<E> {
    fn emit(&self, submission: &RunSubmission) -> Result<Receipt, ReportingError> {
        (**self).emit(submission)
    }
}
