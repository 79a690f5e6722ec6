//! Error types for grabr

use serde::Serialize;
use thiserror::Error;

/// Main error type for grabr operations
#[derive(Debug, Error)]
pub enum GrabError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Probe failed: {0}")]
    ProbeFailed(String),

    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    #[error("No .{extension} output found in slot {slot_id}")]
    OutputNotFound { slot_id: String, extension: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Failure category reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    ProbeFailed,
    FetchFailed,
    Internal,
}

/// Caller-visible error body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub kind: ErrorKind,
    pub message: String,
}

impl GrabError {
    /// Failure category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            GrabError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            GrabError::ProbeFailed(_) => ErrorKind::ProbeFailed,
            GrabError::FetchFailed(_) => ErrorKind::FetchFailed,
            GrabError::OutputNotFound { .. } | GrabError::IoError(_) | GrabError::JsonError(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Convert into the payload handed to the calling layer.
    ///
    /// Internal faults are reported with a generic message; their details
    /// only go to the logs.
    pub fn payload(&self) -> ErrorPayload {
        let message = match self {
            GrabError::InvalidRequest(msg)
            | GrabError::ProbeFailed(msg)
            | GrabError::FetchFailed(msg) => msg.clone(),
            GrabError::OutputNotFound { .. } => "File not found after download.".to_string(),
            GrabError::IoError(_) | GrabError::JsonError(_) => "Internal error".to_string(),
        };
        ErrorPayload {
            kind: self.kind(),
            message,
        }
    }

    /// Check if a caller may reasonably try the same request again
    pub fn is_retryable(&self) -> bool {
        matches!(self, GrabError::FetchFailed(_))
    }
}
