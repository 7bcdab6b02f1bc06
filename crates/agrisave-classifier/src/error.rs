//! Classifier client error types.

use agrisave_models::FailureKind;
use thiserror::Error;

/// Result type for classifier operations.
pub type ClassifierResult<T> = Result<T, ClassifierError>;

/// Errors that can occur while classifying an image.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Failed to configure classifier client: {0}")]
    ConfigError(String),

    #[error("Invalid classification request: {0}")]
    InvalidRequest(String),

    #[error("Classification failed ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("Invalid classification response: {0}")]
    Decode(String),

    #[error("Classification request timed out: {0}")]
    Timeout(String),

    #[error("Classification request cancelled")]
    Cancelled,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ClassifierError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Classify a transport error from reqwest.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err)
        }
    }

    /// HTTP status returned by the backend, if the request got that far.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ClassifierError::Status { status, .. } => Some(*status),
            ClassifierError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Category shown on the capture surface.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            ClassifierError::Status { .. } | ClassifierError::Decode(_) => FailureKind::InvalidResponse,
            ClassifierError::InvalidRequest(_) => FailureKind::EncodingFailure,
            ClassifierError::ConfigError(_)
            | ClassifierError::Timeout(_)
            | ClassifierError::Cancelled
            | ClassifierError::Network(_) => FailureKind::NetworkFailure,
        }
    }

    /// Short label for metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            ClassifierError::ConfigError(_) => "config_error",
            ClassifierError::InvalidRequest(_) => "invalid_request",
            ClassifierError::Status { .. } => "http_error",
            ClassifierError::Decode(_) => "decode_error",
            ClassifierError::Timeout(_) => "timeout",
            ClassifierError::Cancelled => "cancelled",
            ClassifierError::Network(_) => "network_error",
        }
    }
}
