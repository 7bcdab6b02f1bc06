//! Error types for capture operations.

use agrisave_models::{FailureKind, SurfaceFailure};
use thiserror::Error;

/// Result type for capture operations.
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Errors that can occur while acquiring a still image.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Camera permission denied: {0}")]
    PermissionDenied(String),

    #[error("Camera unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Invalid snapshot URL: {0}")]
    InvalidUrl(String),

    #[error("{0}")]
    Network(String),

    #[error("{0}")]
    InvalidResponse(String),

    #[error("Frame encoding failed: {0}")]
    Encoding(String),

    #[error("Image is empty: {0}")]
    EmptyImage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CaptureError {
    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    pub fn device_unavailable(msg: impl Into<String>) -> Self {
        Self::DeviceUnavailable(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Category shown on the capture surface.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            CaptureError::PermissionDenied(_) => FailureKind::PermissionDenied,
            CaptureError::DeviceUnavailable(_) | CaptureError::Io(_) => FailureKind::DeviceUnavailable,
            CaptureError::InvalidUrl(_) | CaptureError::Network(_) => FailureKind::NetworkFailure,
            CaptureError::InvalidResponse(_) => FailureKind::InvalidResponse,
            CaptureError::Encoding(_) | CaptureError::EmptyImage(_) => FailureKind::EncodingFailure,
        }
    }

    pub fn to_failure(&self) -> SurfaceFailure {
        SurfaceFailure::new(self.failure_kind(), self.to_string())
    }
}
