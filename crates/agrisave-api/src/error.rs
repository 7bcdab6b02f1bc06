//! API error types.

use agrisave_capture::CaptureError;
use agrisave_classifier::ClassifierError;
use agrisave_models::{ModelError, TransitionError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ModelError),

    #[error("{0}")]
    Transition(#[from] TransitionError),

    #[error("{0}")]
    Classifier(#[from] ClassifierError),

    #[error("{0}")]
    Capture(#[from] CaptureError),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Transition(TransitionError::NothingToAnalyze) => StatusCode::BAD_REQUEST,
            ApiError::Transition(_) => StatusCode::CONFLICT,
            ApiError::Classifier(ClassifierError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Classifier(ClassifierError::InvalidRequest(_)) => StatusCode::BAD_REQUEST,
            ApiError::Classifier(ClassifierError::ConfigError(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Classifier(_) => StatusCode::BAD_GATEWAY,
            ApiError::Capture(e) => match e {
                CaptureError::EmptyImage(_) | CaptureError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
                CaptureError::InvalidResponse(_) | CaptureError::Network(_) => StatusCode::BAD_GATEWAY,
                CaptureError::PermissionDenied(_) => StatusCode::FORBIDDEN,
                CaptureError::DeviceUnavailable(_) => StatusCode::CONFLICT,
                CaptureError::Encoding(_) | CaptureError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Internal(_) => "internal",
            ApiError::Validation(_) => "validation",
            ApiError::Transition(_) => "invalid_transition",
            ApiError::Classifier(e) => e.failure_kind().as_str(),
            ApiError::Capture(e) => e.failure_kind().as_str(),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal details stay out of production responses
        let detail = if status.is_server_error()
            && status != StatusCode::BAD_GATEWAY
            && status != StatusCode::GATEWAY_TIMEOUT
            && std::env::var("ENVIRONMENT").unwrap_or_default() == "production"
        {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            detail,
            code: Some(self.code().to_string()),
        };

        (status, Json(body)).into_response()
    }
}
