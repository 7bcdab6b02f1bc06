//! Preview image handler.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Serve a live preview. Revoked previews are gone for good.
pub async fn get_preview(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Response> {
    let preview = state
        .previews
        .get(id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("preview {}", id)))?;

    Ok((
        [
            (header::CONTENT_TYPE, preview.mime_type),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        preview.bytes,
    )
        .into_response())
}
