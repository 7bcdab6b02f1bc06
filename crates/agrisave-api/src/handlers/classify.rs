//! One-shot classification without surface state.

use agrisave_capture::CaptureInput;
use agrisave_classifier::ClassifyOptions;
use agrisave_models::ResultView;
use axum::extract::{Multipart, State};
use axum::Json;
use tracing::info;

use crate::error::ApiResult;
use crate::handlers::multipart::read_image;
use crate::state::AppState;

/// Classify an uploaded image and return the display-ready result.
pub async fn classify(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<ResultView>> {
    let upload = read_image(multipart).await?;
    let request = state
        .adapter
        .capture(CaptureInput::LocalFile {
            bytes: upload.bytes,
            filename: upload.filename,
            mime_type: upload.content_type,
        })
        .await?;

    let result = state
        .classifier
        .classify(&request, ClassifyOptions::default())
        .await?;

    info!(class = %result.class, confidence = %result.confidence_display(), "One-shot classification");
    Ok(Json(ResultView::from(&result)))
}
