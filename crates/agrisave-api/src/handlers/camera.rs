//! Camera handlers.

use agrisave_capture::VideoFrame;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::handlers::surfaces::{analyze_if_requested, AcquireQuery};
use crate::services::SurfaceSnapshot;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StopCameraResponse {
    /// Tracks stopped by this call; 0 when the camera was already off
    pub stopped_tracks: usize,
    #[serde(flatten)]
    pub surface: SurfaceSnapshot,
}

/// Turn the surface camera on.
pub async fn start_camera(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SurfaceSnapshot>> {
    let runtime = state.surfaces.get(id).await?;
    state.surfaces.start_camera(&runtime).await?;
    Ok(Json(runtime.snapshot(None).await))
}

/// Turn the surface camera off. Does not cancel an analysis in flight.
pub async fn stop_camera(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<StopCameraResponse>> {
    let runtime = state.surfaces.get(id).await?;
    let stopped_tracks = state.surfaces.stop_camera(&runtime).await;
    Ok(Json(StopCameraResponse {
        stopped_tracks,
        surface: runtime.snapshot(None).await,
    }))
}

/// Stage the current camera frame.
pub async fn capture_frame(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<AcquireQuery>,
) -> ApiResult<Json<SurfaceSnapshot>> {
    let runtime = state.surfaces.get(id).await?;
    state.surfaces.capture_camera(&runtime).await?;
    analyze_if_requested(&state, &runtime, query.analyze).await?;
    Ok(Json(runtime.snapshot(None).await))
}

/// Accept the latest frame from the relay device.
pub async fn push_frame(State(state): State<AppState>, body: Bytes) -> ApiResult<StatusCode> {
    if body.is_empty() {
        return Err(ApiError::bad_request("frame body is empty"));
    }

    let frame = tokio::task::spawn_blocking(move || VideoFrame::decode(&body))
        .await
        .map_err(|e| ApiError::internal(format!("frame decoder failed: {}", e)))?
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    state.camera.push_frame(frame);
    Ok(StatusCode::NO_CONTENT)
}
