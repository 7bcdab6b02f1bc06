//! Capture surface handlers.

use std::sync::Arc;

use agrisave_models::{Language, SurfacePhase};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::handlers::multipart::read_image;
use crate::services::{SurfaceRuntime, SurfaceSnapshot};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CreateSurfaceRequest {
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    /// Language for the returned labels
    #[serde(default)]
    pub lang: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AcquireQuery {
    /// Analyze right after a successful acquisition
    #[serde(default)]
    pub analyze: bool,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeQuery {
    /// Wait for the classification outcome before responding
    #[serde(default = "default_wait")]
    pub wait: bool,
}

fn default_wait() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct RemoteSnapshotRequest {
    /// Base URL of the camera device
    pub url: String,
}

fn parse_language(code: Option<&str>) -> ApiResult<Option<Language>> {
    code.map(|c| c.parse::<Language>()).transpose().map_err(Into::into)
}

/// Analyze after an acquisition when asked to and an image was staged.
pub(crate) async fn analyze_if_requested(
    state: &AppState,
    runtime: &Arc<SurfaceRuntime>,
    analyze: bool,
) -> ApiResult<()> {
    if analyze && runtime.phase().await == SurfacePhase::Ready {
        state.surfaces.analyze(runtime, true).await?;
    }
    Ok(())
}

/// Create a capture surface.
pub async fn create_surface(
    State(state): State<AppState>,
    body: Option<Json<CreateSurfaceRequest>>,
) -> ApiResult<(StatusCode, Json<SurfaceSnapshot>)> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let language = parse_language(body.language.as_deref())?.unwrap_or_default();
    let runtime = state.surfaces.create(language).await;
    Ok((StatusCode::CREATED, Json(runtime.snapshot(None).await)))
}

pub async fn get_surface(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ViewQuery>,
) -> ApiResult<Json<SurfaceSnapshot>> {
    let language = parse_language(query.lang.as_deref())?;
    let runtime = state.surfaces.get(id).await?;
    Ok(Json(runtime.snapshot(language).await))
}

/// Tear down a surface: aborts its classification, releases the camera and
/// revokes its preview.
pub async fn delete_surface(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.surfaces.teardown(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Stage an uploaded image.
pub async fn upload_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<AcquireQuery>,
    multipart: Multipart,
) -> ApiResult<Json<SurfaceSnapshot>> {
    let runtime = state.surfaces.get(id).await?;
    let upload = read_image(multipart).await?;

    state
        .surfaces
        .upload(&runtime, upload.bytes, upload.filename, upload.content_type)
        .await?;
    analyze_if_requested(&state, &runtime, query.analyze).await?;

    Ok(Json(runtime.snapshot(None).await))
}

/// Stage a still from a remote camera device.
pub async fn fetch_remote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<AcquireQuery>,
    Json(body): Json<RemoteSnapshotRequest>,
) -> ApiResult<Json<SurfaceSnapshot>> {
    let runtime = state.surfaces.get(id).await?;

    state.surfaces.fetch_remote(&runtime, body.url).await?;
    analyze_if_requested(&state, &runtime, query.analyze).await?;

    Ok(Json(runtime.snapshot(None).await))
}

/// Classify the staged image.
///
/// With `wait=false` the response is sent as soon as the surface is busy.
pub async fn analyze(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<AnalyzeQuery>,
) -> ApiResult<(StatusCode, Json<SurfaceSnapshot>)> {
    let runtime = state.surfaces.get(id).await?;
    state.surfaces.analyze(&runtime, query.wait).await?;

    let status = if query.wait {
        StatusCode::OK
    } else {
        StatusCode::ACCEPTED
    };
    Ok((status, Json(runtime.snapshot(None).await)))
}
