//! API routes.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::camera::{capture_frame, push_frame, start_camera, stop_camera};
use crate::handlers::classify::classify;
use crate::handlers::previews::get_preview;
use crate::handlers::sessions::{get_session, login, logout, update_session};
use crate::handlers::surfaces::{
    analyze, create_surface, delete_surface, fetch_remote, get_surface, upload_image,
};
use crate::handlers::{health, ready};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let session_routes = Router::new()
        .route("/session", post(login))
        .route(
            "/session/:session_id",
            get(get_session).patch(update_session).delete(logout),
        );

    let surface_routes = Router::new()
        .route("/surfaces", post(create_surface))
        .route("/surfaces/:surface_id", get(get_surface).delete(delete_surface))
        // Acquisition
        .route("/surfaces/:surface_id/upload", post(upload_image))
        .route("/surfaces/:surface_id/remote", post(fetch_remote))
        .route("/surfaces/:surface_id/camera/start", post(start_camera))
        .route("/surfaces/:surface_id/camera/stop", post(stop_camera))
        .route("/surfaces/:surface_id/camera/capture", post(capture_frame))
        // Analysis
        .route("/surfaces/:surface_id/analyze", post(analyze));

    let rate_limiter = Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    let api_routes = Router::new()
        .merge(session_routes)
        .merge(surface_routes)
        .route("/classify", post(classify))
        .route("/previews/:preview_id", get(get_preview))
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    // Relay devices push frames continuously, so frames skip the rate limiter
    let relay_routes = Router::new().route("/camera/frame", put(push_frame));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || std::future::ready(handle.render())))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes.merge(relay_routes))
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
