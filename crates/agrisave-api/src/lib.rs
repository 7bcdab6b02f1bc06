//! Axum HTTP gateway for the AgriSave leaf health classifier.
//!
//! This crate provides:
//! - Hosted capture surfaces (upload, live camera, remote snapshot)
//! - Classification through the external backend
//! - Farmer login sessions and bilingual labels
//! - Rate limiting, security headers and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{PreviewStore, SessionStore, SurfaceService};
pub use state::AppState;
