//! Application state.

use std::sync::Arc;

use agrisave_capture::{CaptureAdapter, RelayCamera};
use agrisave_classifier::ClassifierClient;

use crate::config::ApiConfig;
use crate::services::{PreviewStore, SessionStore, SurfaceService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub classifier: ClassifierClient,
    pub adapter: CaptureAdapter,
    pub camera: Arc<RelayCamera>,
    pub sessions: Arc<SessionStore>,
    pub previews: Arc<PreviewStore>,
    pub surfaces: Arc<SurfaceService>,
}

impl AppState {
    /// Create new application state.
    pub fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let classifier = ClassifierClient::new(config.classifier.clone())?;
        let adapter = CaptureAdapter::new(&config.capture)?;
        let camera = Arc::new(RelayCamera::new(&config.capture));
        let previews = Arc::new(PreviewStore::new());

        let surfaces = SurfaceService::new(
            classifier.clone(),
            adapter.clone(),
            camera.clone(),
            Arc::clone(&previews),
        )
        .with_max_surfaces(config.max_surfaces);

        let sessions = Arc::new(SessionStore::new(config.max_sessions));

        Ok(Self {
            config,
            classifier,
            adapter,
            camera,
            sessions,
            previews,
            surfaces: Arc::new(surfaces),
        })
    }
}
