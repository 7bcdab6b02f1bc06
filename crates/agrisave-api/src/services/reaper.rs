//! Background eviction of abandoned surfaces and sessions.
//!
//! Clients that go away without tearing down their surface would otherwise
//! keep its staged image, preview and camera lease forever. Evicted surfaces
//! go through the same close path as an explicit teardown.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::{debug, info};

use crate::services::{SessionStore, SurfaceService};

/// Interval between sweeps.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Idle surface and session reaper.
pub struct IdleReaper {
    surfaces: Arc<SurfaceService>,
    sessions: Arc<SessionStore>,
    surface_idle_ttl: Duration,
    session_idle_ttl: Duration,
}

impl IdleReaper {
    pub fn new(
        surfaces: Arc<SurfaceService>,
        sessions: Arc<SessionStore>,
        surface_idle_ttl: Duration,
        session_idle_ttl: Duration,
    ) -> Self {
        Self {
            surfaces,
            sessions,
            surface_idle_ttl,
            session_idle_ttl,
        }
    }

    /// Run the sweep loop. Runs indefinitely; spawn it as a background task.
    pub async fn run(&self) {
        info!(
            surface_idle_ttl_secs = self.surface_idle_ttl.as_secs(),
            session_idle_ttl_secs = self.session_idle_ttl.as_secs(),
            "Starting idle reaper (interval: {:?})",
            SWEEP_INTERVAL
        );

        let mut ticker = interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            self.sweep().await;
        }
    }

    /// One sweep. Returns the number of surfaces and sessions evicted.
    pub async fn sweep(&self) -> (usize, usize) {
        let surfaces = self.surfaces.evict_idle(self.surface_idle_ttl).await;
        let sessions = self.sessions.evict_idle(self.session_idle_ttl).await;
        if surfaces > 0 || sessions > 0 {
            info!(surfaces, sessions, "Evicted idle state");
        } else {
            debug!("Idle sweep found nothing to evict");
        }
        (surfaces, sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agrisave_capture::{CaptureAdapter, CaptureConfig, RelayCamera};
    use agrisave_classifier::{ClassifierClient, ClassifierConfig};
    use agrisave_models::{FarmerProfile, Language};

    use crate::services::PreviewStore;

    #[tokio::test]
    async fn test_sweep_evicts_idle_state() {
        let classifier = ClassifierClient::new(ClassifierConfig::default()).unwrap();
        let adapter = CaptureAdapter::new(&CaptureConfig::default()).unwrap();
        let camera = Arc::new(RelayCamera::new(&CaptureConfig::default()));
        let surfaces = Arc::new(SurfaceService::new(
            classifier,
            adapter,
            camera,
            Arc::new(PreviewStore::new()),
        ));
        let sessions = Arc::new(SessionStore::default());

        surfaces.create(Language::En).await;
        sessions
            .create(FarmerProfile::new("Asha", "Pune").unwrap(), Language::En)
            .await;

        let reaper = IdleReaper::new(
            Arc::clone(&surfaces),
            Arc::clone(&sessions),
            Duration::from_secs(3600),
            Duration::from_secs(3600),
        );
        assert_eq!(reaper.sweep().await, (0, 0));

        let reaper = IdleReaper::new(
            Arc::clone(&surfaces),
            Arc::clone(&sessions),
            Duration::ZERO,
            Duration::ZERO,
        );
        assert_eq!(reaper.sweep().await, (1, 1));
        assert_eq!(surfaces.count().await, 0);
        assert_eq!(sessions.len().await, 0);
    }
}
