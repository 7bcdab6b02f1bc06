//! Capture surfaces hosted by the gateway.
//!
//! Each surface has its own async mutex around the state machine. The lock is
//! taken to start or finish a piece of work and released while the capture or
//! classification I/O runs; completions present the ticket they were started
//! with so a torn-down or superseded surface never shows a stale outcome.
//!
//! Capture and classification run on spawned tasks, so a client that goes
//! away mid-request never leaves a surface stuck in `Acquiring` or `Busy`.
//!
//! Lock order is registry, then camera, then slot. Never take the camera lock
//! while holding the slot lock.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use agrisave_capture::{
    CameraConstraints, CameraDevice, CaptureAdapter, CaptureError, CaptureInput, CaptureResult,
    MediaStream,
};
use agrisave_classifier::{
    cancel_pair, CancelHandle, ClassifierClient, ClassifierResult, ClassifyOptions,
};
use agrisave_models::{
    CameraState, CaptureSource, CaptureSurface, ClassificationRequest, ClassificationResult,
    Language, SurfaceFailure, SurfacePhase, SurfaceView, Ticket,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::services::previews::{preview_url, PreviewStore};

/// Hosted surfaces kept before the least recently used ones are evicted.
pub const DEFAULT_MAX_SURFACES: usize = 1_000;

struct InFlight {
    epoch: u64,
    cancel: CancelHandle,
}

struct SurfaceSlot {
    surface: CaptureSurface,
    inflight: Option<InFlight>,
    preview: Option<Uuid>,
    closed: bool,
    last_seen: Instant,
}

/// Serializable view of a hosted surface.
#[derive(Debug, Clone, Serialize)]
pub struct SurfaceSnapshot {
    pub id: Uuid,
    pub language: Language,
    #[serde(flatten)]
    pub view: SurfaceView,
    pub preview_url: Option<String>,
    pub labels: BTreeMap<&'static str, &'static str>,
    pub created_at: DateTime<Utc>,
}

/// One hosted capture surface.
pub struct SurfaceRuntime {
    id: Uuid,
    language: Language,
    created_at: DateTime<Utc>,
    slot: Mutex<SurfaceSlot>,
    camera: Mutex<Option<MediaStream>>,
}

impl SurfaceRuntime {
    fn new(language: Language) -> Self {
        Self {
            id: Uuid::new_v4(),
            language,
            created_at: Utc::now(),
            slot: Mutex::new(SurfaceSlot {
                surface: CaptureSurface::new(),
                inflight: None,
                preview: None,
                closed: false,
                last_seen: Instant::now(),
            }),
            camera: Mutex::new(None),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn phase(&self) -> SurfacePhase {
        self.slot.lock().await.surface.phase()
    }

    /// Current view, with labels in `language` or the surface's own language.
    pub async fn snapshot(&self, language: Option<Language>) -> SurfaceSnapshot {
        let language = language.unwrap_or(self.language);
        let slot = self.slot.lock().await;
        SurfaceSnapshot {
            id: self.id,
            language,
            view: slot.surface.view(),
            preview_url: slot.preview.map(preview_url),
            labels: language.labels().into_iter().collect(),
            created_at: self.created_at,
        }
    }

    async fn touch(&self) {
        self.slot.lock().await.last_seen = Instant::now();
    }

    async fn last_seen(&self) -> Instant {
        self.slot.lock().await.last_seen
    }

    async fn finish_acquisition(
        &self,
        previews: &PreviewStore,
        ticket: Ticket,
        source: &CaptureSource,
        outcome: CaptureResult<ClassificationRequest>,
    ) {
        let mut slot = self.slot.lock().await;
        if slot.closed {
            debug!(surface_id = %self.id, "Surface closed, dropping acquisition outcome");
            return;
        }

        match outcome {
            Ok(image) => match slot.surface.complete_acquisition(ticket, image.clone()) {
                Ok(()) => {
                    let previous = slot.preview.take();
                    slot.preview = Some(previews.replace(previous, &image).await);
                    metrics::record_acquisition(source.as_str(), "success");
                    debug!(surface_id = %self.id, source = %source, size_bytes = image.len(), "Image staged");
                }
                Err(e) => {
                    metrics::record_stale_completion("acquisition");
                    debug!(surface_id = %self.id, error = %e, "Discarded acquisition");
                }
            },
            Err(e) => {
                metrics::record_acquisition(source.as_str(), e.failure_kind().as_str());
                warn!(surface_id = %self.id, source = %source, error = %e, "Acquisition failed");
                if let Err(stale) = slot.surface.fail(ticket, e.to_failure()) {
                    metrics::record_stale_completion("acquisition");
                    debug!(surface_id = %self.id, error = %stale, "Discarded acquisition failure");
                }
            }
        }
    }

    async fn finish_analysis(&self, ticket: Ticket, outcome: ClassifierResult<ClassificationResult>) {
        let mut slot = self.slot.lock().await;
        if slot.inflight.as_ref().is_some_and(|f| f.epoch == ticket.epoch()) {
            slot.inflight = None;
        }
        if slot.closed {
            debug!(surface_id = %self.id, "Surface closed, dropping analysis outcome");
            return;
        }

        let applied = match outcome {
            Ok(result) => {
                info!(
                    surface_id = %self.id,
                    class = %result.class,
                    confidence = %result.confidence_display(),
                    "Leaf classified"
                );
                metrics::record_analysis("success");
                slot.surface.complete_analysis(ticket, result)
            }
            Err(e) => {
                warn!(surface_id = %self.id, error = %e, "Analysis failed");
                metrics::record_analysis(e.outcome());
                slot.surface
                    .fail(ticket, SurfaceFailure::new(e.failure_kind(), e.to_string()))
            }
        };

        if let Err(e) = applied {
            metrics::record_stale_completion("analysis");
            debug!(surface_id = %self.id, error = %e, "Discarded analysis outcome");
        }
    }

    /// Abort pending work, release the camera and revoke the preview.
    async fn close(&self, previews: &PreviewStore) {
        let (inflight, preview) = {
            let mut slot = self.slot.lock().await;
            slot.closed = true;
            slot.surface.reset();
            slot.surface.set_camera(CameraState::Off);
            (slot.inflight.take(), slot.preview.take())
        };

        if let Some(inflight) = inflight {
            inflight.cancel.cancel();
            info!(surface_id = %self.id, epoch = inflight.epoch, "Aborted in-flight classification");
        }
        if let Some(preview) = preview {
            previews.revoke(preview).await;
        }
        if let Some(mut stream) = self.camera.lock().await.take() {
            stream.stop();
        }
    }
}

/// Registry and operations for hosted surfaces.
pub struct SurfaceService {
    surfaces: RwLock<HashMap<Uuid, Arc<SurfaceRuntime>>>,
    classifier: ClassifierClient,
    adapter: CaptureAdapter,
    camera: Arc<dyn CameraDevice>,
    previews: Arc<PreviewStore>,
    max_surfaces: usize,
}

impl SurfaceService {
    pub fn new(
        classifier: ClassifierClient,
        adapter: CaptureAdapter,
        camera: Arc<dyn CameraDevice>,
        previews: Arc<PreviewStore>,
    ) -> Self {
        Self {
            surfaces: RwLock::new(HashMap::new()),
            classifier,
            adapter,
            camera,
            previews,
            max_surfaces: DEFAULT_MAX_SURFACES,
        }
    }

    /// Cap the number of hosted surfaces; creating one past the cap evicts
    /// the least recently used.
    pub fn with_max_surfaces(mut self, max_surfaces: usize) -> Self {
        self.max_surfaces = max_surfaces.max(1);
        self
    }

    pub async fn create(&self, language: Language) -> Arc<SurfaceRuntime> {
        if self.count().await >= self.max_surfaces {
            self.evict_least_recent(self.max_surfaces - 1).await;
        }

        let runtime = Arc::new(SurfaceRuntime::new(language));
        let mut surfaces = self.surfaces.write().await;
        surfaces.insert(runtime.id, Arc::clone(&runtime));
        metrics::set_active_surfaces(surfaces.len());
        info!(surface_id = %runtime.id, language = language.as_str(), "Surface created");
        runtime
    }

    /// Look up a surface and mark it as used.
    pub async fn get(&self, id: Uuid) -> ApiResult<Arc<SurfaceRuntime>> {
        let runtime = self
            .surfaces
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("surface {}", id)))?;
        runtime.touch().await;
        Ok(runtime)
    }

    pub async fn count(&self) -> usize {
        self.surfaces.read().await.len()
    }

    /// Remove a surface, aborting its in-flight classification.
    pub async fn teardown(&self, id: Uuid) -> ApiResult<()> {
        if self.remove_and_close(&[id]).await == 0 {
            return Err(ApiError::not_found(format!("surface {}", id)));
        }
        info!(surface_id = %id, "Surface torn down");
        Ok(())
    }

    // =========================================================================
    // Eviction
    // =========================================================================

    /// Tear down surfaces not used for `max_idle`. Returns how many were evicted.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let idle: Vec<Uuid> = self
            .last_seen_by_id()
            .await
            .into_iter()
            .filter(|(_, seen)| now.duration_since(*seen) >= max_idle)
            .map(|(id, _)| id)
            .collect();

        let evicted = self.remove_and_close(&idle).await;
        if evicted > 0 {
            info!(evicted, max_idle_secs = max_idle.as_secs(), "Evicted idle surfaces");
        }
        evicted
    }

    /// Tear down the least recently used surfaces until at most `keep` remain.
    async fn evict_least_recent(&self, keep: usize) -> usize {
        let mut entries = self.last_seen_by_id().await;
        if entries.len() <= keep {
            return 0;
        }
        entries.sort_by_key(|(_, seen)| *seen);
        let to_remove: Vec<Uuid> = entries
            .iter()
            .take(entries.len() - keep)
            .map(|(id, _)| *id)
            .collect();

        let evicted = self.remove_and_close(&to_remove).await;
        warn!(evicted, max_surfaces = self.max_surfaces, "Surface capacity reached, evicted least recently used");
        evicted
    }

    async fn last_seen_by_id(&self) -> Vec<(Uuid, Instant)> {
        let runtimes: Vec<Arc<SurfaceRuntime>> =
            self.surfaces.read().await.values().cloned().collect();
        let mut entries = Vec::with_capacity(runtimes.len());
        for runtime in runtimes {
            entries.push((runtime.id, runtime.last_seen().await));
        }
        entries
    }

    async fn remove_and_close(&self, ids: &[Uuid]) -> usize {
        let removed: Vec<Arc<SurfaceRuntime>> = {
            let mut surfaces = self.surfaces.write().await;
            let removed = ids.iter().filter_map(|id| surfaces.remove(id)).collect();
            metrics::set_active_surfaces(surfaces.len());
            removed
        };

        for runtime in &removed {
            runtime.close(&self.previews).await;
        }
        removed.len()
    }

    // =========================================================================
    // Acquisition
    // =========================================================================

    async fn begin_acquisition(&self, runtime: &SurfaceRuntime, source: CaptureSource) -> ApiResult<Ticket> {
        let mut slot = runtime.slot.lock().await;
        if slot.closed {
            return Err(ApiError::not_found(format!("surface {}", runtime.id)));
        }
        let ticket = slot.surface.begin_acquisition(source)?;
        if let Some(old) = slot.preview.take() {
            self.previews.revoke(old).await;
        }
        Ok(ticket)
    }

    /// Run one acquisition on its own task and wait for it to be applied.
    ///
    /// The task owns the ticket, so the outcome lands on the surface even if
    /// the caller stops waiting.
    async fn acquire<F, Fut>(
        &self,
        runtime: &Arc<SurfaceRuntime>,
        source: CaptureSource,
        capture: F,
    ) -> ApiResult<()>
    where
        F: FnOnce(CaptureAdapter, Arc<SurfaceRuntime>) -> Fut,
        Fut: Future<Output = CaptureResult<ClassificationRequest>> + Send + 'static,
    {
        let ticket = self.begin_acquisition(runtime, source.clone()).await?;
        let work = capture(self.adapter.clone(), Arc::clone(runtime));
        let previews = Arc::clone(&self.previews);
        let runtime = Arc::clone(runtime);

        tokio::spawn(async move {
            let outcome = work.await;
            runtime
                .finish_acquisition(&previews, ticket, &source, outcome)
                .await;
        })
        .await
        .map_err(|e| ApiError::internal(format!("acquisition task failed: {}", e)))
    }

    /// Stage an uploaded file.
    pub async fn upload(
        &self,
        runtime: &Arc<SurfaceRuntime>,
        bytes: Vec<u8>,
        filename: Option<String>,
        mime_type: Option<String>,
    ) -> ApiResult<()> {
        self.acquire(runtime, CaptureSource::LocalFile, move |adapter, _| async move {
            adapter
                .capture(CaptureInput::LocalFile {
                    bytes,
                    filename,
                    mime_type,
                })
                .await
        })
        .await
    }

    /// Stage a still fetched from a remote camera device.
    pub async fn fetch_remote(&self, runtime: &Arc<SurfaceRuntime>, url: String) -> ApiResult<()> {
        let source = CaptureSource::RemoteSnapshot { url: url.clone() };
        self.acquire(runtime, source, move |adapter, _| async move {
            adapter.capture(CaptureInput::RemoteSnapshot { url }).await
        })
        .await
    }

    /// Stage the current frame of the surface's camera stream.
    pub async fn capture_camera(&self, runtime: &Arc<SurfaceRuntime>) -> ApiResult<()> {
        self.acquire(runtime, CaptureSource::LiveCameraFrame, |adapter, runtime| async move {
            let camera = runtime.camera.lock().await;
            let outcome = match camera.as_ref() {
                Some(stream) => adapter.capture(CaptureInput::LiveCamera(stream)).await,
                None => Err(CaptureError::device_unavailable("camera is not started")),
            };
            drop(camera);
            outcome
        })
        .await
    }

    // =========================================================================
    // Camera toggle
    // =========================================================================

    /// Open the camera for this surface. A refusal is shown on the surface.
    ///
    /// A result or error on display is cleared first; the staged image stays.
    pub async fn start_camera(&self, runtime: &SurfaceRuntime) -> ApiResult<()> {
        let mut camera = runtime.camera.lock().await;
        if camera.as_ref().is_some_and(MediaStream::is_active) {
            return Ok(());
        }

        {
            let mut slot = runtime.slot.lock().await;
            if slot.closed {
                return Err(ApiError::not_found(format!("surface {}", runtime.id)));
            }
            slot.surface.clear_outcome();
        }

        let opened = self.camera.open(CameraConstraints::default()).await;
        let mut slot = runtime.slot.lock().await;
        if slot.closed {
            return Err(ApiError::not_found(format!("surface {}", runtime.id)));
        }

        match opened {
            Ok(stream) => {
                info!(surface_id = %runtime.id, device = self.camera.name(), "Camera started");
                *camera = Some(stream);
                slot.surface.set_camera(CameraState::On);
            }
            Err(e) => {
                warn!(surface_id = %runtime.id, error = %e, "Camera start failed");
                slot.surface.set_camera(CameraState::Off);
                slot.surface.record_failure(e.to_failure());
            }
        }
        Ok(())
    }

    /// Stop the camera. Returns the number of tracks stopped; an in-flight
    /// analysis keeps running.
    pub async fn stop_camera(&self, runtime: &SurfaceRuntime) -> usize {
        let stopped = match runtime.camera.lock().await.take() {
            Some(mut stream) => stream.stop(),
            None => 0,
        };
        runtime.slot.lock().await.surface.set_camera(CameraState::Off);
        debug!(surface_id = %runtime.id, tracks = stopped, "Camera stopped");
        stopped
    }

    // =========================================================================
    // Analysis
    // =========================================================================

    /// Start classifying the staged image in the background.
    pub async fn start_analysis(&self, runtime: &Arc<SurfaceRuntime>) -> ApiResult<JoinHandle<()>> {
        let (ticket, image, signal) = {
            let mut slot = runtime.slot.lock().await;
            if slot.closed {
                return Err(ApiError::not_found(format!("surface {}", runtime.id)));
            }
            let (ticket, image) = slot.surface.begin_analysis()?;
            let (cancel, signal) = cancel_pair();
            slot.inflight = Some(InFlight {
                epoch: ticket.epoch(),
                cancel,
            });
            (ticket, image, signal)
        };

        let classifier = self.classifier.clone();
        let runtime = Arc::clone(runtime);
        Ok(tokio::spawn(async move {
            let outcome = classifier
                .classify(&image, ClassifyOptions::default().with_cancel(signal))
                .await;
            runtime.finish_analysis(ticket, outcome).await;
        }))
    }

    /// Classify the staged image, optionally waiting for the outcome.
    pub async fn analyze(&self, runtime: &Arc<SurfaceRuntime>, wait: bool) -> ApiResult<()> {
        let task = self.start_analysis(runtime).await?;
        if wait {
            task.await
                .map_err(|e| ApiError::internal(format!("analysis task failed: {}", e)))?;
        }
        Ok(())
    }
}
