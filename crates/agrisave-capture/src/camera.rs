//! Camera devices and media streams.
//!
//! A [`CameraDevice`] hands out [`MediaStream`]s. A stream owns the device
//! exclusively until it is stopped or dropped; opening a second stream while
//! one is live fails with `DeviceUnavailable`.
//!
//! [`RelayCamera`] is the device used by the gateway: a field device or
//! browser pushes frames to it and a live stream always reads the latest one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use agrisave_models::FacingMode;
use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::CaptureConfig;
use crate::error::{CaptureError, CaptureResult};
use crate::frame::VideoFrame;

/// Constraints passed when opening a camera.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CameraConstraints {
    /// Preferred facing mode; a device serving another mode is still used
    pub facing: FacingMode,
}

/// Lifecycle of a media track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Live,
    Ended,
}

/// One track of a media stream.
#[derive(Debug)]
pub struct MediaTrack {
    id: String,
    label: String,
    state: TrackState,
}

impl MediaTrack {
    pub fn video(label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            label: label.into(),
            state: TrackState::Live,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    /// End the track. Returns false if it had already ended.
    pub fn stop(&mut self) -> bool {
        if self.state == TrackState::Ended {
            return false;
        }
        self.state = TrackState::Ended;
        true
    }
}

/// A live camera stream.
pub struct MediaStream {
    id: Uuid,
    facing: FacingMode,
    tracks: Vec<MediaTrack>,
    frames: watch::Receiver<Option<Arc<VideoFrame>>>,
    lease: Option<Arc<AtomicBool>>,
}

impl MediaStream {
    /// Build a stream holding `lease` until it is stopped.
    pub fn new(
        facing: FacingMode,
        tracks: Vec<MediaTrack>,
        frames: watch::Receiver<Option<Arc<VideoFrame>>>,
        lease: Arc<AtomicBool>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            facing,
            tracks,
            frames,
            lease: Some(lease),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn facing(&self) -> FacingMode {
        self.facing
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    /// True until the stream has been stopped.
    pub fn is_active(&self) -> bool {
        self.tracks.iter().any(|t| t.state() == TrackState::Live)
    }

    /// Latest frame, or `None` if nothing has been received yet or the stream is stopped.
    pub fn current_frame(&self) -> Option<Arc<VideoFrame>> {
        if !self.is_active() {
            return None;
        }
        self.frames.borrow().clone()
    }

    /// Stop every live track and release the device.
    ///
    /// Returns the number of tracks stopped by this call; a repeated stop
    /// returns 0.
    pub fn stop(&mut self) -> usize {
        let stopped = self.tracks.iter_mut().map(MediaTrack::stop).filter(|s| *s).count();
        if let Some(lease) = self.lease.take() {
            lease.store(false, Ordering::Release);
            debug!(stream_id = %self.id, tracks = stopped, "Camera stream stopped");
        }
        stopped
    }
}

impl Drop for MediaStream {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStream")
            .field("id", &self.id)
            .field("facing", &self.facing)
            .field("tracks", &self.tracks)
            .finish()
    }
}

/// A camera that can be opened for a live stream.
#[async_trait]
pub trait CameraDevice: Send + Sync {
    /// Device name for logging.
    fn name(&self) -> &'static str;

    /// Request exclusive access and start a stream.
    async fn open(&self, constraints: CameraConstraints) -> CaptureResult<MediaStream>;
}

/// Camera fed by frames pushed over the network.
pub struct RelayCamera {
    enabled: bool,
    facing: FacingMode,
    frames: watch::Sender<Option<Arc<VideoFrame>>>,
    in_use: Arc<AtomicBool>,
}

impl RelayCamera {
    pub fn new(config: &CaptureConfig) -> Self {
        let (frames, _) = watch::channel(None);
        Self {
            enabled: config.camera_enabled,
            facing: config.facing,
            frames,
            in_use: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Replace the latest frame.
    pub fn push_frame(&self, frame: VideoFrame) {
        debug!(width = frame.width(), height = frame.height(), "Relay frame received");
        self.frames.send_replace(Some(Arc::new(frame)));
    }

    pub fn latest_frame(&self) -> Option<Arc<VideoFrame>> {
        self.frames.borrow().clone()
    }

    /// True while a stream holds the device.
    pub fn in_use(&self) -> bool {
        self.in_use.load(Ordering::Acquire)
    }
}

#[async_trait]
impl CameraDevice for RelayCamera {
    fn name(&self) -> &'static str {
        "relay"
    }

    async fn open(&self, constraints: CameraConstraints) -> CaptureResult<MediaStream> {
        if !self.enabled {
            return Err(CaptureError::permission_denied("camera access is disabled"));
        }

        if self
            .in_use
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CaptureError::device_unavailable(
                "camera is already in use by another surface",
            ));
        }

        if constraints.facing != self.facing {
            debug!(
                requested = constraints.facing.as_str(),
                available = self.facing.as_str(),
                "Requested facing mode not available, using relay camera"
            );
        }

        let label = format!("relay camera ({})", self.facing.as_str());
        let stream = MediaStream::new(
            self.facing,
            vec![MediaTrack::video(label)],
            self.frames.subscribe(),
            Arc::clone(&self.in_use),
        );
        info!(stream_id = %stream.id(), facing = self.facing.as_str(), "Camera stream opened");
        Ok(stream)
    }
}
