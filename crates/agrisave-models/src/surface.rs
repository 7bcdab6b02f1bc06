//! Capture surface state machine.
//!
//! A capture surface is one UI feature instance that acquires a still image
//! and triggers classification. Its analysis state is a single
//! [`SurfaceState`] value:
//!
//! ```text
//! Idle -> Acquiring -> Ready | Error
//! Ready | Result | Error(with image) -> Busy -> Result | Error
//! ```
//!
//! Every transition that starts work bumps the surface epoch and hands back a
//! [`Ticket`]. Completions must present the ticket they were started with;
//! a completion from an older epoch is rejected as stale, which is how a
//! superseded request is kept from overwriting a newer display.
//!
//! The camera toggle is tracked separately and never touches the analysis
//! state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::CaptureSource;
use crate::classification::{
    BadgeTone, ClassificationRequest, ClassificationResult, ImageSummary, LeafMetrics,
};

/// Failure categories surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Camera access refused
    PermissionDenied,
    /// No camera, or the camera is held by another surface
    DeviceUnavailable,
    /// Classification or snapshot fetch failed, timed out or was cancelled
    NetworkFailure,
    /// Non-2xx status, non-image content or undecodable body
    InvalidResponse,
    /// Frame could not be serialized to an image
    EncodingFailure,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::PermissionDenied => "permission_denied",
            FailureKind::DeviceUnavailable => "device_unavailable",
            FailureKind::NetworkFailure => "network_failure",
            FailureKind::InvalidResponse => "invalid_response",
            FailureKind::EncodingFailure => "encoding_failure",
        }
    }
}

/// User-visible failure stored on a surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl SurfaceFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Image held by a surface together with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Staged {
    pub source: CaptureSource,
    pub image: ClassificationRequest,
}

/// Analysis state of a surface.
#[derive(Debug, Clone, Default)]
pub enum SurfaceState {
    #[default]
    Idle,
    Acquiring {
        source: CaptureSource,
    },
    Ready(Staged),
    Busy(Staged),
    /// Idle with a result on display
    Result {
        staged: Staged,
        result: ClassificationResult,
    },
    Error {
        staged: Option<Staged>,
        failure: SurfaceFailure,
    },
}

/// Discriminant of [`SurfaceState`] for views and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfacePhase {
    Idle,
    Acquiring,
    Ready,
    Busy,
    Result,
    Error,
}

impl SurfacePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SurfacePhase::Idle => "idle",
            SurfacePhase::Acquiring => "acquiring",
            SurfacePhase::Ready => "ready",
            SurfacePhase::Busy => "busy",
            SurfacePhase::Result => "result",
            SurfacePhase::Error => "error",
        }
    }

    /// True while an acquisition or analysis is outstanding.
    pub fn is_working(&self) -> bool {
        matches!(self, SurfacePhase::Acquiring | SurfacePhase::Busy)
    }
}

impl std::fmt::Display for SurfacePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SurfaceState {
    pub fn phase(&self) -> SurfacePhase {
        match self {
            SurfaceState::Idle => SurfacePhase::Idle,
            SurfaceState::Acquiring { .. } => SurfacePhase::Acquiring,
            SurfaceState::Ready(_) => SurfacePhase::Ready,
            SurfaceState::Busy(_) => SurfacePhase::Busy,
            SurfaceState::Result { .. } => SurfacePhase::Result,
            SurfaceState::Error { .. } => SurfacePhase::Error,
        }
    }

    fn staged(&self) -> Option<&Staged> {
        match self {
            SurfaceState::Ready(staged) | SurfaceState::Busy(staged) => Some(staged),
            SurfaceState::Result { staged, .. } => Some(staged),
            SurfaceState::Error { staged, .. } => staged.as_ref(),
            SurfaceState::Idle | SurfaceState::Acquiring { .. } => None,
        }
    }

    pub fn result(&self) -> Option<&ClassificationResult> {
        match self {
            SurfaceState::Result { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&SurfaceFailure> {
        match self {
            SurfaceState::Error { failure, .. } => Some(failure),
            _ => None,
        }
    }
}

/// Camera toggle, independent of the analysis state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CameraState {
    #[default]
    Off,
    On,
}

/// Proof that a piece of work was started under a given epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    epoch: u64,
}

impl Ticket {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Rejected surface transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("surface is {0}; wait for the current operation to finish")]
    InProgress(SurfacePhase),

    #[error("no image to analyze; capture or upload one first")]
    NothingToAnalyze,

    #[error("stale completion for epoch {ticket}, surface is at epoch {current}")]
    Stale { ticket: u64, current: u64 },
}

/// One capture surface.
#[derive(Debug, Clone)]
pub struct CaptureSurface {
    state: SurfaceState,
    camera: CameraState,
    epoch: u64,
    updated_at: DateTime<Utc>,
}

impl Default for CaptureSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSurface {
    pub fn new() -> Self {
        Self {
            state: SurfaceState::Idle,
            camera: CameraState::Off,
            epoch: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn state(&self) -> &SurfaceState {
        &self.state
    }

    pub fn phase(&self) -> SurfacePhase {
        self.state.phase()
    }

    pub fn camera(&self) -> CameraState {
        self.camera
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn ensure_idle_enough(&self) -> Result<(), TransitionError> {
        let phase = self.phase();
        if phase.is_working() {
            return Err(TransitionError::InProgress(phase));
        }
        Ok(())
    }

    fn next_ticket(&mut self) -> Ticket {
        self.epoch += 1;
        self.updated_at = Utc::now();
        Ticket { epoch: self.epoch }
    }

    fn check_ticket(&self, ticket: Ticket) -> Result<(), TransitionError> {
        if ticket.epoch != self.epoch {
            return Err(TransitionError::Stale {
                ticket: ticket.epoch,
                current: self.epoch,
            });
        }
        Ok(())
    }

    /// Start acquiring a new image. Any displayed result or error is cleared.
    pub fn begin_acquisition(&mut self, source: CaptureSource) -> Result<Ticket, TransitionError> {
        self.ensure_idle_enough()?;
        let ticket = self.next_ticket();
        self.state = SurfaceState::Acquiring { source };
        Ok(ticket)
    }

    /// Store the acquired image; the surface becomes `Ready`.
    pub fn complete_acquisition(
        &mut self,
        ticket: Ticket,
        image: ClassificationRequest,
    ) -> Result<(), TransitionError> {
        self.check_ticket(ticket)?;
        let source = match &self.state {
            SurfaceState::Acquiring { source } => source.clone(),
            other => return Err(TransitionError::InProgress(other.phase())),
        };
        self.state = SurfaceState::Ready(Staged { source, image });
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Start analysing the staged image. Any displayed result or error is cleared.
    ///
    /// Returns the image to submit.
    pub fn begin_analysis(&mut self) -> Result<(Ticket, ClassificationRequest), TransitionError> {
        self.ensure_idle_enough()?;
        let staged = self
            .state
            .staged()
            .cloned()
            .ok_or(TransitionError::NothingToAnalyze)?;
        let ticket = self.next_ticket();
        let image = staged.image.clone();
        self.state = SurfaceState::Busy(staged);
        Ok((ticket, image))
    }

    /// Record a classification result for the analysis started with `ticket`.
    pub fn complete_analysis(
        &mut self,
        ticket: Ticket,
        result: ClassificationResult,
    ) -> Result<(), TransitionError> {
        self.check_ticket(ticket)?;
        let staged = match &self.state {
            SurfaceState::Busy(staged) => staged.clone(),
            other => return Err(TransitionError::InProgress(other.phase())),
        };
        self.state = SurfaceState::Result { staged, result };
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Record a failed acquisition or analysis started with `ticket`.
    pub fn fail(&mut self, ticket: Ticket, failure: SurfaceFailure) -> Result<(), TransitionError> {
        self.check_ticket(ticket)?;
        let staged = match &self.state {
            SurfaceState::Acquiring { .. } => None,
            SurfaceState::Busy(staged) => Some(staged.clone()),
            other => return Err(TransitionError::InProgress(other.phase())),
        };
        self.state = SurfaceState::Error { staged, failure };
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Record a failure that happened outside an acquisition or analysis
    /// (e.g. camera permission). Ignored while work is outstanding so the
    /// pending outcome is not hidden.
    pub fn record_failure(&mut self, failure: SurfaceFailure) -> bool {
        if self.phase().is_working() {
            return false;
        }
        let staged = self.state.staged().cloned();
        self.state = SurfaceState::Error { staged, failure };
        self.updated_at = Utc::now();
        true
    }

    /// Clear a displayed result or error, keeping the staged image.
    ///
    /// Returns false while work is outstanding; nothing is cleared then.
    pub fn clear_outcome(&mut self) -> bool {
        if self.phase().is_working() {
            return false;
        }
        let state = std::mem::take(&mut self.state);
        self.state = match state {
            SurfaceState::Result { staged, .. } => SurfaceState::Ready(staged),
            SurfaceState::Error {
                staged: Some(staged),
                ..
            } => SurfaceState::Ready(staged),
            SurfaceState::Error { staged: None, .. } => SurfaceState::Idle,
            other => other,
        };
        self.updated_at = Utc::now();
        true
    }

    /// Drop any staged image, result or error and invalidate pending work.
    pub fn reset(&mut self) {
        self.next_ticket();
        self.state = SurfaceState::Idle;
    }

    pub fn set_camera(&mut self, camera: CameraState) {
        self.camera = camera;
        self.updated_at = Utc::now();
    }

    /// Serializable snapshot of the surface.
    pub fn view(&self) -> SurfaceView {
        SurfaceView {
            phase: self.phase(),
            camera: self.camera,
            epoch: self.epoch,
            source: match &self.state {
                SurfaceState::Acquiring { source } => Some(source.clone()),
                other => other.staged().map(|s| s.source.clone()),
            },
            image: self.state.staged().map(|s| s.image.summary()),
            result: self.state.result().map(ResultView::from),
            error: self.state.failure().cloned(),
            updated_at: self.updated_at,
        }
    }
}

/// Classification result with display fields filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultView {
    #[serde(rename = "class")]
    pub class: String,
    pub class_label: String,
    pub confidence: f64,
    pub confidence_display: String,
    pub confidence_badge: String,
    pub tone: BadgeTone,
    pub metrics: LeafMetrics,
    pub raw: ClassificationResult,
}

impl From<&ClassificationResult> for ResultView {
    fn from(result: &ClassificationResult) -> Self {
        Self {
            class: result.class.as_str().to_string(),
            class_label: result.class_label(),
            confidence: result.confidence,
            confidence_display: result.confidence_display(),
            confidence_badge: result.confidence_badge(),
            tone: result.class.tone(),
            metrics: result.metrics.clone(),
            raw: result.clone(),
        }
    }
}

/// Serializable snapshot of a surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceView {
    pub phase: SurfacePhase,
    pub camera: CameraState,
    pub epoch: u64,
    pub source: Option<CaptureSource>,
    pub image: Option<ImageSummary>,
    pub result: Option<ResultView>,
    pub error: Option<SurfaceFailure>,
    pub updated_at: DateTime<Utc>,
}
