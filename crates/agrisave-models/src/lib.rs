//! Shared data models for the AgriSave leaf health gateway.
//!
//! This crate provides Serde-serializable types for:
//! - Classification requests and backend results
//! - Capture sources and camera facing modes
//! - The per-surface capture/analysis state machine
//! - Farmer login sessions and UI languages

pub mod capture;
pub mod classification;
pub mod error;
pub mod farmer;
pub mod language;
pub mod surface;

// Re-export common types
pub use capture::{CaptureSource, FacingMode};
pub use classification::{
    BadgeTone, ClassificationRequest, ClassificationResult, ImageSummary, LeafHealthClass,
    LeafMetrics,
};
pub use error::{ModelError, ModelResult};
pub use farmer::{FarmerProfile, FarmerSession};
pub use language::{Language, UiLabel};
pub use surface::{
    CameraState, CaptureSurface, FailureKind, ResultView, Staged, SurfaceFailure, SurfacePhase,
    SurfaceState, SurfaceView, Ticket, TransitionError,
};
