//! Capture configuration.

use std::time::Duration;

use agrisave_models::FacingMode;

/// JPEG quality used for camera frames (0.92 in browser terms).
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

/// Canvas size used when the frame reports no native resolution.
pub const FALLBACK_FRAME_WIDTH: u32 = 640;
pub const FALLBACK_FRAME_HEIGHT: u32 = 480;

/// Capture configuration.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Timeout for each remote snapshot probe
    pub snapshot_timeout: Duration,
    /// When false, every camera open is refused
    pub camera_enabled: bool,
    /// Facing mode the attached camera serves
    pub facing: FacingMode,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            snapshot_timeout: Duration::from_secs(5),
            camera_enabled: true,
            facing: FacingMode::Environment,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl CaptureConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            snapshot_timeout: Duration::from_secs(
                std::env::var("SNAPSHOT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.snapshot_timeout.as_secs()),
            ),
            camera_enabled: std::env::var("CAMERA_ENABLED")
                .map(|s| s != "false" && s != "0")
                .unwrap_or(defaults.camera_enabled),
            facing: std::env::var("CAMERA_FACING")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.facing),
            jpeg_quality: std::env::var("JPEG_QUALITY")
                .ok()
                .and_then(|s| s.parse::<u8>().ok())
                .map(|q| q.clamp(1, 100))
                .unwrap_or(defaults.jpeg_quality),
        }
    }
}
