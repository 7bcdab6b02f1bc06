//! Capture source descriptors.

use serde::{Deserialize, Serialize};

/// Where a surface obtained its still image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CaptureSource {
    /// File chosen through a file picker or upload
    LocalFile,
    /// Snapshot of the live camera feed
    LiveCameraFrame,
    /// Still fetched from a remote camera device (e.g. ESP32-CAM)
    RemoteSnapshot { url: String },
}

impl CaptureSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureSource::LocalFile => "local_file",
            CaptureSource::LiveCameraFrame => "live_camera_frame",
            CaptureSource::RemoteSnapshot { .. } => "remote_snapshot",
        }
    }
}

impl std::fmt::Display for CaptureSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureSource::RemoteSnapshot { url } => write!(f, "remote_snapshot({})", url),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Camera facing mode requested when opening a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FacingMode {
    /// Rear camera, pointed at the crop
    #[default]
    Environment,
    /// Front camera
    User,
}

impl FacingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacingMode::Environment => "environment",
            FacingMode::User => "user",
        }
    }
}

impl std::str::FromStr for FacingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "environment" | "rear" | "back" => Ok(FacingMode::Environment),
            "user" | "front" => Ok(FacingMode::User),
            other => Err(format!("unknown facing mode: {}", other)),
        }
    }
}
