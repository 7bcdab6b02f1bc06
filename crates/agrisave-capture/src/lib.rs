//! Frame capture adapters for the AgriSave gateway.
//!
//! Each adapter produces exactly one still image per call, packaged as a
//! `ClassificationRequest`:
//! - Local files (uploads or paths on disk)
//! - Live camera frames, encoded to JPEG
//! - Remote snapshots probed from camera devices

pub mod adapter;
pub mod camera;
pub mod config;
pub mod error;
pub mod frame;
pub mod local_file;
pub mod metrics;
pub mod remote_snapshot;

pub use adapter::{CaptureAdapter, CaptureInput};
pub use camera::{CameraConstraints, CameraDevice, MediaStream, MediaTrack, RelayCamera, TrackState};
pub use config::CaptureConfig;
pub use error::{CaptureError, CaptureResult};
pub use frame::{FrameEncoder, VideoFrame};
pub use remote_snapshot::{SnapshotProber, SNAPSHOT_CANDIDATES};
