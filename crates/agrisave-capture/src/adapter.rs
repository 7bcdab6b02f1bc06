//! Unified capture dispatch.

use agrisave_models::{CaptureSource, ClassificationRequest};
use tracing::{info_span, Instrument};

use crate::camera::MediaStream;
use crate::config::CaptureConfig;
use crate::error::{CaptureError, CaptureResult};
use crate::frame::FrameEncoder;
use crate::local_file;
use crate::metrics;
use crate::remote_snapshot::SnapshotProber;

/// Input for one capture, carrying whatever the source needs.
#[derive(Debug)]
pub enum CaptureInput<'a> {
    LocalFile {
        bytes: Vec<u8>,
        filename: Option<String>,
        mime_type: Option<String>,
    },
    LiveCamera(&'a MediaStream),
    RemoteSnapshot {
        url: String,
    },
}

impl CaptureInput<'_> {
    pub fn source(&self) -> CaptureSource {
        match self {
            CaptureInput::LocalFile { .. } => CaptureSource::LocalFile,
            CaptureInput::LiveCamera(_) => CaptureSource::LiveCameraFrame,
            CaptureInput::RemoteSnapshot { url } => CaptureSource::RemoteSnapshot { url: url.clone() },
        }
    }
}

/// Produces one still image per call from any capture source.
#[derive(Clone)]
pub struct CaptureAdapter {
    encoder: FrameEncoder,
    prober: SnapshotProber,
}

impl CaptureAdapter {
    pub fn new(config: &CaptureConfig) -> CaptureResult<Self> {
        Ok(Self {
            encoder: FrameEncoder::new(config.jpeg_quality),
            prober: SnapshotProber::new(config.snapshot_timeout)?,
        })
    }

    pub fn encoder(&self) -> &FrameEncoder {
        &self.encoder
    }

    /// Acquire one image.
    pub async fn capture(&self, input: CaptureInput<'_>) -> CaptureResult<ClassificationRequest> {
        let source = input.source();
        let span = info_span!("capture", source = source.as_str());

        async move {
            match input {
                CaptureInput::LocalFile {
                    bytes,
                    filename,
                    mime_type,
                } => local_file::from_upload(bytes, filename.as_deref(), mime_type.as_deref()),
                CaptureInput::LiveCamera(stream) => {
                    if !stream.is_active() {
                        return Err(CaptureError::device_unavailable("camera stream is stopped"));
                    }
                    let request = self.encoder.encode(stream.current_frame()).await?;
                    metrics::record_frame_encoded();
                    Ok(request)
                }
                CaptureInput::RemoteSnapshot { url } => self.prober.fetch(&url).await,
            }
        }
        .instrument(span)
        .await
    }
}
