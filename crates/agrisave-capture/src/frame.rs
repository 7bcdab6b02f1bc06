//! Camera frames and JPEG encoding.
//!
//! A capture paints the current frame onto a canvas sized to the frame's
//! native resolution and encodes the canvas as JPEG. When no frame size is
//! known the canvas falls back to 640x480 and stays blank.

use std::sync::Arc;

use agrisave_models::ClassificationRequest;
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, RgbImage};
use tracing::debug;

use crate::config::{DEFAULT_JPEG_QUALITY, FALLBACK_FRAME_HEIGHT, FALLBACK_FRAME_WIDTH};
use crate::error::{CaptureError, CaptureResult};

/// Filename given to encoded camera frames.
pub const FRAME_FILENAME: &str = "frame.jpg";
/// MIME type of encoded camera frames.
pub const FRAME_MIME_TYPE: &str = "image/jpeg";

/// One decoded video frame.
#[derive(Clone)]
pub struct VideoFrame {
    image: RgbImage,
}

impl VideoFrame {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    /// Decode an encoded image (JPEG, PNG, ...) pushed by a relay device.
    pub fn decode(bytes: &[u8]) -> CaptureResult<Self> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| CaptureError::invalid_response(format!("Frame is not a decodable image: {}", e)))?;
        Ok(Self::new(decoded.to_rgb8()))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Native resolution, if the frame has one.
    pub fn native_size(&self) -> Option<(u32, u32)> {
        match (self.image.width(), self.image.height()) {
            (0, _) | (_, 0) => None,
            size => Some(size),
        }
    }
}

impl std::fmt::Debug for VideoFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoFrame")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

/// Canvas dimensions for a capture.
pub fn canvas_size(frame: Option<&VideoFrame>) -> (u32, u32) {
    frame
        .and_then(VideoFrame::native_size)
        .unwrap_or((FALLBACK_FRAME_WIDTH, FALLBACK_FRAME_HEIGHT))
}

fn paint(frame: Option<&VideoFrame>) -> RgbImage {
    match frame {
        Some(frame) if frame.native_size().is_some() => frame.image.clone(),
        _ => RgbImage::new(FALLBACK_FRAME_WIDTH, FALLBACK_FRAME_HEIGHT),
    }
}

/// Serializes frames to JPEG at a fixed quality.
#[derive(Debug, Clone, Copy)]
pub struct FrameEncoder {
    quality: u8,
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl FrameEncoder {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Encode on the calling thread.
    pub fn encode_blocking(&self, frame: Option<&VideoFrame>) -> CaptureResult<ClassificationRequest> {
        let canvas = paint(frame);
        let (width, height) = canvas.dimensions();

        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, self.quality)
            .encode(canvas.as_raw(), width, height, ColorType::Rgb8)
            .map_err(|e| CaptureError::encoding(e.to_string()))?;

        if buf.is_empty() {
            return Err(CaptureError::encoding("encoder produced no data"));
        }

        debug!(width, height, quality = self.quality, size_bytes = buf.len(), "Encoded camera frame");
        Ok(ClassificationRequest::new(buf, FRAME_FILENAME, FRAME_MIME_TYPE))
    }

    /// Encode on the blocking pool.
    pub async fn encode(&self, frame: Option<Arc<VideoFrame>>) -> CaptureResult<ClassificationRequest> {
        let encoder = *self;
        tokio::task::spawn_blocking(move || encoder.encode_blocking(frame.as_deref()))
            .await
            .map_err(|e| CaptureError::encoding(format!("encoder task failed: {}", e)))?
    }
}
