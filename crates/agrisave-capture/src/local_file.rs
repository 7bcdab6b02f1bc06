//! Local file acquisition.

use std::path::Path;

use agrisave_models::ClassificationRequest;
use tracing::debug;

use crate::error::{CaptureError, CaptureResult};

/// Filename used when an upload carries none.
pub const DEFAULT_UPLOAD_NAME: &str = "upload";

/// MIME type guessed from a filename extension.
pub fn mime_from_filename(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Wrap uploaded bytes as a classification request.
///
/// The bytes are used as-is. A missing or blank MIME type is inferred from the
/// filename.
pub fn from_upload(
    bytes: Vec<u8>,
    filename: Option<&str>,
    mime_type: Option<&str>,
) -> CaptureResult<ClassificationRequest> {
    let filename = filename
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or(DEFAULT_UPLOAD_NAME)
        .to_string();

    if bytes.is_empty() {
        return Err(CaptureError::EmptyImage(filename));
    }

    let mime_type = match mime_type.map(str::trim) {
        Some(m) if !m.is_empty() => m.to_string(),
        _ => mime_from_filename(&filename).to_string(),
    };

    debug!(filename = %filename, mime_type = %mime_type, size_bytes = bytes.len(), "Accepted local file");
    Ok(ClassificationRequest::new(bytes, filename, mime_type))
}

/// Read an image file from disk.
pub async fn read_path(path: impl AsRef<Path>) -> CaptureResult<ClassificationRequest> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await?;
    let filename = path.file_name().and_then(|n| n.to_str());
    from_upload(bytes, filename, None)
}
