//! Multipart image extraction.

use agrisave_classifier::IMAGE_FIELD;
use axum::extract::Multipart;

use crate::error::{ApiError, ApiResult};

/// File part received under the `image` field.
#[derive(Debug)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

/// Read the `image` part of a multipart form. Other parts are ignored.
pub async fn read_image(mut multipart: Multipart) -> ApiResult<UploadedImage> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {}", e)))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("failed to read image: {}", e)))?;

        return Ok(UploadedImage {
            bytes: bytes.to_vec(),
            filename,
            content_type,
        });
    }

    Err(ApiError::bad_request(format!(
        "multipart field '{}' is required",
        IMAGE_FIELD
    )))
}
