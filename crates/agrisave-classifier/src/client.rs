//! HTTP client for the leaf classification backend.
//!
//! One call, one POST: the image goes out as a multipart form with a single
//! `image` file part and the JSON reply is returned as parsed. Retrying is
//! left to the caller.

use std::time::Instant;

use agrisave_models::{ClassificationRequest, ClassificationResult};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::{debug, info_span, warn, Instrument};

use crate::cancel::CancelSignal;
use crate::config::ClassifierConfig;
use crate::error::{ClassifierError, ClassifierResult};
use crate::metrics;

/// Multipart field carrying the image.
pub const IMAGE_FIELD: &str = "image";

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct ClassifyOptions {
    /// Overrides the configured base URL for this call
    pub base_url: Option<String>,
    /// Aborts the call when fired
    pub cancel: Option<CancelSignal>,
}

impl ClassifyOptions {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// `{base}/classify`, ignoring a trailing slash on the base.
pub fn classify_url(base_url: &str) -> String {
    format!("{}/classify", base_url.trim_end_matches('/'))
}

/// Leaf classification client.
#[derive(Clone)]
pub struct ClassifierClient {
    http: Client,
    config: ClassifierConfig,
}

impl ClassifierClient {
    /// Create a new client.
    pub fn new(config: ClassifierConfig) -> ClassifierResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(concat!("agrisave-classifier/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClassifierError::config_error(e.to_string()))?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> ClassifierResult<Self> {
        Self::new(ClassifierConfig::from_env())
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Classify one image.
    pub async fn classify(
        &self,
        request: &ClassificationRequest,
        options: ClassifyOptions,
    ) -> ClassifierResult<ClassificationResult> {
        let base_url = options.base_url.as_deref().unwrap_or(&self.config.base_url);
        let url = classify_url(base_url);

        if options.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
            metrics::record_request(ClassifierError::Cancelled.outcome(), Default::default());
            return Err(ClassifierError::Cancelled);
        }

        let span = info_span!(
            "classify",
            url = %url,
            filename = %request.filename,
            size_bytes = request.len()
        );
        let start = Instant::now();

        let call = self.post_image(&url, request).instrument(span);
        let outcome = match options.cancel {
            Some(mut cancel) => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(ClassifierError::Cancelled),
                    result = call => result,
                }
            }
            None => call.await,
        };

        let elapsed = start.elapsed();
        match &outcome {
            Ok(result) => {
                debug!(
                    class = %result.class,
                    confidence = result.confidence,
                    latency_ms = elapsed.as_millis() as u64,
                    "Classification succeeded"
                );
                metrics::record_request("success", elapsed);
            }
            Err(e) => {
                warn!(error = %e, latency_ms = elapsed.as_millis() as u64, "Classification failed");
                metrics::record_request(e.outcome(), elapsed);
            }
        }

        outcome
    }

    async fn post_image(
        &self,
        url: &str,
        request: &ClassificationRequest,
    ) -> ClassifierResult<ClassificationResult> {
        let part = Part::bytes(request.bytes.clone())
            .file_name(request.filename.clone())
            .mime_str(&request.mime_type)
            .map_err(|e| {
                ClassifierError::invalid_request(format!(
                    "invalid MIME type {:?}: {}",
                    request.mime_type, e
                ))
            })?;
        let form = Form::new().part(IMAGE_FIELD, part);

        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(ClassifierError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(ClassifierError::from_transport)?;

        serde_json::from_slice(&body).map_err(|e| ClassifierError::Decode(e.to_string()))
    }

    /// Check that the backend answers `GET {base}/health`.
    pub async fn health(&self) -> ClassifierResult<()> {
        let url = format!("{}/health", self.config.base_url.trim_end_matches('/'));
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(ClassifierError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_url() {
        assert_eq!(classify_url("http://localhost:5001"), "http://localhost:5001/classify");
        assert_eq!(classify_url("http://localhost:5001/"), "http://localhost:5001/classify");
        assert_eq!(classify_url(""), "/classify");
    }
}
