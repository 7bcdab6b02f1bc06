//! Remote snapshot acquisition (ESP32-CAM style devices).
//!
//! Camera firmwares expose a still image under different paths. The prober
//! tries a fixed list of suffixes one after another and takes the first
//! response that is 2xx and declares an image content type.

use std::time::{Duration, Instant};

use agrisave_models::ClassificationRequest;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::error::{CaptureError, CaptureResult};
use crate::metrics;

/// Path suffixes tried against the device base URL, in order.
/// The empty suffix covers a base URL that already points at a still image.
pub const SNAPSHOT_CANDIDATES: [&str; 5] = ["", "/capture", "/jpg", "/snapshot", "/cam-hi.jpg"];

/// Filename given to remote snapshots.
pub const SNAPSHOT_FILENAME: &str = "esp32.jpg";

/// MIME type used when the device sends an empty content type.
const DEFAULT_SNAPSHOT_MIME: &str = "image/jpeg";

/// Candidate URLs for a device, in probe order.
pub fn candidate_urls(base_url: &str) -> Vec<String> {
    let base = base_url.trim().trim_end_matches('/');
    SNAPSHOT_CANDIDATES
        .iter()
        .map(|suffix| format!("{}{}", base, suffix))
        .collect()
}

fn validate_base_url(base_url: &str) -> CaptureResult<()> {
    let parsed = url::Url::parse(base_url.trim())
        .map_err(|e| CaptureError::InvalidUrl(format!("{}: {}", base_url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(CaptureError::InvalidUrl(format!(
            "{}: unsupported scheme {}",
            base_url, other
        ))),
    }
}

/// Fetches still images from remote camera devices.
#[derive(Clone)]
pub struct SnapshotProber {
    http: Client,
}

impl SnapshotProber {
    /// Create a prober whose probes each time out after `timeout`.
    pub fn new(timeout: Duration) -> CaptureResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| CaptureError::network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http })
    }

    /// Fetch one still image from the device at `base_url`.
    ///
    /// Candidates are probed strictly in sequence. If all of them fail the
    /// error of the last attempt is returned.
    pub async fn fetch(&self, base_url: &str) -> CaptureResult<ClassificationRequest> {
        validate_base_url(base_url)?;

        let start = Instant::now();
        let mut last_error = None;

        for url in candidate_urls(base_url) {
            match self.probe(&url).await {
                Ok(request) => {
                    metrics::record_probe("success");
                    metrics::record_snapshot_fetch(true, start.elapsed());
                    info!(url = %url, size_bytes = request.len(), "Remote snapshot captured");
                    return Ok(request);
                }
                Err(e) => {
                    metrics::record_probe(match &e {
                        CaptureError::InvalidResponse(_) => "invalid_response",
                        _ => "network_error",
                    });
                    debug!(url = %url, error = %e, "Snapshot candidate failed");
                    last_error = Some(e);
                }
            }
        }

        metrics::record_snapshot_fetch(false, start.elapsed());
        let err = last_error
            .unwrap_or_else(|| CaptureError::network(format!("{}: no snapshot candidates", base_url)));
        warn!(base_url = %base_url, error = %err, "Remote snapshot failed on every candidate");
        Err(err)
    }

    async fn probe(&self, url: &str) -> CaptureResult<ClassificationRequest> {
        let response = self
            .http
            .get(url)
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await
            .map_err(|e| CaptureError::network(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CaptureError::invalid_response(format!(
                "{} returned HTTP {}",
                url,
                status.as_u16()
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.contains("image") {
            return Err(CaptureError::invalid_response(format!(
                "{} did not return an image (content-type: {:?})",
                url, content_type
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CaptureError::network(format!("{}: {}", url, e)))?;

        let mime_type = content_type
            .split(';')
            .next()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_SNAPSHOT_MIME);

        Ok(ClassificationRequest::new(bytes.to_vec(), SNAPSHOT_FILENAME, mime_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn prober() -> SnapshotProber {
        SnapshotProber::new(Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_candidate_urls() {
        assert_eq!(
            candidate_urls("http://10.0.0.5/"),
            vec![
                "http://10.0.0.5",
                "http://10.0.0.5/capture",
                "http://10.0.0.5/jpg",
                "http://10.0.0.5/snapshot",
                "http://10.0.0.5/cam-hi.jpg",
            ]
        );
    }

    #[tokio::test]
    async fn test_last_candidate_wins_after_404s() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cam-hi.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"hi-res-jpeg".to_vec(), "image/jpeg"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let request = prober().fetch(&server.uri()).await.unwrap();
        assert_eq!(request.bytes, b"hi-res-jpeg");
        assert_eq!(request.filename, SNAPSHOT_FILENAME);
        assert_eq!(request.mime_type, "image/jpeg");

        let paths: Vec<String> = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|r| r.url.path().to_string())
            .collect();
        assert_eq!(paths, vec!["/", "/capture", "/jpg", "/snapshot", "/cam-hi.jpg"]);
    }

    #[tokio::test]
    async fn test_stops_at_first_image() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/capture"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"capture".to_vec(), "image/png"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"jpg".to_vec(), "image/jpeg"))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let request = prober().fetch(&server.uri()).await.unwrap();
        assert_eq!(request.bytes, b"capture");
        assert_eq!(request.mime_type, "image/png");
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_non_image_content_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"<html>".to_vec(), "text/html"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/capture"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"frame".to_vec(), "image/jpeg"))
            .mount(&server)
            .await;

        let request = prober().fetch(&server.uri()).await.unwrap();
        assert_eq!(request.bytes, b"frame");
    }

    #[tokio::test]
    async fn test_all_fail_reports_last_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cam-hi.jpg"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = prober().fetch(&server.uri()).await.unwrap_err();
        assert!(matches!(err, CaptureError::InvalidResponse(_)));
        let message = err.to_string();
        assert!(message.contains("/cam-hi.jpg"));
        assert!(message.contains("503"));
        assert_eq!(server.received_requests().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_probes_disable_caching() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("cache-control", "no-store"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"img".to_vec(), "image/jpeg"))
            .expect(1)
            .mount(&server)
            .await;

        prober().fetch(&server.uri()).await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_device_is_network_failure() {
        let err = prober().fetch("http://127.0.0.1:9").await.unwrap_err();
        assert!(matches!(err, CaptureError::Network(_)));
        assert!(err.to_string().contains("/cam-hi.jpg"));
    }

    #[tokio::test]
    async fn test_invalid_base_url() {
        let err = prober().fetch("not a url").await.unwrap_err();
        assert!(matches!(err, CaptureError::InvalidUrl(_)));

        let err = prober().fetch("ftp://10.0.0.5").await.unwrap_err();
        assert!(matches!(err, CaptureError::InvalidUrl(_)));
    }
}
