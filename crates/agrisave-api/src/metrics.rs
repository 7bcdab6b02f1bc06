//! Prometheus metrics for the gateway.

use std::sync::OnceLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return its render handle.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "agrisave_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "agrisave_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "agrisave_http_requests_in_flight";

    // Surface metrics
    pub const SURFACES_ACTIVE: &str = "agrisave_surfaces_active";
    pub const ACQUISITIONS_TOTAL: &str = "agrisave_acquisitions_total";
    pub const ANALYSES_TOTAL: &str = "agrisave_analyses_total";
    pub const STALE_COMPLETIONS_TOTAL: &str = "agrisave_stale_completions_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "agrisave_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn set_active_surfaces(count: usize) {
    gauge!(names::SURFACES_ACTIVE).set(count as f64);
}

/// Record a finished acquisition by source and outcome.
pub fn record_acquisition(source: &'static str, outcome: &'static str) {
    counter!(names::ACQUISITIONS_TOTAL, "source" => source, "outcome" => outcome).increment(1);
}

/// Record a finished analysis by outcome.
pub fn record_analysis(outcome: &'static str) {
    counter!(names::ANALYSES_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_stale_completion(kind: &'static str) {
    counter!(names::STALE_COMPLETIONS_TOTAL, "kind" => kind).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

fn uuid_pattern() -> &'static regex_lite::Regex {
    static PATTERN: OnceLock<regex_lite::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        regex_lite::Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
            .expect("static regex")
    })
}

/// Sanitize path for metrics labels (surface, session and preview IDs).
fn sanitize_path(path: &str) -> String {
    uuid_pattern().replace_all(path, ":id").to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
