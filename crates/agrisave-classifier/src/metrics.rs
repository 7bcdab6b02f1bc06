//! Classifier metrics collection.

use std::time::Duration;

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Total classification requests by outcome.
    pub const REQUESTS_TOTAL: &str = "agrisave_classifier_requests_total";

    /// Classification latency in seconds by outcome.
    pub const LATENCY_SECONDS: &str = "agrisave_classifier_latency_seconds";
}

/// Record metrics for a finished classification call.
pub fn record_request(outcome: &str, latency: Duration) {
    counter!(names::REQUESTS_TOTAL, "outcome" => outcome.to_string()).increment(1);
    histogram!(names::LATENCY_SECONDS, "outcome" => outcome.to_string())
        .record(latency.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::REQUESTS_TOTAL.contains("requests"));
        assert!(names::LATENCY_SECONDS.contains("latency"));
    }
}
