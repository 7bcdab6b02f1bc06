//! Capture metrics.

use std::time::Duration;

use metrics::{counter, histogram};

pub mod names {
    /// Remote snapshot probe attempts by outcome.
    pub const SNAPSHOT_PROBES_TOTAL: &str = "agrisave_snapshot_probes_total";

    /// Full remote snapshot fetch duration in seconds.
    pub const SNAPSHOT_FETCH_SECONDS: &str = "agrisave_snapshot_fetch_seconds";

    /// Camera frames encoded.
    pub const FRAMES_ENCODED_TOTAL: &str = "agrisave_frames_encoded_total";
}

pub fn record_probe(outcome: &'static str) {
    counter!(names::SNAPSHOT_PROBES_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_snapshot_fetch(success: bool, duration: Duration) {
    let outcome = if success { "success" } else { "failure" };
    histogram!(names::SNAPSHOT_FETCH_SECONDS, "outcome" => outcome).record(duration.as_secs_f64());
}

pub fn record_frame_encoded() {
    counter!(names::FRAMES_ENCODED_TOTAL).increment(1);
}
