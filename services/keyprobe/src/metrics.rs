//! Prometheus metrics exposition
//!
//! The service records:
//!
//! - `keyprobe_http_requests_total` (counter): labels `route`, `status`
//! - `keyprobe_http_request_duration_seconds` (histogram): label `route`
//!
//! `keyprobe_verifications_total` and `keyprobe_evictions_total` are recorded
//! by the key pool and rendered through the same recorder.

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

const DURATION_METRIC: &str = "keyprobe_http_request_duration_seconds";

/// Route handlers are in-memory lookups; `/data` only spawns work.
const DURATION_BUCKETS: &[f64] = &[0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.5, 1.0];

fn builder() -> PrometheusBuilder {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(DURATION_METRIC.to_string()), DURATION_BUCKETS)
        .expect("bucket list is non-empty")
}

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    Ok(builder().install_recorder()?)
}

/// Record a served request by route template and status code.
pub fn record_request(route: &str, status: u16, duration_secs: f64) {
    metrics::counter!(
        "keyprobe_http_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(DURATION_METRIC, "route" => route.to_string()).record(duration_secs);
}

#[cfg(test)]
pub(crate) fn isolated_recorder() -> (
    metrics_exporter_prometheus::PrometheusRecorder,
    PrometheusHandle,
) {
    let recorder = builder().build_recorder();
    let handle = recorder.handle();
    (recorder, handle)
}
