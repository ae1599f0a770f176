//! Prometheus metrics
//!
//! Installs the process-wide recorder and names the series exported on
//! `/metrics`:
//! - `http_requests_total` - counter by method, handler and status
//! - `http_request_duration_seconds` - histogram by method and handler
//! - `service_discovery_registered` - gauge, 1 while the instance is announced
//! - `service_discovery_attempts_total` - counter by operation and outcome

use std::sync::OnceLock;
use std::time::Duration;

use ::metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
pub use metrics_exporter_prometheus::PrometheusHandle;

use super::{ObservabilityError, ObservabilityResult};

/// Common metric names
pub mod metric_names {
    pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
    pub const DISCOVERY_REGISTERED: &str = "service_discovery_registered";
    pub const DISCOVERY_ATTEMPTS_TOTAL: &str = "service_discovery_attempts_total";
}

const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

static RECORDER: OnceLock<Result<PrometheusHandle, String>> = OnceLock::new();

/// Install the Prometheus recorder and return the handle used to render it.
/// Later calls hand back the handle from the first installation.
pub fn init_metrics() -> ObservabilityResult<PrometheusHandle> {
    RECORDER
        .get_or_init(install_recorder)
        .clone()
        .map_err(ObservabilityError::Metrics)
}

fn install_recorder() -> Result<PrometheusHandle, String> {
    let recorder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(metric_names::HTTP_REQUEST_DURATION_SECONDS.to_string()),
            LATENCY_BUCKETS,
        )
        .map_err(|e| e.to_string())?
        .build_recorder();
    let handle = recorder.handle();

    ::metrics::set_global_recorder(recorder)
        .map_err(|_| "a metrics recorder is already installed".to_string())?;

    register_metric_descriptions();
    Ok(handle)
}

fn register_metric_descriptions() {
    describe_counter!(
        metric_names::HTTP_REQUESTS_TOTAL,
        "Total number of HTTP requests handled"
    );
    describe_histogram!(
        metric_names::HTTP_REQUEST_DURATION_SECONDS,
        "HTTP request latency in seconds"
    );
    describe_gauge!(
        metric_names::DISCOVERY_REGISTERED,
        "Whether this instance is currently announced to service discovery"
    );
    describe_counter!(
        metric_names::DISCOVERY_ATTEMPTS_TOTAL,
        "Registration and deregistration attempts against service discovery"
    );
}

/// Record one handled HTTP request
pub fn record_http_request(method: &str, handler: &str, status: u16, duration: Duration) {
    counter!(
        metric_names::HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "handler" => handler.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        metric_names::HTTP_REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "handler" => handler.to_string()
    )
    .record(duration.as_secs_f64());
}

pub fn record_registration_state(service: &str, registered: bool) {
    gauge!(metric_names::DISCOVERY_REGISTERED, "service" => service.to_string())
        .set(if registered { 1.0 } else { 0.0 });
}

/// `operation` is `register` or `deregister`
pub fn record_discovery_attempt(service: &str, operation: &'static str, success: bool) {
    counter!(
        metric_names::DISCOVERY_ATTEMPTS_TOTAL,
        "service" => service.to_string(),
        "operation" => operation,
        "outcome" => if success { "success" } else { "failure" }
    )
    .increment(1);
}

/// Value of the first rendered sample of `name` carrying every label in `labels`
#[cfg(test)]
pub(crate) fn sample_value(rendered: &str, name: &str, labels: &[&str]) -> Option<f64> {
    rendered
        .lines()
        .filter(|line| !line.starts_with('#'))
        .filter(|line| line.starts_with(name) && labels.iter().all(|l| line.contains(l)))
        .find_map(|line| line.rsplit(' ').next()?.parse().ok())
}
