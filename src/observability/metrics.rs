//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): total requests by method, status
//! - `proxy_request_duration_seconds` (histogram): latency distribution
//! - `pipeline_module_duration_seconds` (histogram): time spent per module
//! - `pipeline_truncations_total` (counter): bodies cut by a size limit
//! - `pipeline_aborts_total` (counter): pipeline runs that did not complete
//!
//! # Design Decisions
//! - Recording is a no-op until [`init_metrics`] installs the exporter
//! - Labels stay low-cardinality (method, status, module, reason)

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP scrape endpoint on `addr`.
///
/// Must be called from within the Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(title = "Metrics", address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(title = "Metrics", error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a proxied request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Record one module invocation.
pub fn record_module(module: &str, start: Instant) {
    histogram!("pipeline_module_duration_seconds", "module" => module.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record a body cut by `source`.
pub fn record_truncation(source: &'static str) {
    counter!("pipeline_truncations_total", "source" => source).increment(1);
}

/// Record a pipeline run that did not complete.
pub fn record_pipeline_abort(reason: &'static str) {
    counter!("pipeline_aborts_total", "reason" => reason).increment(1);
}
