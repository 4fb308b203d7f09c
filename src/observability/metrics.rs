//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define server metrics (requests, latency, in-flight, unit loads)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `treeserve_requests_total` (counter): requests by method, status
//! - `treeserve_request_duration_seconds` (histogram): latency by method
//! - `treeserve_inflight_requests` (gauge): requests holding an admission token
//! - `treeserve_unit_loads_total` (counter): unit loads by outcome
//! - `treeserve_handler_errors_total` (counter): routines that raised

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Middleware recording count and latency of every request.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    metrics::counter!("treeserve_requests_total", "method" => method.clone(), "status" => status)
        .increment(1);
    metrics::histogram!("treeserve_request_duration_seconds", "method" => method)
        .record(start.elapsed().as_secs_f64());
    response
}

pub fn set_in_flight(count: usize) {
    metrics::gauge!("treeserve_inflight_requests").set(count as f64);
}

/// `outcome` is one of `compiled`, `reused`, `failed`.
pub fn record_unit_load(outcome: &'static str) {
    metrics::counter!("treeserve_unit_loads_total", "outcome" => outcome).increment(1);
}

pub fn record_handler_error() {
    metrics::counter!("treeserve_handler_errors_total").increment(1);
}
