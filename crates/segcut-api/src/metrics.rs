//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "segcut_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "segcut_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "segcut_http_requests_in_flight";

    // WebSocket metrics
    pub const WS_CONNECTIONS_TOTAL: &str = "segcut_ws_connections_total";
    pub const WS_CONNECTIONS_ACTIVE: &str = "segcut_ws_connections_active";
    pub const WS_MESSAGES_RECEIVED: &str = "segcut_ws_messages_received_total";

    // Fan-out metrics
    pub const BROADCAST_DELIVERED_TOTAL: &str = "segcut_broadcast_delivered_total";
    pub const BROADCAST_DROPPED_TOTAL: &str = "segcut_broadcast_dropped_total";

    // Job metrics
    pub const JOBS_STARTED_TOTAL: &str = "segcut_jobs_started_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "segcut_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "segcut_jobs_failed_total";
    pub const JOB_DURATION_SECONDS: &str = "segcut_job_duration_seconds";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "segcut_rate_limit_hits_total";
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

/// Record WebSocket connection.
pub fn record_ws_connection() {
    counter!(names::WS_CONNECTIONS_TOTAL).increment(1);
}

/// Update active WebSocket connections gauge.
pub fn set_ws_active_connections(count: usize) {
    gauge!(names::WS_CONNECTIONS_ACTIVE).set(count as f64);
}

/// Record WebSocket message received (and discarded).
pub fn record_ws_message_received() {
    counter!(names::WS_MESSAGES_RECEIVED).increment(1);
}

/// Record one fan-out of an event.
pub fn record_broadcast(kind: &str, delivered: usize, dropped: usize) {
    let labels = [("kind", kind.to_string())];
    counter!(names::BROADCAST_DELIVERED_TOTAL, &labels).increment(delivered as u64);
    if dropped > 0 {
        counter!(names::BROADCAST_DROPPED_TOTAL, &labels).increment(dropped as u64);
    }
}

pub fn record_job_started() {
    counter!(names::JOBS_STARTED_TOTAL).increment(1);
}

/// Record job completed.
pub fn record_job_completed(duration_secs: f64) {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, "outcome" => "completed").record(duration_secs);
}

/// Record job failed, labelled by where it failed.
pub fn record_job_failed(reason: &str, duration_secs: f64) {
    let labels = [("reason", reason.to_string())];
    counter!(names::JOBS_FAILED_TOTAL, &labels).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, "outcome" => "failed").record(duration_secs);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Sanitize path for metrics labels.
///
/// Segment file names carry the video id, so they collapse to one label.
fn sanitize_path(path: &str) -> String {
    match path.strip_prefix("/downloads/") {
        Some(rest) if !rest.is_empty() => "/downloads/:file".to_string(),
        _ => path.to_string(),
    }
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
