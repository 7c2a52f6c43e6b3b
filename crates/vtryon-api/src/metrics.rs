//! Prometheus metrics for the API server.

use std::sync::LazyLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex_lite::Regex;

/// Install the Prometheus recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "vtryon_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vtryon_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "vtryon_http_requests_in_flight";

    // Pipeline metrics
    pub const OPERATIONS_TOTAL: &str = "vtryon_operations_total";
    pub const STAGE_DURATION_SECONDS: &str = "vtryon_stage_duration_seconds";
    pub const POSE_NOT_DETECTED_TOTAL: &str = "vtryon_pose_not_detected_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "vtryon_rate_limit_hits_total";
    pub const LIVE_RATE_LIMITED_TOTAL: &str = "vtryon_live_rate_limited_total";

    // Uploads
    pub const UPLOADS_TOTAL: &str = "vtryon_uploads_total";
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

/// Record the outcome of a pipeline operation.
pub fn record_operation(operation: &str, outcome: &str) {
    let labels = [
        ("operation", operation.to_string()),
        ("outcome", outcome.to_string()),
    ];
    counter!(names::OPERATIONS_TOTAL, &labels).increment(1);
}

/// Record how long one pipeline stage took.
pub fn record_stage_duration(operation: &str, stage: &str, duration_secs: f64) {
    let labels = [
        ("operation", operation.to_string()),
        ("stage", stage.to_string()),
    ];
    histogram!(names::STAGE_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_pose_not_detected(mode: &str) {
    let labels = [("mode", mode.to_string())];
    counter!(names::POSE_NOT_DETECTED_TOTAL, &labels).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Record a live frame rejected by the per-client window.
pub fn record_live_rate_limited() {
    counter!(names::LIVE_RATE_LIMITED_TOTAL).increment(1);
}

pub fn record_upload() {
    counter!(names::UPLOADS_TOTAL).increment(1);
}

static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}").unwrap()
});
static NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/[0-9]+(/|$)").unwrap());
static UPLOAD_FILE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^/uploads/[^/]+$").unwrap());

/// Sanitize path for metrics labels (remove IDs and file names).
fn sanitize_path(path: &str) -> String {
    // Every stored artifact is served under its own name
    if UPLOAD_FILE_RE.is_match(path) {
        return "/uploads/:file".to_string();
    }
    let path = UUID_RE.replace_all(path, ":id");
    let path = NUMERIC_RE.replace_all(&path, "/:id$1");
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    // Decrement even if the handler future is dropped mid-request
    let _in_flight = scopeguard::guard((), |_| {
        gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);
    });

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/uploads/live_result_1700000000000.jpg"),
            "/uploads/:file"
        );
        assert_eq!(sanitize_path("/api/tryon"), "/api/tryon");
        assert_eq!(sanitize_path("/api/items/42"), "/api/items/:id");
        assert_eq!(
            sanitize_path("/api/x/550e8400-e29b-41d4-a716-446655440000"),
            "/api/x/:id"
        );
    }
}
