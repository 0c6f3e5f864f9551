//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, extract::State, response::IntoResponse, routing::get};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use regex::Regex;

use super::config::MetricsConfig;

static UUID_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}").unwrap()
});

static SESSION_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"sess_[A-Za-z0-9_-]+").unwrap());

static KEY_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"key_[0-9a-f]+").unwrap());

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    /// Get the metrics as a string for the /metrics endpoint
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Initialize Prometheus metrics
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            gauge!("cost_lab_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);

            tracing::info!("Prometheus metrics initialized at {}", config.path);

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

/// Create the metrics router
pub fn create_metrics_router(metrics: PrometheusMetrics, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Record an HTTP request metric
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());

    if status >= 500 {
        counter!("http_server_errors_total", &labels).increment(1);
    }
}

/// Record one sandboxed provider call
pub fn record_lab_call(provider: &str, model: &str, tokens: u64, cost: f64, latency: Duration) {
    let labels = [("provider", provider.to_string()), ("model", model.to_string())];

    counter!("lab_calls_total", &labels).increment(1);
    counter!("lab_tokens_total", &labels).increment(tokens);
    histogram!("lab_call_cost", &labels).record(cost);
    histogram!("lab_call_latency_seconds", &labels).record(latency.as_secs_f64());
}

/// Record a call rejected by a session quota or lifetime check
pub fn record_limit_rejection(reason: &str) {
    counter!("lab_resource_limit_rejections_total", "reason" => reason.to_string()).increment(1);
}

/// Record a session lifecycle event (created, terminated, purged)
pub fn record_session_event(event: &'static str, count: u64) {
    counter!("lab_session_events_total", "event" => event).increment(count);
}

pub fn set_active_sessions(count: usize) {
    gauge!("lab_active_sessions").set(count as f64);
}

/// Replace ids in a path so labels stay low-cardinality
fn sanitize_path(path: &str) -> String {
    let path = UUID_SEGMENT.replace_all(path, "{id}");
    let path = SESSION_SEGMENT.replace_all(&path, "{session_id}");
    let path = KEY_SEGMENT.replace_all(&path, "{key_id}");

    path.chars().take(50).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path_uuid() {
        let path = "/lab/experiments/550e8400-e29b-41d4-a716-446655440000/summary";
        assert_eq!(sanitize_path(path), "/lab/experiments/{id}/summary");
    }

    #[test]
    fn test_sanitize_path_session_id() {
        let path = "/lab/sessions/sess_AbC-d_9xYz/calls";
        assert_eq!(sanitize_path(path), "/lab/sessions/{session_id}/calls");
    }

    #[test]
    fn test_sanitize_path_key_id() {
        let path = "/lab/keys/key_0123abcd";
        assert_eq!(sanitize_path(path), "/lab/keys/{key_id}");
    }

    #[test]
    fn test_sanitize_path_no_id() {
        assert_eq!(sanitize_path("/health"), "/health");
    }

    #[test]
    fn test_sanitize_path_truncates_long_paths() {
        let path = "/very/long/path/that/exceeds/the/maximum/allowed/length/for/metrics";
        assert!(sanitize_path(path).chars().count() <= 50);
    }
}
