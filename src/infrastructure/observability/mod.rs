//! Observability infrastructure - Prometheus metrics

mod config;
mod metrics;

pub use config::MetricsConfig;
pub use metrics::{
    PrometheusMetrics, create_metrics_router, init_metrics, record_http_request, record_lab_call,
    record_limit_rejection, record_session_event, set_active_sessions,
};
