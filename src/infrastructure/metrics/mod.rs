//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - HTTP request counts and latency
//! - Active sessions by kind and active broadcast groups
//! - Inbound events by kind and outcome, handler latency
//! - Fanout deliveries by outbound event
//! - Database pool statistics and mirror failures

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge,
    IntGaugeVec, Opts, Registry, TextEncoder,
};

const NAMESPACE: &str = "chat_hub";

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// HTTP request counter - tracks total requests by method, path, and status code
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests").namespace(NAMESPACE),
        &["method", "path", "status"],
    )
    .expect("Failed to create HTTP_REQUESTS_TOTAL metric")
});

/// HTTP request latency histogram - tracks request duration in seconds
pub static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];
    HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        )
        .namespace(NAMESPACE)
        .buckets(buckets),
        &["method", "path"],
    )
    .expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric")
});

/// Active sessions by kind ("chat", "notifications")
pub static SESSIONS_ACTIVE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("sessions_active", "Number of active WebSocket sessions").namespace(NAMESPACE),
        &["kind"],
    )
    .expect("Failed to create SESSIONS_ACTIVE metric")
});

/// Broadcast groups with at least one subscriber
pub static GROUPS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("groups_active", "Number of non-empty broadcast groups").namespace(NAMESPACE),
    )
    .expect("Failed to create GROUPS_ACTIVE metric")
});

/// Inbound events by kind and outcome
pub static EVENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("events_total", "Inbound events by kind and outcome").namespace(NAMESPACE),
        &["kind", "outcome"], // "ok", "rejected", "dropped", "malformed", "unknown"
    )
    .expect("Failed to create EVENTS_TOTAL metric")
});

/// Handler latency histogram
pub static HANDLER_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0];
    HistogramVec::new(
        HistogramOpts::new("handler_duration_seconds", "Event handler latency in seconds")
            .namespace(NAMESPACE)
            .buckets(buckets),
        &["kind"],
    )
    .expect("Failed to create HANDLER_DURATION_SECONDS metric")
});

/// Events handed to session queues, by outbound event type
pub static FANOUT_DELIVERIES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("fanout_deliveries_total", "Events delivered to session queues")
            .namespace(NAMESPACE),
        &["event"],
    )
    .expect("Failed to create FANOUT_DELIVERIES_TOTAL metric")
});

/// Failed PUBLISH calls on the external mirror
pub static MIRROR_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new("mirror_failures_total", "Events the Redis mirror failed to publish")
            .namespace(NAMESPACE),
    )
    .expect("Failed to create MIRROR_FAILURES_TOTAL metric")
});

/// Database connection pool stats
pub static DB_POOL_CONNECTIONS: Lazy<GaugeVec> = Lazy::new(|| {
    GaugeVec::new(
        Opts::new("db_pool_connections", "Database connection pool statistics")
            .namespace(NAMESPACE),
        &["state"], // "idle", "active", "max"
    )
    .expect("Failed to create DB_POOL_CONNECTIONS metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("Failed to register HTTP_REQUESTS_TOTAL");
    registry
        .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
        .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS");
    registry
        .register(Box::new(SESSIONS_ACTIVE.clone()))
        .expect("Failed to register SESSIONS_ACTIVE");
    registry
        .register(Box::new(GROUPS_ACTIVE.clone()))
        .expect("Failed to register GROUPS_ACTIVE");
    registry
        .register(Box::new(EVENTS_TOTAL.clone()))
        .expect("Failed to register EVENTS_TOTAL");
    registry
        .register(Box::new(HANDLER_DURATION_SECONDS.clone()))
        .expect("Failed to register HANDLER_DURATION_SECONDS");
    registry
        .register(Box::new(FANOUT_DELIVERIES_TOTAL.clone()))
        .expect("Failed to register FANOUT_DELIVERIES_TOTAL");
    registry
        .register(Box::new(MIRROR_FAILURES_TOTAL.clone()))
        .expect("Failed to register MIRROR_FAILURES_TOTAL");
    registry
        .register(Box::new(DB_POOL_CONNECTIONS.clone()))
        .expect("Failed to register DB_POOL_CONNECTIONS");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Helper to record HTTP request metrics
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

/// Helper to record one inbound event
pub fn record_event(kind: &str, outcome: &str) {
    EVENTS_TOTAL.with_label_values(&[kind, outcome]).inc();
}

pub fn record_handler_duration(kind: &str, duration_secs: f64) {
    HANDLER_DURATION_SECONDS
        .with_label_values(&[kind])
        .observe(duration_secs);
}

pub fn record_deliveries(event: &str, delivered: usize) {
    if delivered > 0 {
        FANOUT_DELIVERIES_TOTAL
            .with_label_values(&[event])
            .inc_by(delivered as u64);
    }
}

pub fn session_opened(kind: &str) {
    SESSIONS_ACTIVE.with_label_values(&[kind]).inc();
}

pub fn session_closed(kind: &str) {
    SESSIONS_ACTIVE.with_label_values(&[kind]).dec();
}

pub fn set_active_groups(count: usize) {
    GROUPS_ACTIVE.set(count as i64);
}

/// Helper to update database pool stats
pub fn update_db_pool_stats(idle: u32, active: u32, max: u32) {
    DB_POOL_CONNECTIONS
        .with_label_values(&["idle"])
        .set(idle as f64);
    DB_POOL_CONNECTIONS
        .with_label_values(&["active"])
        .set(active as f64);
    DB_POOL_CONNECTIONS
        .with_label_values(&["max"])
        .set(max as f64);
}
