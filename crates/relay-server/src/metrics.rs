//! Metrics collection and export for notify-relay.
//!
//! Uses the `metrics` crate for instrumentation and exports
//! to Prometheus format.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

/// Metric names.
pub mod names {
    pub const REQUESTS_TOTAL: &str = "notify_requests_total";
    pub const REQUEST_LATENCY_SECONDS: &str = "notify_request_latency_seconds";
    pub const CHANNELS_REGISTERED_TOTAL: &str = "notify_channels_registered_total";
    pub const MESSAGES_TOTAL: &str = "notify_messages_total";
    pub const MESSAGES_BYTES: &str = "notify_messages_bytes";
    pub const SUBSCRIPTIONS_TOTAL: &str = "notify_subscriptions_total";
    pub const LIVE_CONNECTIONS_ACTIVE: &str = "notify_live_connections_active";
    pub const LIVE_CHANNELS_ACTIVE: &str = "notify_live_channels_active";
    pub const LIVE_DELIVERIES_TOTAL: &str = "notify_live_deliveries_total";
    pub const ERRORS_TOTAL: &str = "notify_errors_total";
}

/// Initialize the metrics system.
pub fn init_metrics() {
    metrics::describe_counter!(names::REQUESTS_TOTAL, "HTTP requests by route and status");
    metrics::describe_histogram!(
        names::REQUEST_LATENCY_SECONDS,
        "HTTP request latency in seconds"
    );
    metrics::describe_counter!(
        names::CHANNELS_REGISTERED_TOTAL,
        "Channels registered since server start"
    );
    metrics::describe_counter!(names::MESSAGES_TOTAL, "Messages stored");
    metrics::describe_counter!(names::MESSAGES_BYTES, "Bytes of messages stored");
    metrics::describe_counter!(
        names::SUBSCRIPTIONS_TOTAL,
        "Subscription upserts since server start"
    );
    metrics::describe_gauge!(
        names::LIVE_CONNECTIONS_ACTIVE,
        "Current number of live WebSocket followers"
    );
    metrics::describe_gauge!(
        names::LIVE_CHANNELS_ACTIVE,
        "Channels with at least one live follower"
    );
    metrics::describe_counter!(
        names::LIVE_DELIVERIES_TOTAL,
        "Messages pushed to live followers"
    );
    metrics::describe_counter!(names::ERRORS_TOTAL, "Total number of errors");

    info!("Metrics initialized");
}

/// Start the Prometheus metrics server.
///
/// # Errors
///
/// Returns an error if the server cannot be started.
pub fn start_metrics_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    info!("Metrics server listening on {}", addr);
    Ok(())
}

/// Record a finished HTTP request.
pub fn record_request(route: &str, status: u16, seconds: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(names::REQUEST_LATENCY_SECONDS, "route" => route.to_string()).record(seconds);
}

/// Record a channel registration.
pub fn record_registration() {
    counter!(names::CHANNELS_REGISTERED_TOTAL).increment(1);
}

/// Record a stored message.
pub fn record_message(bytes: usize) {
    counter!(names::MESSAGES_TOTAL).increment(1);
    counter!(names::MESSAGES_BYTES).increment(bytes as u64);
}

/// Record a subscription upsert.
pub fn record_subscription() {
    counter!(names::SUBSCRIPTIONS_TOTAL).increment(1);
}

/// Record a message pushed to a live follower.
pub fn record_live_delivery() {
    counter!(names::LIVE_DELIVERIES_TOTAL).increment(1);
}

/// Update the count of channels with live followers.
pub fn set_live_channels(count: usize) {
    gauge!(names::LIVE_CHANNELS_ACTIVE).set(count as f64);
}

/// Record an error.
pub fn record_error(error_type: &str) {
    counter!(names::ERRORS_TOTAL, "type" => error_type.to_string()).increment(1);
}

/// Metrics guard that tracks one live follower for its lifetime.
pub struct LiveMetricsGuard;

impl LiveMetricsGuard {
    /// Create a new metrics guard, recording a live follower.
    #[must_use]
    pub fn new() -> Self {
        gauge!(names::LIVE_CONNECTIONS_ACTIVE).increment(1.0);
        Self
    }
}

impl Default for LiveMetricsGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LiveMetricsGuard {
    fn drop(&mut self) {
        gauge!(names::LIVE_CONNECTIONS_ACTIVE).decrement(1.0);
    }
}
