//! Prometheus metrics for monitoring session health.
//!
//! Metrics are exposed in Prometheus text format on `METRICS_BIND` for
//! scraping by monitoring systems.
//!
//! # Metrics
//!
//! - `websocket_connections_active` / `websocket_connections_total`
//! - `websocket_messages_received` / `websocket_messages_sent`
//! - `sessions_active` / `sessions_created_total`
//! - `plays_total` labelled with `automatic`
//! - `sessions_terminated_total` labelled with `reason`
//! - `sessions_finished_total`
//! - `request_duration_ms` labelled with `request`
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use pasur_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::websocket_connections_active(10);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use pasur::{game::TerminationReason, session::SessionEvent};
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// WebSocket Metrics
// ============================================================================

/// Set current active WebSocket connections count.
pub fn websocket_connections_active(count: usize) {
    metrics::gauge!("websocket_connections_active").set(count as f64);
}

/// Increment total WebSocket connections counter.
pub fn websocket_connections_total() {
    metrics::counter!("websocket_connections_total").increment(1);
}

/// Increment WebSocket messages sent counter.
pub fn websocket_messages_sent() {
    metrics::counter!("websocket_messages_sent").increment(1);
}

/// Increment WebSocket messages received counter.
pub fn websocket_messages_received() {
    metrics::counter!("websocket_messages_received").increment(1);
}

/// Record how long a client request took in milliseconds.
pub fn request_duration_ms(request: &'static str, duration_ms: f64) {
    metrics::histogram!("request_duration_ms", "request" => request).record(duration_ms);
}

// ============================================================================
// Session Metrics
// ============================================================================

/// Count a freshly dealt session.
pub fn session_started() {
    metrics::gauge!("sessions_active").increment(1.0);
    metrics::counter!("sessions_created_total").increment(1);
}

fn session_ended() {
    metrics::gauge!("sessions_active").decrement(1.0);
}

/// Increment plays counter.
pub fn plays_total(automatic: bool) {
    metrics::counter!("plays_total", "automatic" => automatic.to_string()).increment(1);
}

/// Increment forced terminations counter.
pub fn sessions_terminated_total(reason: TerminationReason) {
    let reason = match reason {
        TerminationReason::Inactivity => "inactivity",
        TerminationReason::Disconnected => "disconnected",
    };
    metrics::counter!("sessions_terminated_total", "reason" => reason).increment(1);
}

/// Increment scored game over counter.
pub fn sessions_finished_total() {
    metrics::counter!("sessions_finished_total").increment(1);
}

/// Record whatever a broadcast session event says about the game.
///
/// Only group broadcasts go through here so each event is counted once.
pub fn record_event(event: &SessionEvent) {
    match event {
        SessionEvent::PlayedCard { automatic, .. } => plays_total(*automatic),
        SessionEvent::GameTerminated { reason, .. } => {
            sessions_terminated_total(*reason);
            session_ended();
        }
        SessionEvent::GameOver { .. } => {
            sessions_finished_total();
            session_ended();
        }
        _ => {}
    }
}
