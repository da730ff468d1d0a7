//! Structured logging configuration.
//!
//! The engine logs through the `log` facade; the subscriber installed here
//! picks those records up alongside the server's own `tracing` events.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Requests slower than this are logged at `warn`
const SLOW_REQUEST_MS: u64 = 500;

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var and default to
/// `info,sqlx=warn,hyper=warn`.
///
/// # Example
///
/// ```no_run
/// use pasur_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a session lifecycle event with structured data
///
/// # Example
///
/// ```
/// use pasur_server::logging::log_session_event;
///
/// log_session_event("session_created", uuid::Uuid::nil(), None, "room 4");
/// ```
pub fn log_session_event(event_type: &str, session_id: Uuid, user_id: Option<i64>, message: &str) {
    tracing::info!(
        event_type = event_type,
        session_id = %session_id,
        user_id = user_id,
        "SESSION: {}",
        message
    );
}

/// Log how long a client request took
pub fn log_performance(operation: &str, duration_ms: u64, user_id: Option<i64>) {
    if duration_ms > SLOW_REQUEST_MS {
        tracing::warn!(
            operation = operation,
            duration_ms = duration_ms,
            user_id = user_id,
            "PERFORMANCE: Slow operation"
        );
    } else {
        tracing::debug!(
            operation = operation,
            duration_ms = duration_ms,
            user_id = user_id,
            "Performance metric"
        );
    }
}
