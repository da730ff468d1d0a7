//! HTTP/WebSocket API for the Pasur server.
//!
//! # Architecture
//!
//! The API is built with:
//! - **Axum**: Async web framework for HTTP/WebSocket
//! - **Tower**: CORS middleware
//! - **Actor Model**: Each session is owned by its own actor task
//!
//! # Modules
//!
//! - [`connections`]: Connection registry; the sessions' notifier and presence sink
//! - [`sessions`]: Session creation, listing and presence lookups
//! - [`websocket`]: Per-player bidirectional game traffic
//! - [`rate_limiter`]: Per-connection message limits
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health                         - Health check
//! GET  /ws?user_id=<id>                - Player WebSocket
//! POST /api/v1/sessions                - Create session (matchmaking)
//! GET  /api/v1/sessions                - List live sessions
//! GET  /api/v1/users/{user_id}/status  - Presence of a user
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively. In production, configure appropriate
//! origins, methods, and headers.

pub mod connections;
pub mod rate_limiter;
pub mod sessions;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use pasur::{
    db::{Database, SessionRepository},
    session::{SessionConfig, SessionManager, SessionServices},
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub use connections::ConnectionRegistry;

/// Application state shared across all HTTP handlers and WebSocket connections.
#[derive(Clone)]
pub struct AppState {
    pub manager: SessionManager,
    pub connections: Arc<ConnectionRegistry>,
    /// Present when sessions are stored in PostgreSQL
    pub database: Option<Database>,
}

impl AppState {
    /// Wire a session manager to a fresh connection registry.
    pub fn new(
        config: SessionConfig,
        repository: Arc<dyn SessionRepository>,
        database: Option<Database>,
    ) -> Self {
        let connections = Arc::new(ConnectionRegistry::new());
        let services = SessionServices {
            repository,
            notifier: connections.clone(),
            presence: connections.clone(),
        };
        Self {
            manager: SessionManager::new(config, services),
            connections,
            database,
        }
    }
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Example
///
/// ```rust,no_run
/// # use pasur_server::api::{create_router, AppState};
/// # use pasur::{db::InMemorySessionRepository, session::SessionConfig};
/// # use std::sync::Arc;
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let state = AppState::new(
///     SessionConfig::default(),
///     Arc::new(InMemorySessionRepository::new()),
///     None,
/// );
/// let app = create_router(state);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:6969").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route(
            "/sessions",
            post(sessions::create_session).get(sessions::list_sessions),
        )
        .route("/users/{user_id}/status", get(sessions::user_status));

    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(websocket::websocket_handler))
        .nest("/api/v1", v1_routes)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when storage is reachable, `503 Service Unavailable`
/// otherwise. In-memory storage is always reachable.
///
/// # Example
///
/// ```bash
/// curl http://localhost:6969/health
/// # {"status":"healthy","database":null,"sessions":{"active_count":0},"connections":0,...}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = match &state.database {
        Some(database) => Some(database.health_check().await.is_ok()),
        None => None,
    };
    let healthy = db_healthy.unwrap_or(true);

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "sessions": {
            "active_count": state.manager.active_sessions().await,
        },
        "connections": state.connections.connection_count(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
