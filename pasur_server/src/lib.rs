//! WebSocket server for the Pasur session engine.
//!
//! Wraps [`pasur::session::SessionManager`] in an axum router: matchmaking
//! creates sessions over HTTP and players talk to them over WebSockets.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
