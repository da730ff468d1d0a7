//! Client-facing protocol.
//!
//! Players talk to a session over JSON text frames. This module owns the
//! message shapes and the routing of parsed requests into the
//! [`crate::session::SessionManager`]; the transport itself lives in the
//! server crate.

/// Routing of client requests to live sessions.
pub mod dispatch;

/// Message types for the client-server protocol.
pub mod messages;

pub use dispatch::{handle_request, handle_text};
pub use messages::{ClientRequest, Response, ResponsePayload, ServerMessage};
