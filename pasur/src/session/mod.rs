//! Session module running each game inside its own async actor.
//!
//! This module implements:
//! - SessionActor: owns one game, its turn timer and its fallback gates
//! - SessionManager: spawns actors and routes requests by session id
//! - Outbound notifier traits implemented by the transport
//!
//! ## Architecture
//!
//! Each session runs in a separate Tokio task with an mpsc message inbox.
//! Player requests, the turn timer, the continuation fallback and the ready
//! fallback all go through the actor's single `select!` loop, so a session
//! is only ever mutated by one path at a time. The manager forgets a
//! session as soon as its actor returns.
//!
//! ## Example
//!
//! ```ignore
//! use pasur::db::InMemorySessionRepository;
//! use pasur::session::{ChannelNotifier, SessionConfig, SessionManager, SessionServices};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (notifier, mut events) = ChannelNotifier::new();
//!     let notifier = Arc::new(notifier);
//!     let services = SessionServices {
//!         repository: Arc::new(InMemorySessionRepository::new()),
//!         notifier: notifier.clone(),
//!         presence: notifier,
//!     };
//!     let manager = SessionManager::new(SessionConfig::default(), services);
//!     let handle = manager.create_session(uuid::Uuid::new_v4(), 1, &[10, 20]).await?;
//!     handle.initial_animation_complete(10).await?;
//! }
//! ```

pub mod actor;
pub mod config;
pub mod errors;
pub mod events;
pub mod manager;
pub mod messages;
pub mod notifier;
pub mod timers;

pub use actor::{SessionActor, SessionHandle, SessionServices};
pub use config::SessionConfig;
pub use errors::{SessionError, SessionResult};
pub use events::SessionEvent;
pub use manager::{SessionManager, SessionMetadata};
pub use messages::{ContinueOutcome, SessionMessage};
pub use notifier::{ChannelNotifier, Notification, PresenceNotifier, SessionNotifier, UserStatus};
pub use timers::{ContinuationGate, ReadyGate, TimerEvent, TurnTimer};
