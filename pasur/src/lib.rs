//! # Pasur
//!
//! A two-player Pasur ("fishing") session engine.
//!
//! Each game is a short-lived session between two players who take turns
//! playing cards from a four-card hand onto a shared table, capturing cards
//! whose values sum to eleven, sweeping with jacks, and pairing kings and
//! queens. The engine owns dealing, capture resolution, turn timers,
//! inactivity and disconnect forfeits, persistence and end-of-round scoring.
//!
//! ## Core Modules
//!
//! - [`game`]: Cards, the capture solver, scoring and the session state machine
//! - [`session`]: One async actor per live game plus the manager that routes to them
//! - [`db`]: Session persistence (PostgreSQL and in-memory)
//! - [`net`]: JSON request/response protocol spoken by clients
//!
//! ## Example
//!
//! ```
//! use pasur::game::{GameSettings, Phase, Session};
//! use rand::{SeedableRng, rngs::StdRng};
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let session = Session::deal(
//!     uuid::Uuid::new_v4(),
//!     1,
//!     &[10, 20],
//!     GameSettings::default(),
//!     &mut rng,
//! )
//! .unwrap();
//! assert_eq!(session.phase(), Phase::AwaitingReady);
//! assert_eq!(session.deck_len(), 52 - 4 - 8);
//! ```

/// Session persistence.
pub mod db;

/// Core game logic, entities, and state machine.
pub mod game;
pub use game::{GameError, GameSettings, Phase, Session};

/// Client protocol.
pub mod net;

/// Live session actors and their manager.
pub mod session;
pub use session::{SessionConfig, SessionError, SessionManager};
