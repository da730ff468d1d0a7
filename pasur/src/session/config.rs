//! Session timing and rule configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::game::{GameSettings, ScoringRules};

/// Per-session configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Seconds a player has to act (default: 15)
    pub turn_timeout_secs: u64,

    /// Interval between remaining-time broadcasts in milliseconds (default: 1000)
    pub tick_interval_ms: u64,

    /// Fallback before a resolved play continues without client ack (default: 3000)
    pub continuation_timeout_ms: u64,

    /// Fallback before the first turn starts without both ready acks (default: 30)
    pub ready_timeout_secs: u64,

    /// Expired turns in a row that forfeit the game (default: 3)
    pub max_consecutive_timeouts: u32,

    /// Minimum deck size for a redeal and for a sur (default: 8)
    pub redeal_threshold: usize,

    /// Bonus suits and control threshold
    pub scoring: ScoringRules,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            turn_timeout_secs: 15,
            tick_interval_ms: 1000,
            continuation_timeout_ms: 3000,
            ready_timeout_secs: 30,
            max_consecutive_timeouts: 3,
            redeal_threshold: 8,
            scoring: ScoringRules::default(),
        }
    }
}

impl SessionConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.turn_timeout_secs == 0 {
            return Err("Turn timeout must be at least 1 second".to_string());
        }

        if self.tick_interval_ms == 0 {
            return Err("Tick interval must be positive".to_string());
        }

        if self.tick_interval_ms > self.turn_timeout_secs * 1000 {
            return Err("Tick interval must not exceed the turn timeout".to_string());
        }

        if self.continuation_timeout_ms == 0 {
            return Err("Continuation timeout must be positive".to_string());
        }

        if self.max_consecutive_timeouts == 0 {
            return Err("Max consecutive timeouts must be at least 1".to_string());
        }

        if self.scoring.control_threshold == 0 || self.scoring.control_threshold > 13 {
            return Err("Control threshold must be between 1 and 13".to_string());
        }

        Ok(())
    }

    pub fn turn_timeout(&self) -> Duration {
        Duration::from_secs(self.turn_timeout_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn continuation_timeout(&self) -> Duration {
        Duration::from_millis(self.continuation_timeout_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    /// Rule settings handed to the state machine at the deal
    pub fn game_settings(&self) -> GameSettings {
        GameSettings {
            redeal_threshold: self.redeal_threshold,
            max_consecutive_timeouts: self.max_consecutive_timeouts,
            scoring: self.scoring,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.turn_timeout(), Duration::from_secs(15));
        assert_eq!(config.continuation_timeout(), Duration::from_secs(3));
        assert_eq!(config.game_settings(), GameSettings::default());
    }

    #[test]
    fn test_validate_rejects_zero_timeouts() {
        let config = SessionConfig {
            turn_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SessionConfig {
            max_consecutive_timeouts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_tick_longer_than_turn() {
        let config = SessionConfig {
            turn_timeout_secs: 2,
            tick_interval_ms: 5000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
