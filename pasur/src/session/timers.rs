//! Timers owned by a session actor.
//!
//! None of these spawn anything. The actor keeps each one in an `Option`
//! field and waits on its next deadline inside its `select!` loop, so
//! replacing the field is all it takes to cancel a timer. A session can
//! therefore never have two turn timers running.

use std::time::Duration;
use tokio::time::Instant;

use crate::game::UserId;

/// What a turn timer has to report when its wakeup is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Broadcast the remaining whole seconds
    Tick { remaining_secs: u64 },
    /// The turn is over
    Expired,
}

/// Countdown for one player's turn with periodic ticks.
#[derive(Debug, Clone)]
pub struct TurnTimer {
    user_id: UserId,
    deadline: Instant,
    next_tick: Instant,
    tick_interval: Duration,
}

impl TurnTimer {
    /// Starts a countdown of `timeout` for `user_id`, first tick one
    /// `tick_interval` from now.
    pub fn arm(user_id: UserId, timeout: Duration, tick_interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            user_id,
            deadline: now + timeout,
            next_tick: now + tick_interval,
            tick_interval,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Earliest instant the owner must call [`TurnTimer::poll`] at.
    pub fn next_wakeup(&self) -> Instant {
        self.next_tick.min(self.deadline)
    }

    /// Whole seconds left, rounded up.
    pub fn remaining_secs(&self, now: Instant) -> u64 {
        let left = self.deadline.saturating_duration_since(now);
        let secs = left.as_secs();
        if left.subsec_nanos() > 0 { secs + 1 } else { secs }
    }

    /// Advances the timer past `now`.
    pub fn poll(&mut self, now: Instant) -> TimerEvent {
        if now >= self.deadline {
            return TimerEvent::Expired;
        }
        while self.next_tick <= now {
            self.next_tick += self.tick_interval;
        }
        TimerEvent::Tick {
            remaining_secs: self.remaining_secs(now),
        }
    }
}

/// One-shot fallback deadline.
///
/// Used both for the continuation wait after a play and for the ready wait
/// after the deal. Whoever calls [`FallbackGate::take`] first wins; every
/// later call sees an empty gate.
#[derive(Debug, Clone, Default)]
pub struct FallbackGate {
    deadline: Option<Instant>,
}

/// Bounded wait between a resolved play and the next turn.
pub type ContinuationGate = FallbackGate;

/// Bounded wait between the deal and the first turn.
pub type ReadyGate = FallbackGate;

impl FallbackGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the gate with a fallback `timeout` from now, replacing any
    /// previous deadline.
    pub fn arm(&mut self, timeout: Duration) {
        self.deadline = Some(Instant::now() + timeout);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Closes the gate. Returns whether it was open.
    pub fn take(&mut self) -> bool {
        self.deadline.take().is_some()
    }
}

/// Sleeps until `deadline`, or forever when there is none.
pub async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
