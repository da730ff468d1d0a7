//! Per-connection message rate limiting.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Sliding-window limiter over message arrival times
#[derive(Debug)]
pub struct RateLimiter {
    arrivals: VecDeque<Instant>,
    max_messages: usize,
    window: Duration,
}

impl RateLimiter {
    /// Allow at most `max_messages` within any `window`
    ///
    /// # Example
    ///
    /// ```
    /// use pasur_server::api::rate_limiter::RateLimiter;
    /// use std::time::Duration;
    ///
    /// let mut limiter = RateLimiter::new(2, Duration::from_secs(1));
    /// assert!(limiter.check());
    /// assert!(limiter.check());
    /// assert!(!limiter.check());
    /// ```
    pub fn new(max_messages: usize, window: Duration) -> Self {
        Self {
            arrivals: VecDeque::with_capacity(max_messages),
            max_messages,
            window,
        }
    }

    /// 10 messages per second
    pub fn burst() -> Self {
        Self::new(10, Duration::from_secs(1))
    }

    /// 120 messages per minute
    pub fn sustained() -> Self {
        Self::new(120, Duration::from_secs(60))
    }

    /// Records a message if the window has room for it.
    pub fn check(&mut self) -> bool {
        self.check_at(Instant::now())
    }

    fn check_at(&mut self, now: Instant) -> bool {
        while let Some(oldest) = self.arrivals.front() {
            if now.duration_since(*oldest) > self.window {
                self.arrivals.pop_front();
            } else {
                break;
            }
        }

        if self.arrivals.len() >= self.max_messages {
            return false;
        }

        self.arrivals.push_back(now);
        true
    }

    /// Messages left in the current window
    pub fn remaining(&self) -> usize {
        self.max_messages.saturating_sub(self.arrivals.len())
    }
}
