//! # Poll Schedule
//!
//! Interval and deadline for the fallback polling path. Sleeps go through
//! `tokio::time`, so a paused test clock drives them without real waiting.

use crate::config::WaitConfig;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct PollSchedule {
    interval: Duration,
    max_interval: Duration,
    multiplier: f64,
    /// `None` polls forever
    deadline: Option<Instant>,
    ticks: u32,
}

impl PollSchedule {
    /// Fixed `interval`, expiring `timeout` from now
    pub fn new(interval: Duration, timeout: Option<Duration>) -> Self {
        Self {
            interval,
            max_interval: interval,
            multiplier: 1.0,
            deadline: timeout.map(|t| Instant::now() + t),
            ticks: 0,
        }
    }

    pub fn from_config(config: &WaitConfig, timeout: Option<Duration>) -> Self {
        Self::new(config.poll_interval(), timeout)
            .with_backoff(config.backoff_multiplier, config.max_poll_interval())
    }

    /// Grow the interval by `multiplier` after every tick, capped at `max_interval`
    pub fn with_backoff(mut self, multiplier: f64, max_interval: Duration) -> Self {
        self.multiplier = multiplier.max(1.0);
        self.max_interval = max_interval.max(self.interval);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Time left before the deadline; `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_some_and(|r| r.is_zero())
    }

    /// Sleep one interval, clamped to the deadline
    ///
    /// Returns `false` without sleeping once the deadline has passed.
    pub async fn tick(&mut self) -> bool {
        match self.next_slice() {
            Some(sleep_for) => {
                tokio::time::sleep(sleep_for).await;
                true
            }
            None => false,
        }
    }

    /// Take the next interval, clamped to the deadline, without sleeping
    ///
    /// Used by waits that block on something other than a timer for at most
    /// one interval. `None` once the deadline has passed.
    pub fn next_slice(&mut self) -> Option<Duration> {
        let slice = match self.remaining() {
            Some(remaining) if remaining.is_zero() => return None,
            Some(remaining) => self.interval.min(remaining),
            None => self.interval,
        };
        self.ticks += 1;
        self.advance_interval();
        Some(slice)
    }

    fn advance_interval(&mut self) {
        if self.multiplier > 1.0 {
            self.interval = self.interval.mul_f64(self.multiplier).min(self.max_interval);
        }
    }
}
