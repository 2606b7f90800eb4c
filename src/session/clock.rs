//! Time sources for the session core
//!
//! The core never runs its own timer loop. Wall-clock reads go through
//! [`Clock`], the countdown is a plain [`Countdown`] value, and the periodic
//! once-per-second signal comes from a caller-owned [`TickSource`].

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::{Interval, MissedTickBehavior};

/// Source of "now" for session timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Real wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for deterministic tests and simulations
///
/// Clones share the same underlying instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = instant;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Seconds remaining in the current session
///
/// A value, not a timer: it only changes when told to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Countdown {
    seconds: u64,
}

impl Countdown {
    pub fn new(seconds: u64) -> Self {
        Self { seconds }
    }

    pub fn seconds(&self) -> u64 {
        self.seconds
    }

    pub fn is_expired(&self) -> bool {
        self.seconds == 0
    }

    /// Set the remaining time, clamped at zero
    pub fn set(&mut self, seconds: i64) {
        self.seconds = seconds.max(0) as u64;
    }

    /// Add `minutes * 60` seconds
    pub fn extend(&mut self, minutes: u32) {
        self.seconds = self.seconds.saturating_add(u64::from(minutes) * 60);
    }

    /// Decrement by one second, saturating at zero
    pub fn tick(&mut self) -> u64 {
        self.seconds = self.seconds.saturating_sub(1);
        self.seconds
    }

    /// Format as `MM:SS` (minutes may exceed 59)
    pub fn display(&self) -> String {
        format!("{:02}:{:02}", self.seconds / 60, self.seconds % 60)
    }
}

/// Periodic trigger that drives the countdown from the caller side
#[async_trait]
pub trait TickSource: Send {
    /// Wait for the next tick
    async fn tick(&mut self);
}

/// Real once-per-period ticks backed by a tokio interval
pub struct IntervalTicks {
    interval: Interval,
}

impl IntervalTicks {
    /// Create a tick source firing every `period`
    ///
    /// The first tick fires one full period after creation. Must be called
    /// within a tokio runtime.
    pub fn new(period: Duration) -> Self {
        let start = tokio::time::Instant::now() + period;
        let mut interval = tokio::time::interval_at(start, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    /// One tick per second
    pub fn every_second() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait]
impl TickSource for IntervalTicks {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

/// Ticks that resolve immediately, for tests and fast-forward simulations
#[derive(Debug, Default)]
pub struct ManualTicks {
    delivered: u64,
}

impl ManualTicks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ticks handed out so far
    pub fn delivered(&self) -> u64 {
        self.delivered
    }
}

#[async_trait]
impl TickSource for ManualTicks {
    async fn tick(&mut self) {
        self.delivered += 1;
        tokio::task::yield_now().await;
    }
}
