//! Session State Machine
//!
//! Owns the current and last-completed sessions, the countdown and the
//! parking lot, and dispatches persistence writes at the right transitions.
//!
//! The machine is a pure reactor to caller commands. In particular it never
//! leaves `Running` when the countdown reaches zero: the caller observing
//! [`Tick::expired`] decides whether to end the session, extend it or hand
//! over to a break flow.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use super::clock::{Clock, Countdown, SystemClock};
use super::model::{FocusQuality, ParkingLotItem, Session, SessionStatus};
use super::parking_lot::ParkingLotBuffer;
use crate::sync::{PersistenceSync, SessionPatch};

/// Result of one caller-driven countdown tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Seconds left after this tick
    pub remaining: u64,
    /// True when the countdown sits at zero while running
    pub expired: bool,
}

/// Serializable view of the machine for UI layers
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub time_remaining: u64,
    pub current: Option<Session>,
    pub last_completed: Option<Session>,
    pub parking_lot: Vec<ParkingLotItem>,
}

/// Focus session state machine
///
/// State transitions:
/// - `start_session`: any -> Running (replaces the current session)
/// - `pause_session`: Running -> Paused
/// - `resume_session`: Paused -> Running
/// - `end_session`: any -> Complete
/// - `set_status`: any -> any (external break flows)
///
/// Invalid transitions are logged no-ops.
pub struct SessionStateMachine {
    status: SessionStatus,
    current: Option<Session>,
    last_completed: Option<Session>,
    countdown: Countdown,
    parking_lot: ParkingLotBuffer,
    clock: Arc<dyn Clock>,
    sync: PersistenceSync,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock), PersistenceSync::disabled())
    }
}

impl SessionStateMachine {
    /// Create an idle machine with injected clock and persistence handle
    pub fn new(clock: Arc<dyn Clock>, sync: PersistenceSync) -> Self {
        Self {
            status: SessionStatus::Idle,
            current: None,
            last_completed: None,
            countdown: Countdown::default(),
            parking_lot: ParkingLotBuffer::new(),
            clock,
            sync,
        }
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Make `session` current and start its countdown
    ///
    /// Valid from any state. Clears the parking lot and dispatches a create
    /// write for UUID sessions without waiting on it.
    pub fn start_session(&mut self, session: Session) {
        if let Some(previous) = &self.current {
            debug!("Replacing session {} without completion", previous.id);
        }

        self.countdown = Countdown::new(session.planned_seconds());
        self.parking_lot.clear();
        self.status = SessionStatus::Running;

        self.sync.create(&session);
        info!(
            "Session {} started ({} minutes planned)",
            session.id, session.planned_duration
        );
        self.current = Some(session);
    }

    /// Running -> Paused; the countdown is left untouched
    pub fn pause_session(&mut self) {
        match self.status {
            SessionStatus::Running => {
                self.status = SessionStatus::Paused;
                debug!("Session paused at {}s", self.countdown.seconds());
            }
            other => debug!("Pause ignored while {}", other),
        }
    }

    /// Paused -> Running
    pub fn resume_session(&mut self) {
        match self.status {
            SessionStatus::Paused => {
                self.status = SessionStatus::Running;
                debug!("Session resumed at {}s", self.countdown.seconds());
            }
            other => debug!("Resume ignored while {}", other),
        }
    }

    /// Move directly to `status`
    ///
    /// Escape hatch for flows the machine does not own, such as a break
    /// timer taking over.
    pub fn set_status(&mut self, status: SessionStatus) {
        debug!("Status set externally: {} -> {}", self.status, status);
        self.status = status;
    }

    /// Complete the current session
    ///
    /// Without a current session this is a benign completion: status becomes
    /// `Complete` and the countdown zero. Otherwise the completed record is
    /// built from the wall clock, an update (and the parking-lot items, if
    /// any) is dispatched, and the record moves to the last-completed slot.
    pub fn end_session(&mut self, quality: Option<FocusQuality>, notes: Option<String>) {
        if let Some(session) = self.current.take() {
            let completed = session.completed(self.clock.now(), quality, notes);

            self.sync
                .update(&completed.id, SessionPatch::completion(&completed));
            if !self.parking_lot.is_empty() {
                self.sync
                    .bulk_create(&self.parking_lot.tagged(&completed.id), &completed.id);
            }

            info!(
                "Session {} completed after {} minute(s), {} parked item(s)",
                completed.id,
                completed.actual_duration.unwrap_or_default(),
                self.parking_lot.len()
            );
            self.last_completed = Some(completed);
        } else {
            debug!("End requested without a current session");
        }

        self.status = SessionStatus::Complete;
        self.countdown = Countdown::default();
    }

    // ========================================================================
    // Countdown
    // ========================================================================

    /// Set the countdown, clamped at zero
    pub fn set_time_remaining(&mut self, seconds: i64) {
        self.countdown.set(seconds);
    }

    /// Add `minutes * 60` seconds regardless of status
    pub fn extend_session(&mut self, minutes: u32) {
        self.countdown.extend(minutes);
        debug!("Extended by {} minute(s), {}s remaining", minutes, self.countdown.seconds());
    }

    /// Apply one periodic tick from the caller's loop
    ///
    /// Only decrements while running. Never changes status.
    pub fn tick(&mut self) -> Tick {
        if self.status == SessionStatus::Running {
            self.countdown.tick();
        }
        Tick {
            remaining: self.countdown.seconds(),
            expired: self.status == SessionStatus::Running && self.countdown.is_expired(),
        }
    }

    // ========================================================================
    // Parking Lot
    // ========================================================================

    /// Capture an interruption for the current session
    ///
    /// Returns false (and drops the item) when no session is current.
    pub fn add_to_parking_lot(&mut self, item: ParkingLotItem) -> bool {
        if self.current.is_none() {
            debug!("Parking-lot capture ignored, no current session");
            return false;
        }
        self.parking_lot.add(item);
        true
    }

    pub fn remove_parking_lot_item(&mut self, index: usize) -> Option<ParkingLotItem> {
        self.parking_lot.remove_at(index)
    }

    // ========================================================================
    // State Queries
    // ========================================================================

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn time_remaining(&self) -> u64 {
        self.countdown.seconds()
    }

    pub fn countdown(&self) -> Countdown {
        self.countdown
    }

    pub fn current_session(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn last_completed_session(&self) -> Option<&Session> {
        self.last_completed.as_ref()
    }

    pub fn parking_lot(&self) -> &ParkingLotBuffer {
        &self.parking_lot
    }

    /// Persistence handle the machine dispatches through
    pub fn sync(&self) -> &PersistenceSync {
        &self.sync
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            time_remaining: self.countdown.seconds(),
            current: self.current.clone(),
            last_completed: self.last_completed.clone(),
            parking_lot: self.parking_lot.items().to_vec(),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
