//! Focus Controller
//!
//! The public surface UI callers drive: one session state machine plus one
//! soundscape engine, constructed explicitly with their collaborators.
//! Soundscape state is independent of session status so ambience can play
//! during setup as well as during a run.

use std::sync::Arc;

use serde::Serialize;

use crate::config::Config;
use crate::error::Result;
use crate::session::{
    Clock, FocusQuality, ParkingLotItem, Session, SessionSnapshot, SessionStateMachine,
    SessionStatus, Tick,
};
use crate::soundscape::{AudioGraph, SoundscapeEngine, SoundscapeProfile, SoundscapeState};
use crate::sync::PersistenceSync;

/// Combined view of session and soundscape state
#[derive(Debug, Clone, Serialize)]
pub struct ControllerSnapshot {
    pub session: SessionSnapshot,
    pub soundscape: SoundscapeState,
    pub volume: f32,
}

/// Session manager instance with injected clock, persistence and audio graph
pub struct FocusController<G: AudioGraph> {
    machine: SessionStateMachine,
    soundscape: SoundscapeEngine<G>,
}

impl<G: AudioGraph> FocusController<G> {
    pub fn new(clock: Arc<dyn Clock>, sync: PersistenceSync, graph: G) -> Self {
        Self {
            machine: SessionStateMachine::new(clock, sync),
            soundscape: SoundscapeEngine::new(graph),
        }
    }

    /// Apply audio settings from configuration
    pub fn with_config(clock: Arc<dyn Clock>, sync: PersistenceSync, graph: G, config: &Config) -> Self {
        Self {
            machine: SessionStateMachine::new(clock, sync),
            soundscape: SoundscapeEngine::new(graph)
                .with_volume(config.audio.volume)
                .with_ramp(config.audio.ramp()),
        }
    }

    // ========================================================================
    // Session Operations
    // ========================================================================

    pub fn start_session(&mut self, session: Session) {
        self.machine.start_session(session);
    }

    pub fn pause_session(&mut self) {
        self.machine.pause_session();
    }

    pub fn resume_session(&mut self) {
        self.machine.resume_session();
    }

    pub fn end_session(&mut self, quality: Option<FocusQuality>, notes: Option<String>) {
        self.machine.end_session(quality, notes);
    }

    pub fn set_time_remaining(&mut self, seconds: i64) {
        self.machine.set_time_remaining(seconds);
    }

    pub fn extend_session(&mut self, minutes: u32) {
        self.machine.extend_session(minutes);
    }

    pub fn set_status(&mut self, status: SessionStatus) {
        self.machine.set_status(status);
    }

    /// Capture `text` stamped with the controller's clock
    pub fn add_to_parking_lot(&mut self, text: impl Into<String>) -> bool {
        let item = ParkingLotItem::new(text, self.machine.now());
        self.machine.add_to_parking_lot(item)
    }

    pub fn remove_parking_lot_item(&mut self, index: usize) -> Option<ParkingLotItem> {
        self.machine.remove_parking_lot_item(index)
    }

    /// Advance the countdown by one caller-driven tick
    ///
    /// Reaching zero never ends the session; callers decide what follows
    /// an expired tick.
    pub fn tick(&mut self) -> Tick {
        self.machine.tick()
    }

    // ========================================================================
    // Soundscape Operations
    // ========================================================================

    /// Select a soundscape by name
    ///
    /// Only an unknown name is an error. Audio that cannot start yet comes
    /// back as [`SoundscapeState::Deferred`].
    pub fn set_soundscape(&mut self, name: &str) -> Result<SoundscapeState> {
        let profile: SoundscapeProfile = name.parse()?;
        Ok(self.soundscape.set_profile(profile))
    }

    pub fn set_volume(&mut self, level: f32) {
        self.soundscape.set_volume(level);
    }

    /// Tear down the ambient graph
    pub fn stop_soundscape(&mut self) {
        self.soundscape.dispose();
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn session(&self) -> &SessionStateMachine {
        &self.machine
    }

    pub fn soundscape(&self) -> &SoundscapeEngine<G> {
        &self.soundscape
    }

    pub fn soundscape_mut(&mut self) -> &mut SoundscapeEngine<G> {
        &mut self.soundscape
    }

    pub fn status(&self) -> SessionStatus {
        self.machine.status()
    }

    pub fn time_remaining(&self) -> u64 {
        self.machine.time_remaining()
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            session: self.machine.snapshot(),
            soundscape: self.soundscape.state(),
            volume: self.soundscape.volume(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
