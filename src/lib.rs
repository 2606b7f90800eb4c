//! Deepwork - Focus Session Controller
//!
//! Runs a timed deep-work session end to end:
//! 1. Session state machine - status, countdown and parking-lot capture
//! 2. Persistence sync - fire-and-forget writes to a remote session store
//! 3. Soundscape engine - live synthesized ambience per profile
//!
//! # Architecture
//!
//! Local state is authoritative. The state machine mutates synchronously and
//! hands writes to a background sync worker without waiting on them. The
//! soundscape engine is driven by profile and volume alone, independent of
//! session status. Countdown ticks come from the caller; reaching zero is
//! reported, never acted on.

pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod session;
pub mod soundscape;
pub mod sync;

pub use config::Config;
pub use controller::{ControllerSnapshot, FocusController};
pub use error::{FocusError, Result};
pub use session::{
    FocusQuality, ParkingLotItem, Session, SessionSnapshot, SessionStateMachine, SessionStatus,
    Tick,
};
pub use soundscape::{SoundscapeEngine, SoundscapeProfile, SoundscapeState, SynthGraph, DEFAULT_SAMPLE_RATE};
pub use sync::{Dispatch, MemoryStore, PersistenceSync, SessionStore, SyncReport};
