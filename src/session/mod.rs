//! Session Module
//!
//! Focus session lifecycle:
//! - Session data model and UUID persistence guard
//! - Countdown value and caller-side tick sources
//! - Parking-lot capture buffer
//! - Session state machine

pub mod clock;
pub mod machine;
pub mod model;
pub mod parking_lot;

pub use clock::{Clock, Countdown, IntervalTicks, ManualClock, ManualTicks, SystemClock, TickSource};
pub use machine::{SessionSnapshot, SessionStateMachine, Tick};
pub use model::{is_persistable_id, FocusQuality, ParkingLotItem, Session, SessionStatus};
pub use parking_lot::ParkingLotBuffer;
