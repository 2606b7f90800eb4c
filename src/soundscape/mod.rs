//! Soundscape Module
//!
//! Ambient audio for focus sessions:
//! - `graph`: the platform audio graph boundary
//! - `profile`: declarative profile blueprints
//! - `synth`: software graph used offline and in tests
//! - `engine`: profile switching, volume ramps and teardown
//! - `export`: WAV rendering

pub mod engine;
pub mod export;
pub mod graph;
pub mod profile;
pub mod synth;

pub use engine::{SoundscapeEngine, SoundscapeState, DEFAULT_RAMP};
pub use export::{render_profile, write_wav};
pub use graph::{AudioGraph, FilterKind, FilterSpec, NodeId, NoiseColor, Rolloff};
pub use profile::{Blueprint, SoundscapeProfile, Stage, Sweep, CAFE_LEVEL_SCALE};
pub use synth::{SynthGraph, DEFAULT_SAMPLE_RATE};
