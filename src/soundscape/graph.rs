//! Audio graph boundary
//!
//! The platform audio output the soundscape engine builds on: noise sources,
//! filters, low-frequency oscillators and gain nodes, plus a context unlock
//! gated by user interaction.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Handle to a node owned by an [`AudioGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Spectral color of a noise source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseColor {
    White,
    Pink,
    Brown,
}

/// Filter response type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    LowPass,
    HighPass,
    BandPass,
}

/// Filter rolloff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rolloff {
    /// Single biquad
    #[default]
    Db12,
    /// Two cascaded biquads
    Db24,
}

/// Static filter configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub kind: FilterKind,
    /// Cutoff or center frequency in Hz
    pub frequency: f32,
    pub q: f32,
    #[serde(default)]
    pub rolloff: Rolloff,
}

/// Live audio synthesis graph provided by the platform
///
/// Node handles stay valid until [`AudioGraph::release`]. Releasing or
/// stopping an unknown node is a no-op so teardown can always run to the end.
pub trait AudioGraph {
    /// Unlock audio output; fails until a user gesture has occurred
    fn unlock(&mut self) -> Result<()>;

    fn is_unlocked(&self) -> bool;

    fn create_noise(&mut self, color: NoiseColor) -> Result<NodeId>;

    fn create_filter(&mut self, spec: FilterSpec) -> Result<NodeId>;

    /// Sine LFO whose output swings between `min` and `max`
    fn create_oscillator(&mut self, rate_hz: f32, min: f32, max: f32) -> Result<NodeId>;

    fn create_gain(&mut self, level: f32) -> Result<NodeId>;

    /// Route audio from `from` into `to`
    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<()>;

    /// Route audio from `from` to the speakers
    fn connect_to_output(&mut self, from: NodeId) -> Result<()>;

    /// Drive `filter`'s frequency from `oscillator`
    fn modulate_frequency(&mut self, oscillator: NodeId, filter: NodeId) -> Result<()>;

    /// Start a source or oscillator
    fn start(&mut self, node: NodeId) -> Result<()>;

    fn stop(&mut self, node: NodeId);

    /// Move a gain node linearly to `target` over `duration`
    fn ramp_gain(&mut self, node: NodeId, target: f32, duration: Duration) -> Result<()>;

    /// Disconnect and free a node
    fn release(&mut self, node: NodeId);

    /// Nodes currently allocated
    fn live_nodes(&self) -> usize;
}
