//! Soundscape Engine
//!
//! Owns at most one active ambient graph. Switching profiles always tears
//! the previous graph down completely before the next one is built, so no
//! node from an earlier profile outlives the switch.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::graph::{AudioGraph, NodeId};
use super::profile::{Blueprint, SoundscapeProfile};
use crate::error::Result;

/// Default linear ramp applied to volume changes
pub const DEFAULT_RAMP: Duration = Duration::from_millis(100);

/// Outcome of a profile request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "profile", rename_all = "lowercase")]
pub enum SoundscapeState {
    /// Nothing is playing
    Silent,
    /// The profile's graph is built and running
    Playing(SoundscapeProfile),
    /// Audio could not start yet; retried on the next request
    Deferred(SoundscapeProfile),
}

impl SoundscapeState {
    pub fn is_playing(&self) -> bool {
        matches!(self, SoundscapeState::Playing(_))
    }
}

/// Nodes of the running profile
#[derive(Debug)]
struct ActiveGraph {
    profile: SoundscapeProfile,
    blueprint: Blueprint,
    /// Every node, in creation order
    nodes: Vec<NodeId>,
    /// Sources and oscillators that were started
    sources: Vec<NodeId>,
    gain: NodeId,
}

/// Builds and tears down ambient audio graphs on an [`AudioGraph`]
#[derive(Debug)]
pub struct SoundscapeEngine<G: AudioGraph> {
    graph: G,
    requested: SoundscapeProfile,
    state: SoundscapeState,
    volume: f32,
    ramp: Duration,
    active: Option<ActiveGraph>,
}

impl<G: AudioGraph> SoundscapeEngine<G> {
    pub fn new(graph: G) -> Self {
        Self {
            graph,
            requested: SoundscapeProfile::Silence,
            state: SoundscapeState::Silent,
            volume: 0.5,
            ramp: DEFAULT_RAMP,
            active: None,
        }
    }

    /// Initial volume in [0, 1]
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = clamp_volume(volume);
        self
    }

    pub fn with_ramp(mut self, ramp: Duration) -> Self {
        self.ramp = ramp;
        self
    }

    // ========================================================================
    // Profile Switching
    // ========================================================================

    /// Switch to `profile`
    ///
    /// The current graph is disposed first. Silence stops there. Otherwise
    /// audio is unlocked (failure leaves the profile [`SoundscapeState::Deferred`])
    /// and the new graph is built and started.
    pub fn set_profile(&mut self, profile: SoundscapeProfile) -> SoundscapeState {
        self.dispose();
        self.requested = profile;

        let Some(blueprint) = profile.blueprint() else {
            info!("Soundscape silenced");
            self.state = SoundscapeState::Silent;
            return self.state;
        };

        if !self.graph.is_unlocked() {
            if let Err(e) = self.graph.unlock() {
                warn!("Audio unavailable, deferring {}: {}", profile, e);
                self.state = SoundscapeState::Deferred(profile);
                return self.state;
            }
        }

        match self.build(profile, blueprint) {
            Ok(active) => {
                info!(
                    "Soundscape {} playing ({} nodes, volume {:.2})",
                    profile,
                    active.nodes.len(),
                    self.volume
                );
                self.active = Some(active);
                self.state = SoundscapeState::Playing(profile);
            }
            Err(e) => {
                warn!("Failed to build {} graph: {}", profile, e);
                self.state = SoundscapeState::Deferred(profile);
            }
        }
        self.state
    }

    /// Retry a deferred profile, e.g. after a user gesture
    pub fn resume(&mut self) -> SoundscapeState {
        match self.state {
            SoundscapeState::Deferred(profile) => self.set_profile(profile),
            state => state,
        }
    }

    fn build(&mut self, profile: SoundscapeProfile, blueprint: Blueprint) -> Result<ActiveGraph> {
        let mut nodes = Vec::with_capacity(blueprint.node_count());
        let mut sources = Vec::new();

        match self.wire(&blueprint, &mut nodes, &mut sources) {
            Ok(gain) => Ok(ActiveGraph {
                profile,
                blueprint,
                nodes,
                sources,
                gain,
            }),
            Err(e) => {
                // Partial graph
                for &node in &sources {
                    self.graph.stop(node);
                }
                for &node in nodes.iter().rev() {
                    self.graph.release(node);
                }
                Err(e)
            }
        }
    }

    /// source -> stage filters -> gain -> output
    fn wire(
        &mut self,
        blueprint: &Blueprint,
        nodes: &mut Vec<NodeId>,
        sources: &mut Vec<NodeId>,
    ) -> Result<NodeId> {
        let source = self.graph.create_noise(blueprint.noise)?;
        nodes.push(source);
        let mut tail = source;

        for stage in &blueprint.stages {
            let filter = self.graph.create_filter(stage.filter)?;
            nodes.push(filter);
            self.graph.connect(tail, filter)?;

            if let Some(sweep) = stage.sweep {
                let lfo = self
                    .graph
                    .create_oscillator(sweep.rate_hz, sweep.min_hz, sweep.max_hz)?;
                nodes.push(lfo);
                self.graph.modulate_frequency(lfo, filter)?;
                self.graph.start(lfo)?;
                sources.push(lfo);
            }
            tail = filter;
        }

        let gain = self.graph.create_gain(blueprint.level_for(self.volume))?;
        nodes.push(gain);
        self.graph.connect(tail, gain)?;
        self.graph.connect_to_output(gain)?;

        self.graph.start(source)?;
        sources.push(source);
        Ok(gain)
    }

    // ========================================================================
    // Volume
    // ========================================================================

    /// Set volume in [0, 1], ramping the live gain linearly
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = clamp_volume(volume);

        let Some(active) = &self.active else {
            return;
        };
        let level = active.blueprint.level_for(self.volume);
        if let Err(e) = self.graph.ramp_gain(active.gain, level, self.ramp) {
            warn!("Volume ramp on {} failed: {}", active.profile, e);
        } else {
            debug!("Ramping {} to {:.3} over {:?}", active.profile, level, self.ramp);
        }
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Stop and release every node of the active graph
    ///
    /// Safe to call repeatedly. A deferred profile is dropped too, so a later
    /// [`resume`](Self::resume) has nothing to retry.
    pub fn dispose(&mut self) {
        self.state = SoundscapeState::Silent;
        self.requested = SoundscapeProfile::Silence;

        let Some(active) = self.active.take() else {
            return;
        };
        for &node in &active.sources {
            self.graph.stop(node);
        }
        for &node in active.nodes.iter().rev() {
            self.graph.release(node);
        }
        debug!("Disposed {} graph ({} nodes)", active.profile, active.nodes.len());
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn state(&self) -> SoundscapeState {
        self.state
    }

    /// Last requested profile, even if it is not playing
    pub fn profile(&self) -> SoundscapeProfile {
        self.requested
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Gain node of the playing graph
    pub fn output_gain(&self) -> Option<NodeId> {
        self.active.as_ref().map(|a| a.gain)
    }

    /// Nodes owned by the playing graph
    pub fn active_nodes(&self) -> &[NodeId] {
        self.active.as_ref().map(|a| a.nodes.as_slice()).unwrap_or(&[])
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut G {
        &mut self.graph
    }
}

impl<G: AudioGraph> Drop for SoundscapeEngine<G> {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FocusError;
    use crate::soundscape::graph::{FilterSpec, NoiseColor};
    use crate::soundscape::synth::{SynthGraph, DEFAULT_SAMPLE_RATE};
    use approx::assert_relative_eq;

    /// Graph event for ordering assertions
    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Create(NodeId),
        Release(NodeId),
    }

    /// Wraps [`SynthGraph`], logging allocations and optionally failing
    #[derive(Debug)]
    struct RecordingGraph {
        inner: SynthGraph,
        events: Vec<Event>,
        /// Live node count just before each creation
        live_before_create: Vec<usize>,
        fail_filters: bool,
    }

    impl RecordingGraph {
        fn new() -> Self {
            Self {
                inner: SynthGraph::with_gesture(DEFAULT_SAMPLE_RATE),
                events: Vec::new(),
                live_before_create: Vec::new(),
                fail_filters: false,
            }
        }

        fn created(&mut self, id: NodeId) -> Result<NodeId> {
            self.events.push(Event::Create(id));
            self.live_before_create.push(self.inner.live_nodes() - 1);
            Ok(id)
        }
    }

    impl AudioGraph for RecordingGraph {
        fn unlock(&mut self) -> Result<()> {
            self.inner.unlock()
        }
        fn is_unlocked(&self) -> bool {
            self.inner.is_unlocked()
        }
        fn create_noise(&mut self, color: NoiseColor) -> Result<NodeId> {
            let id = self.inner.create_noise(color)?;
            self.created(id)
        }
        fn create_filter(&mut self, spec: FilterSpec) -> Result<NodeId> {
            if self.fail_filters {
                return Err(FocusError::InvalidConnection {
                    reason: "filters unavailable".to_string(),
                });
            }
            let id = self.inner.create_filter(spec)?;
            self.created(id)
        }
        fn create_oscillator(&mut self, rate_hz: f32, min: f32, max: f32) -> Result<NodeId> {
            let id = self.inner.create_oscillator(rate_hz, min, max)?;
            self.created(id)
        }
        fn create_gain(&mut self, level: f32) -> Result<NodeId> {
            let id = self.inner.create_gain(level)?;
            self.created(id)
        }
        fn connect(&mut self, from: NodeId, to: NodeId) -> Result<()> {
            self.inner.connect(from, to)
        }
        fn connect_to_output(&mut self, from: NodeId) -> Result<()> {
            self.inner.connect_to_output(from)
        }
        fn modulate_frequency(&mut self, oscillator: NodeId, filter: NodeId) -> Result<()> {
            self.inner.modulate_frequency(oscillator, filter)
        }
        fn start(&mut self, node: NodeId) -> Result<()> {
            self.inner.start(node)
        }
        fn stop(&mut self, node: NodeId) {
            self.inner.stop(node)
        }
        fn ramp_gain(&mut self, node: NodeId, target: f32, duration: Duration) -> Result<()> {
            self.inner.ramp_gain(node, target, duration)
        }
        fn release(&mut self, node: NodeId) {
            self.events.push(Event::Release(node));
            self.inner.release(node)
        }
        fn live_nodes(&self) -> usize {
            self.inner.live_nodes()
        }
    }

    #[test]
    fn test_switch_disposes_before_building() {
        let mut engine = SoundscapeEngine::new(RecordingGraph::new());
        assert_eq!(
            engine.set_profile(SoundscapeProfile::Rain),
            SoundscapeState::Playing(SoundscapeProfile::Rain)
        );
        let rain_nodes = engine.active_nodes().to_vec();
        assert_eq!(rain_nodes.len(), 4);

        engine.graph_mut().events.clear();
        engine.graph_mut().live_before_create.clear();
        assert_eq!(
            engine.set_profile(SoundscapeProfile::Wind),
            SoundscapeState::Playing(SoundscapeProfile::Wind)
        );

        let events = &engine.graph().events;
        let first_create = events
            .iter()
            .position(|e| matches!(e, Event::Create(_)))
            .unwrap();
        let last_release = events
            .iter()
            .rposition(|e| matches!(e, Event::Release(_)))
            .unwrap();
        assert!(last_release < first_create);
        for node in &rain_nodes {
            assert!(events.contains(&Event::Release(*node)));
        }
        assert_eq!(engine.graph().live_before_create[0], 0);
        assert_eq!(engine.graph().live_nodes(), 4);
    }

    #[test]
    fn test_silence_releases_everything() {
        let mut engine = SoundscapeEngine::new(SynthGraph::with_gesture(DEFAULT_SAMPLE_RATE));
        engine.set_profile(SoundscapeProfile::Cafe);
        assert_eq!(engine.graph().live_nodes(), 4);

        assert_eq!(engine.set_profile(SoundscapeProfile::Silence), SoundscapeState::Silent);
        assert_eq!(engine.graph().live_nodes(), 0);
        assert!(engine.output_gain().is_none());
    }

    #[test]
    fn test_repeated_switches_do_not_leak() {
        let mut engine = SoundscapeEngine::new(SynthGraph::with_gesture(DEFAULT_SAMPLE_RATE));
        for _ in 0..5 {
            for profile in SoundscapeProfile::ALL {
                engine.set_profile(profile);
                let expected = profile.blueprint().map(|b| b.node_count()).unwrap_or(0);
                assert_eq!(engine.graph().live_nodes(), expected);
            }
        }
    }

    #[test]
    fn test_locked_audio_defers_and_retries() {
        let mut engine = SoundscapeEngine::new(SynthGraph::new(DEFAULT_SAMPLE_RATE));
        assert_eq!(
            engine.set_profile(SoundscapeProfile::Rain),
            SoundscapeState::Deferred(SoundscapeProfile::Rain)
        );
        assert_eq!(engine.graph().live_nodes(), 0);
        assert_eq!(engine.profile(), SoundscapeProfile::Rain);

        engine.graph_mut().grant_gesture();
        assert_eq!(engine.resume(), SoundscapeState::Playing(SoundscapeProfile::Rain));
        assert_eq!(engine.graph().live_nodes(), 4);
    }

    #[test]
    fn test_dispose_cancels_deferred_profile() {
        let mut engine = SoundscapeEngine::new(SynthGraph::new(DEFAULT_SAMPLE_RATE));
        assert_eq!(
            engine.set_profile(SoundscapeProfile::Rain),
            SoundscapeState::Deferred(SoundscapeProfile::Rain)
        );

        engine.dispose();
        assert_eq!(engine.state(), SoundscapeState::Silent);
        assert_eq!(engine.profile(), SoundscapeProfile::Silence);

        engine.graph_mut().grant_gesture();
        assert_eq!(engine.resume(), SoundscapeState::Silent);
        assert_eq!(engine.graph().live_nodes(), 0);
        assert!(engine.output_gain().is_none());
    }

    #[test]
    fn test_build_failure_releases_partial_graph() {
        let mut graph = RecordingGraph::new();
        graph.fail_filters = true;
        let mut engine = SoundscapeEngine::new(graph);

        assert_eq!(
            engine.set_profile(SoundscapeProfile::Wind),
            SoundscapeState::Deferred(SoundscapeProfile::Wind)
        );
        assert_eq!(engine.graph().live_nodes(), 0);

        // Brown noise needs no filters
        assert_eq!(
            engine.set_profile(SoundscapeProfile::BrownNoise),
            SoundscapeState::Playing(SoundscapeProfile::BrownNoise)
        );
    }

    #[test]
    fn test_cafe_plays_at_sixty_percent() {
        let mut engine =
            SoundscapeEngine::new(SynthGraph::with_gesture(DEFAULT_SAMPLE_RATE)).with_volume(1.0);
        engine.set_profile(SoundscapeProfile::Cafe);
        let gain = engine.output_gain().unwrap();
        assert_relative_eq!(engine.graph().gain_level(gain).unwrap(), 0.6);
    }

    #[test]
    fn test_volume_ramps_over_100ms() {
        let mut engine =
            SoundscapeEngine::new(SynthGraph::with_gesture(DEFAULT_SAMPLE_RATE)).with_volume(0.2);
        engine.set_profile(SoundscapeProfile::BrownNoise);
        let gain = engine.output_gain().unwrap();

        engine.set_volume(0.8);
        // Immediately after the request the level has not jumped
        assert_relative_eq!(engine.graph().gain_level(gain).unwrap(), 0.2);

        engine.graph_mut().render(2_400);
        let halfway = engine.graph().gain_level(gain).unwrap();
        assert!((halfway - 0.5).abs() < 0.01, "halfway level {}", halfway);

        engine.graph_mut().render(2_400);
        assert_relative_eq!(engine.graph().gain_level(gain).unwrap(), 0.8);
    }

    #[test]
    fn test_volume_is_clamped() {
        let mut engine = SoundscapeEngine::new(SynthGraph::with_gesture(DEFAULT_SAMPLE_RATE));
        engine.set_volume(1.7);
        assert_relative_eq!(engine.volume(), 1.0);
        engine.set_volume(-0.3);
        assert_relative_eq!(engine.volume(), 0.0);
        engine.set_volume(f32::NAN);
        assert_relative_eq!(engine.volume(), 0.0);
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let mut engine = SoundscapeEngine::new(SynthGraph::with_gesture(DEFAULT_SAMPLE_RATE));
        engine.set_profile(SoundscapeProfile::Rain);
        engine.dispose();
        engine.dispose();
        assert_eq!(engine.graph().live_nodes(), 0);
        assert_eq!(engine.state(), SoundscapeState::Silent);
    }
}
