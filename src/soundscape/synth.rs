//! Software audio graph
//!
//! A sample-accurate, single-channel implementation of [`AudioGraph`]:
//! colored noise sources, RBJ biquad filters, sine LFOs and gain nodes with
//! linear ramps. Rendering pulls one frame at a time through the nodes in
//! dependency order.

use std::collections::{BTreeMap, HashMap};
use std::f64::consts::PI;
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::graph::{AudioGraph, FilterKind, FilterSpec, NodeId, NoiseColor, Rolloff};
use crate::error::{FocusError, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default sample rate for rendering
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Modulated filters recompute coefficients once the frequency has moved
/// this far (Hz)
const RETUNE_THRESHOLD_HZ: f32 = 1.0;

/// Brown noise leak and makeup gain
const BROWN_LEAK: f32 = 1.02;
const BROWN_STEP: f32 = 0.02;
const BROWN_MAKEUP: f32 = 3.5;

// ============================================================================
// Biquad
// ============================================================================

/// Normalized biquad coefficients (a0 = 1)
#[derive(Debug, Clone, Copy, Default)]
struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl BiquadCoeffs {
    /// Audio EQ Cookbook formulas
    /// Reference: https://www.w3.org/2011/audio/audio-eq-cookbook.html
    fn calculate(kind: FilterKind, sample_rate: f64, frequency: f64, q: f64) -> Self {
        // Keep strictly inside (0, Nyquist) even when Nyquist is under 20 Hz
        let upper = (sample_rate / 2.0 - 1.0).max(sample_rate * 0.45);
        let freq = frequency.clamp(upper.min(20.0), upper);
        let q = q.clamp(0.1, 10.0);

        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        let (b0, b1, b2, a0, a1, a2) = match kind {
            FilterKind::LowPass => (
                (1.0 - cos_w0) / 2.0,
                1.0 - cos_w0,
                (1.0 - cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterKind::HighPass => (
                (1.0 + cos_w0) / 2.0,
                -(1.0 + cos_w0),
                (1.0 + cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            // Constant 0 dB peak gain
            FilterKind::BandPass => (
                alpha,
                0.0,
                -alpha,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
        };

        BiquadCoeffs {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadState {
    fn process(&mut self, input: f64, c: &BiquadCoeffs) -> f64 {
        let output = c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }
}

// ============================================================================
// Nodes
// ============================================================================

#[derive(Debug)]
struct NoiseNode {
    color: NoiseColor,
    rng: SmallRng,
    running: bool,
    /// Paul Kellet pink filter state
    pink: [f32; 7],
    brown: f32,
}

impl NoiseNode {
    fn next(&mut self) -> f32 {
        if !self.running {
            return 0.0;
        }
        let white: f32 = self.rng.gen_range(-1.0..1.0);
        match self.color {
            NoiseColor::White => white,
            NoiseColor::Pink => {
                let b = &mut self.pink;
                b[0] = 0.99886 * b[0] + white * 0.0555179;
                b[1] = 0.99332 * b[1] + white * 0.0750759;
                b[2] = 0.96900 * b[2] + white * 0.1538520;
                b[3] = 0.86650 * b[3] + white * 0.3104856;
                b[4] = 0.55000 * b[4] + white * 0.5329522;
                b[5] = -0.7616 * b[5] - white * 0.0168980;
                let out = b[0] + b[1] + b[2] + b[3] + b[4] + b[5] + b[6] + white * 0.5362;
                b[6] = white * 0.115926;
                out * 0.11
            }
            NoiseColor::Brown => {
                self.brown = (self.brown + BROWN_STEP * white) / BROWN_LEAK;
                self.brown * BROWN_MAKEUP
            }
        }
    }
}

#[derive(Debug)]
struct FilterNode {
    spec: FilterSpec,
    frequency: f32,
    coeffs: BiquadCoeffs,
    stages: [BiquadState; 2],
}

impl FilterNode {
    fn new(spec: FilterSpec, sample_rate: u32) -> Self {
        Self {
            spec,
            frequency: spec.frequency,
            coeffs: BiquadCoeffs::calculate(
                spec.kind,
                f64::from(sample_rate),
                f64::from(spec.frequency),
                f64::from(spec.q),
            ),
            stages: [BiquadState::default(); 2],
        }
    }

    fn retune(&mut self, frequency: f32, sample_rate: u32) {
        if (frequency - self.frequency).abs() < RETUNE_THRESHOLD_HZ {
            return;
        }
        self.frequency = frequency;
        self.coeffs = BiquadCoeffs::calculate(
            self.spec.kind,
            f64::from(sample_rate),
            f64::from(frequency),
            f64::from(self.spec.q),
        );
    }

    fn process(&mut self, input: f32) -> f32 {
        let mut x = f64::from(input);
        let passes = match self.spec.rolloff {
            Rolloff::Db12 => 1,
            Rolloff::Db24 => 2,
        };
        for state in self.stages.iter_mut().take(passes) {
            x = state.process(x, &self.coeffs);
        }
        x as f32
    }
}

#[derive(Debug)]
struct OscillatorNode {
    rate_hz: f32,
    min: f32,
    max: f32,
    phase: f64,
    running: bool,
}

impl OscillatorNode {
    fn next(&mut self, sample_rate: u32) -> f32 {
        let value = self.min + (self.max - self.min) * (0.5 + 0.5 * self.phase.sin() as f32);
        if self.running {
            self.phase += 2.0 * PI * f64::from(self.rate_hz) / f64::from(sample_rate);
            if self.phase >= 2.0 * PI {
                self.phase -= 2.0 * PI;
            }
        }
        value
    }
}

/// Gain with a per-sample linear ramp
#[derive(Debug)]
struct GainNode {
    current: f32,
    target: f32,
    step: f32,
    remaining: u64,
}

impl GainNode {
    fn new(level: f32) -> Self {
        Self {
            current: level,
            target: level,
            step: 0.0,
            remaining: 0,
        }
    }

    fn ramp_to(&mut self, target: f32, samples: u64) {
        self.target = target;
        if samples == 0 {
            self.current = target;
            self.step = 0.0;
            self.remaining = 0;
        } else {
            self.step = (target - self.current) / samples as f32;
            self.remaining = samples;
        }
    }

    fn process(&mut self, input: f32) -> f32 {
        let out = input * self.current;
        if self.remaining > 0 {
            self.remaining -= 1;
            self.current = if self.remaining == 0 {
                self.target
            } else {
                self.current + self.step
            };
        }
        out
    }
}

#[derive(Debug)]
enum Node {
    Noise(NoiseNode),
    Filter(FilterNode),
    Oscillator(OscillatorNode),
    Gain(GainNode),
}

// ============================================================================
// Synth Graph
// ============================================================================

/// Software implementation of the platform audio graph
///
/// Audio stays locked until [`SynthGraph::grant_gesture`] records a user
/// interaction; after that [`AudioGraph::unlock`] succeeds.
#[derive(Debug)]
pub struct SynthGraph {
    sample_rate: u32,
    gesture: bool,
    unlocked: bool,
    next_id: u64,
    seed: u64,
    nodes: BTreeMap<NodeId, Node>,
    /// Audio inputs of each node
    inputs: HashMap<NodeId, Vec<NodeId>>,
    /// Filter -> oscillator driving its frequency
    modulators: HashMap<NodeId, NodeId>,
    outputs: Vec<NodeId>,
    order: Vec<NodeId>,
    order_dirty: bool,
    values: HashMap<NodeId, f32>,
}

impl Default for SynthGraph {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl SynthGraph {
    /// Create a locked graph
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            gesture: false,
            unlocked: false,
            next_id: 1,
            seed: 0x5eed_f0c5,
            nodes: BTreeMap::new(),
            inputs: HashMap::new(),
            modulators: HashMap::new(),
            outputs: Vec::new(),
            order: Vec::new(),
            order_dirty: false,
            values: HashMap::new(),
        }
    }

    /// Create a graph that has already seen a user gesture
    ///
    /// For contexts where the invocation itself is the gesture (CLI).
    pub fn with_gesture(sample_rate: u32) -> Self {
        let mut graph = Self::new(sample_rate);
        graph.grant_gesture();
        graph
    }

    /// Use a fixed noise seed for reproducible renders
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Record a user interaction allowing audio to unlock
    pub fn grant_gesture(&mut self) {
        self.gesture = true;
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Current level of a gain node
    pub fn gain_level(&self, node: NodeId) -> Option<f32> {
        match self.nodes.get(&node) {
            Some(Node::Gain(gain)) => Some(gain.current),
            _ => None,
        }
    }

    /// Current frequency of a filter node
    pub fn filter_frequency(&self, node: NodeId) -> Option<f32> {
        match self.nodes.get(&node) {
            Some(Node::Filter(filter)) => Some(filter.frequency),
            _ => None,
        }
    }

    /// Render `frames` mono samples
    pub fn render(&mut self, frames: usize) -> Vec<f32> {
        (0..frames).map(|_| self.render_frame()).collect()
    }

    /// Render a single mono sample
    pub fn render_frame(&mut self) -> f32 {
        if self.order_dirty {
            self.rebuild_order();
        }

        let order = std::mem::take(&mut self.order);
        for &id in &order {
            let input: f32 = self
                .inputs
                .get(&id)
                .map(|sources| {
                    sources
                        .iter()
                        .map(|s| self.values.get(s).copied().unwrap_or(0.0))
                        .sum()
                })
                .unwrap_or(0.0);
            let modulation = self
                .modulators
                .get(&id)
                .and_then(|osc| self.values.get(osc).copied());

            let sample_rate = self.sample_rate;
            let out = match self.nodes.get_mut(&id) {
                Some(Node::Noise(noise)) => noise.next(),
                Some(Node::Oscillator(osc)) => osc.next(sample_rate),
                Some(Node::Filter(filter)) => {
                    if let Some(freq) = modulation {
                        filter.retune(freq, sample_rate);
                    }
                    filter.process(input)
                }
                Some(Node::Gain(gain)) => gain.process(input),
                None => 0.0,
            };
            self.values.insert(id, out);
        }
        self.order = order;

        self.outputs
            .iter()
            .map(|id| self.values.get(id).copied().unwrap_or(0.0))
            .sum()
    }

    /// Depth-first order so every node runs after its inputs and modulator
    fn rebuild_order(&mut self) {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut visited = HashMap::new();
        for &id in self.nodes.keys() {
            self.visit(id, &mut visited, &mut order);
        }
        self.order = order;
        self.order_dirty = false;
    }

    fn visit(&self, id: NodeId, visited: &mut HashMap<NodeId, bool>, order: &mut Vec<NodeId>) {
        if visited.contains_key(&id) {
            return;
        }
        visited.insert(id, true);
        if let Some(sources) = self.inputs.get(&id) {
            for &source in sources {
                self.visit(source, visited, order);
            }
        }
        if let Some(&osc) = self.modulators.get(&id) {
            self.visit(osc, visited, order);
        }
        order.push(id);
    }

    fn insert(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, node);
        self.order_dirty = true;
        id
    }

    fn require(&self, node: NodeId) -> Result<()> {
        if self.nodes.contains_key(&node) {
            Ok(())
        } else {
            Err(FocusError::UnknownNode { node: node.0 })
        }
    }

    fn ramp_samples(&self, duration: Duration) -> u64 {
        (duration.as_secs_f64() * f64::from(self.sample_rate)).round() as u64
    }
}

impl AudioGraph for SynthGraph {
    fn unlock(&mut self) -> Result<()> {
        if self.gesture {
            self.unlocked = true;
            Ok(())
        } else {
            Err(FocusError::AudioLocked)
        }
    }

    fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    fn create_noise(&mut self, color: NoiseColor) -> Result<NodeId> {
        let seed = self.seed.wrapping_add(self.next_id);
        Ok(self.insert(Node::Noise(NoiseNode {
            color,
            rng: SmallRng::seed_from_u64(seed),
            running: false,
            pink: [0.0; 7],
            brown: 0.0,
        })))
    }

    fn create_filter(&mut self, spec: FilterSpec) -> Result<NodeId> {
        let node = FilterNode::new(spec, self.sample_rate);
        Ok(self.insert(Node::Filter(node)))
    }

    fn create_oscillator(&mut self, rate_hz: f32, min: f32, max: f32) -> Result<NodeId> {
        Ok(self.insert(Node::Oscillator(OscillatorNode {
            rate_hz,
            min,
            max,
            phase: 0.0,
            running: false,
        })))
    }

    fn create_gain(&mut self, level: f32) -> Result<NodeId> {
        Ok(self.insert(Node::Gain(GainNode::new(level))))
    }

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        self.require(from)?;
        self.require(to)?;
        if from == to {
            return Err(FocusError::InvalidConnection {
                reason: format!("{} cannot feed itself", from),
            });
        }
        if matches!(self.nodes.get(&to), Some(Node::Noise(_) | Node::Oscillator(_))) {
            return Err(FocusError::InvalidConnection {
                reason: format!("{} has no audio input", to),
            });
        }
        self.inputs.entry(to).or_default().push(from);
        self.order_dirty = true;
        Ok(())
    }

    fn connect_to_output(&mut self, from: NodeId) -> Result<()> {
        self.require(from)?;
        if !self.outputs.contains(&from) {
            self.outputs.push(from);
        }
        Ok(())
    }

    fn modulate_frequency(&mut self, oscillator: NodeId, filter: NodeId) -> Result<()> {
        match (self.nodes.get(&oscillator), self.nodes.get(&filter)) {
            (Some(Node::Oscillator(_)), Some(Node::Filter(_))) => {
                self.modulators.insert(filter, oscillator);
                self.order_dirty = true;
                Ok(())
            }
            (None, _) => Err(FocusError::UnknownNode { node: oscillator.0 }),
            (_, None) => Err(FocusError::UnknownNode { node: filter.0 }),
            _ => Err(FocusError::InvalidConnection {
                reason: format!("{} cannot modulate {}", oscillator, filter),
            }),
        }
    }

    fn start(&mut self, node: NodeId) -> Result<()> {
        match self.nodes.get_mut(&node) {
            Some(Node::Noise(noise)) => noise.running = true,
            Some(Node::Oscillator(osc)) => osc.running = true,
            Some(_) => {}
            None => return Err(FocusError::UnknownNode { node: node.0 }),
        }
        Ok(())
    }

    fn stop(&mut self, node: NodeId) {
        match self.nodes.get_mut(&node) {
            Some(Node::Noise(noise)) => noise.running = false,
            Some(Node::Oscillator(osc)) => osc.running = false,
            _ => {}
        }
    }

    fn ramp_gain(&mut self, node: NodeId, target: f32, duration: Duration) -> Result<()> {
        let samples = self.ramp_samples(duration);
        match self.nodes.get_mut(&node) {
            Some(Node::Gain(gain)) => {
                gain.ramp_to(target, samples);
                Ok(())
            }
            Some(_) => Err(FocusError::InvalidConnection {
                reason: format!("{} is not a gain node", node),
            }),
            None => Err(FocusError::UnknownNode { node: node.0 }),
        }
    }

    fn release(&mut self, node: NodeId) {
        if self.nodes.remove(&node).is_none() {
            return;
        }
        self.inputs.remove(&node);
        for sources in self.inputs.values_mut() {
            sources.retain(|s| *s != node);
        }
        self.modulators.remove(&node);
        self.modulators.retain(|_, osc| *osc != node);
        self.outputs.retain(|o| *o != node);
        self.values.remove(&node);
        self.order_dirty = true;
    }

    fn live_nodes(&self) -> usize {
        self.nodes.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
