//! Effect dispatch and serial chaining.
//!
//! [`EffectKind`] is the closed set of effects, dispatched by exhaustive
//! match, with no trait objects and no per-sample allocation. [`EffectChain`] runs
//! up to [`MAX_SLOTS`] of them in series, each slot with its own smoothed
//! wet/dry blend and a bypass flag.
//!
//! Effects return their wet signal only; the chain owns the blending. A
//! bypassed slot is skipped entirely, so its output equals its input to the
//! bit, not merely at wet/dry zero.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::string::String;
use alloc::vec::Vec;

use crate::drift::Drift;
use crate::echo::Echo;
use crate::ghost::Ghost;
use crate::melt::Melt;
use crate::nebula::Nebula;
use crate::params::{BPM_KEY, ParamMap};
use crate::space::Space;
use nimbus_core::{SmoothedParam, wet_dry_mix, wet_dry_mix_stereo};

/// Maximum number of slots in a chain.
pub const MAX_SLOTS: usize = 8;

/// The closed set of available effects.
///
/// `Bypass` is both the fallback for unrecognized effect ids and a valid
/// placeholder slot in its own right.
#[derive(Debug, Clone)]
#[allow(clippy::large_enum_variant)]
pub enum EffectKind {
    /// 8-line FDN reverb
    Nebula(Nebula),
    /// Tempo-syncable feedback delay
    Echo(Echo),
    /// Schroeder room reverb
    Space(Space),
    /// Dual-tap modulated chorus
    Drift(Drift),
    /// Shimmer echo with pitch-shifted feedback
    Ghost(Ghost),
    /// Degrading texture loop
    Melt(Melt),
    /// Pass-through
    Bypass,
}

impl EffectKind {
    /// Build an effect from its id at the given sample rate.
    ///
    /// Unknown ids produce `Bypass` rather than an error: a chain restored
    /// from a newer configuration keeps its shape and stays silent about
    /// effects it does not know.
    pub fn from_id(id: &str, sample_rate: f32) -> Self {
        match id {
            "nebula" => Self::Nebula(Nebula::new(sample_rate)),
            "echo" => Self::Echo(Echo::new(sample_rate)),
            "space" => Self::Space(Space::new(sample_rate)),
            "drift" => Self::Drift(Drift::new(sample_rate)),
            "ghost" => Self::Ghost(Ghost::new(sample_rate)),
            "melt" => Self::Melt(Melt::new(sample_rate)),
            _ => Self::Bypass,
        }
    }

    /// Stable id of this effect.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Nebula(_) => "nebula",
            Self::Echo(_) => "echo",
            Self::Space(_) => "space",
            Self::Drift(_) => "drift",
            Self::Ghost(_) => "ghost",
            Self::Melt(_) => "melt",
            Self::Bypass => "bypass",
        }
    }

    /// Process a mono sample, returning the wet signal.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        match self {
            Self::Nebula(fx) => fx.process(input),
            Self::Echo(fx) => fx.process(input),
            Self::Space(fx) => fx.process(input),
            Self::Drift(fx) => fx.process(input),
            Self::Ghost(fx) => fx.process(input),
            Self::Melt(fx) => fx.process(input),
            Self::Bypass => input,
        }
    }

    /// Process one stereo pair, returning the wet pair.
    #[inline]
    pub fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        match self {
            Self::Nebula(fx) => fx.process_stereo(left, right),
            Self::Echo(fx) => fx.process_stereo(left, right),
            Self::Space(fx) => fx.process_stereo(left, right),
            Self::Drift(fx) => fx.process_stereo(left, right),
            Self::Ghost(fx) => fx.process_stereo(left, right),
            Self::Melt(fx) => fx.process_stereo(left, right),
            Self::Bypass => (left, right),
        }
    }

    /// Set one named parameter; unknown keys are ignored.
    pub fn set_parameter(&mut self, key: &str, value: f64) {
        match self {
            Self::Nebula(fx) => fx.set_parameter(key, value),
            Self::Echo(fx) => fx.set_parameter(key, value),
            Self::Space(fx) => fx.set_parameter(key, value),
            Self::Drift(fx) => fx.set_parameter(key, value),
            Self::Ghost(fx) => fx.set_parameter(key, value),
            Self::Melt(fx) => fx.set_parameter(key, value),
            Self::Bypass => {}
        }
    }

    /// Apply a parameter map.
    pub fn update_parameters(&mut self, params: &ParamMap) {
        for (key, value) in params.iter() {
            self.set_parameter(key, value);
        }
    }

    /// Return internal state to silence.
    pub fn reset(&mut self) {
        match self {
            Self::Nebula(fx) => fx.reset(),
            Self::Echo(fx) => fx.reset(),
            Self::Space(fx) => fx.reset(),
            Self::Drift(fx) => fx.reset(),
            Self::Ghost(fx) => fx.reset(),
            Self::Melt(fx) => fx.reset(),
            Self::Bypass => {}
        }
    }

    /// Rebuild internal structures for a new sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        match self {
            Self::Nebula(fx) => fx.set_sample_rate(sample_rate),
            Self::Echo(fx) => fx.set_sample_rate(sample_rate),
            Self::Space(fx) => fx.set_sample_rate(sample_rate),
            Self::Drift(fx) => fx.set_sample_rate(sample_rate),
            Self::Ghost(fx) => fx.set_sample_rate(sample_rate),
            Self::Melt(fx) => fx.set_sample_rate(sample_rate),
            Self::Bypass => {}
        }
    }
}

/// Serializable description of one chain slot.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectDescriptor {
    /// Effect id; unknown ids become bypass slots
    pub effect_id: String,
    /// Initial parameter values
    pub params: ParamMap,
    /// Wet/dry blend in [0, 1]
    pub wet_dry: f32,
    /// Whether the slot starts bypassed
    pub bypassed: bool,
}

impl EffectDescriptor {
    /// Describe an effect with full wet output and no initial parameters.
    pub fn new(effect_id: &str) -> Self {
        Self {
            effect_id: String::from(effect_id),
            params: ParamMap::new(),
            wet_dry: 1.0,
            bypassed: false,
        }
    }
}

/// One slot: an effect plus its blend and bypass state.
#[derive(Debug, Clone)]
pub struct EffectSlot {
    effect: EffectKind,
    wet_dry: SmoothedParam,
    bypassed: bool,
}

impl EffectSlot {
    fn from_descriptor(desc: &EffectDescriptor, sample_rate: f32) -> Self {
        let mut effect = EffectKind::from_id(&desc.effect_id, sample_rate);
        effect.update_parameters(&desc.params);
        let mut wet_dry = SmoothedParam::with_coeff(0.0, 2e-3);
        wet_dry.set_immediate(desc.wet_dry.clamp(0.0, 1.0));
        Self {
            effect,
            wet_dry,
            bypassed: desc.bypassed,
        }
    }

    /// The effect occupying this slot.
    pub fn effect(&self) -> &EffectKind {
        &self.effect
    }

    /// Whether the slot is currently bypassed.
    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    /// Wet/dry blend target.
    pub fn wet_dry(&self) -> f32 {
        self.wet_dry.target()
    }
}

/// A serial chain of up to [`MAX_SLOTS`] effects.
///
/// ```rust
/// use nimbus_effects::{EffectChain, EffectDescriptor};
///
/// let mut chain = EffectChain::build(
///     &[
///         EffectDescriptor::new("echo"),
///         EffectDescriptor::new("nebula"),
///     ],
///     48000.0,
/// );
/// let (l, r) = chain.process_stereo(0.5, 0.5);
/// ```
#[derive(Debug, Clone)]
pub struct EffectChain {
    slots: Vec<EffectSlot>,
    sample_rate: f32,
}

impl EffectChain {
    /// Build a chain from slot descriptors. Descriptors beyond
    /// [`MAX_SLOTS`] are dropped.
    pub fn build(descriptors: &[EffectDescriptor], sample_rate: f32) -> Self {
        let slots = descriptors
            .iter()
            .take(MAX_SLOTS)
            .map(|d| EffectSlot::from_descriptor(d, sample_rate))
            .collect();
        Self { slots, sample_rate }
    }

    /// Create an empty chain.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            slots: Vec::new(),
            sample_rate,
        }
    }

    /// Append a slot; returns false when the chain is full.
    pub fn push(&mut self, descriptor: &EffectDescriptor) -> bool {
        if self.slots.len() >= MAX_SLOTS {
            return false;
        }
        self.slots
            .push(EffectSlot::from_descriptor(descriptor, self.sample_rate));
        true
    }

    /// Process a mono sample through every active slot in order.
    pub fn process(&mut self, input: f32) -> f32 {
        let mut signal = input;
        for slot in &mut self.slots {
            if slot.bypassed {
                continue;
            }
            let mix = slot.wet_dry.advance();
            let wet = slot.effect.process(signal);
            signal = wet_dry_mix(signal, wet, mix);
        }
        signal
    }

    /// Process one stereo pair through every active slot in order.
    pub fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        let mut l = left;
        let mut r = right;
        for slot in &mut self.slots {
            if slot.bypassed {
                continue;
            }
            let mix = slot.wet_dry.advance();
            let (wet_l, wet_r) = slot.effect.process_stereo(l, r);
            (l, r) = wet_dry_mix_stereo(l, r, wet_l, wet_r, mix);
        }
        (l, r)
    }

    /// Set a parameter on the effect in one slot; out-of-range indices are
    /// ignored.
    pub fn set_parameter(&mut self, slot: usize, key: &str, value: f64) {
        if let Some(s) = self.slots.get_mut(slot) {
            s.effect.set_parameter(key, value);
        }
    }

    /// Apply a parameter map to one slot.
    pub fn update_parameters(&mut self, slot: usize, params: &ParamMap) {
        if let Some(s) = self.slots.get_mut(slot) {
            s.effect.update_parameters(params);
        }
    }

    /// Forward a tempo change to every slot under the reserved key.
    pub fn update_bpm(&mut self, bpm: f64) {
        for slot in &mut self.slots {
            slot.effect.set_parameter(BPM_KEY, bpm);
        }
    }

    /// Set the wet/dry blend target of one slot, clamped to [0, 1].
    pub fn set_wet_dry(&mut self, slot: usize, wet_dry: f32) {
        if let Some(s) = self.slots.get_mut(slot) {
            s.wet_dry.set_target(wet_dry.clamp(0.0, 1.0));
        }
    }

    /// Bypass or re-engage one slot.
    pub fn set_bypassed(&mut self, slot: usize, bypassed: bool) {
        if let Some(s) = self.slots.get_mut(slot) {
            s.bypassed = bypassed;
        }
    }

    /// Reset every slot to silence.
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.effect.reset();
            slot.wet_dry.snap_to_target();
        }
    }

    /// Propagate a new sample rate to every slot.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        for slot in &mut self.slots {
            slot.effect.set_sample_rate(sample_rate);
        }
    }

    /// Slot accessors, mainly for inspection and tests.
    pub fn slots(&self) -> &[EffectSlot] {
        &self.slots
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when the chain has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
