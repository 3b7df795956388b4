//! Degrading texture loop.
//!
//! A long feedback delay whose read position wanders on a random walk, with
//! heavy lowpass damping and soft clipping inside the loop. Each pass smears
//! the material a little further: transients blur, highs fade, and the loop
//! settles into a dark drone instead of ringing.
//!
//! # Parameters
//!
//! - `smear`: loop regeneration, 0..1 → loop gain 0–0.97
//! - `tone`: loop damping cutoff, 0..1 → 400 Hz–8 kHz
//! - `haze`: random-walk wander depth, 0..1 → 0–18 ms

use crate::params::ParamMap;
use libm::powf;
use nimbus_core::{
    DelayLine, Interpolation, OnePole, RandomWalk, SmoothedParam, flush_denormal, ms_to_samples,
    soft_clip,
};

const LOOP_MS: f32 = 420.0;
const MAX_HAZE_MS: f32 = 18.0;
const WALK_SEED: u32 = 0x4D45_4C54;

/// Smearing feedback loop with a wandering read head.
#[derive(Debug, Clone)]
pub struct Melt {
    line: DelayLine,
    damp: OnePole,
    walk: RandomWalk,

    smear: SmoothedParam,
    haze_samples: SmoothedParam,
    tone: f32,

    loop_samples: f32,
    sample_rate: f32,
}

impl Melt {
    /// Create a texture loop at the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        let mut line =
            DelayLine::from_time(sample_rate, (LOOP_MS + MAX_HAZE_MS * 2.0) / 1000.0);
        line.set_interpolation(Interpolation::Cubic);
        let mut melt = Self {
            line,
            damp: OnePole::new(sample_rate, 2500.0),
            walk: RandomWalk::new(WALK_SEED, 0.0008),
            smear: SmoothedParam::with_coeff(0.6 * 0.97, 2e-3),
            haze_samples: SmoothedParam::with_coeff(
                ms_to_samples(0.3 * MAX_HAZE_MS, sample_rate),
                1e-4,
            ),
            tone: 0.5,
            loop_samples: ms_to_samples(LOOP_MS, sample_rate),
            sample_rate,
        };
        melt.update_tone();
        melt
    }

    /// Set one named parameter; unknown keys are ignored.
    pub fn set_parameter(&mut self, key: &str, value: f64) {
        let v = (value as f32).clamp(0.0, 1.0);
        match key {
            "smear" => self.smear.set_target(v * 0.97),
            "tone" => {
                self.tone = v;
                self.update_tone();
            }
            "haze" => {
                self.haze_samples
                    .set_target(ms_to_samples(v * MAX_HAZE_MS, self.sample_rate));
            }
            _ => {}
        }
    }

    /// Apply a parameter map.
    pub fn update_parameters(&mut self, params: &ParamMap) {
        for (key, value) in params.iter() {
            self.set_parameter(key, value);
        }
    }

    /// Process a mono sample, returning the wet loop signal.
    pub fn process(&mut self, input: f32) -> f32 {
        let haze = self.haze_samples.advance();
        let smear = self.smear.advance();

        // Wander stays one-sided so the read never outruns the write head
        let wander = (self.walk.step() * 0.5 + 0.5) * haze;
        let delayed = self.line.read(self.loop_samples + wander);
        let looped = soft_clip(self.damp.process(delayed) * smear);
        self.line.write(flush_denormal(input + looped));
        delayed
    }

    /// Process one stereo pair through the mono loop.
    pub fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        let wet = self.process((left + right) * 0.5);
        (wet, wet)
    }

    /// Clear the loop.
    pub fn reset(&mut self) {
        self.line.clear();
        self.damp.reset();
        self.walk.reset();
        self.smear.snap_to_target();
        self.haze_samples.snap_to_target();
    }

    /// Rebuild buffers for a new sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        let haze_ratio = self.haze_samples.target() / self.sample_rate;
        self.sample_rate = sample_rate;
        let mut line =
            DelayLine::from_time(sample_rate, (LOOP_MS + MAX_HAZE_MS * 2.0) / 1000.0);
        line.set_interpolation(Interpolation::Cubic);
        self.line = line;
        self.damp.set_sample_rate(sample_rate);
        self.loop_samples = ms_to_samples(LOOP_MS, sample_rate);
        self.haze_samples.set_immediate(haze_ratio * sample_rate);
        self.update_tone();
    }

    fn update_tone(&mut self) {
        // 400 Hz .. 8 kHz, exponential sweep
        let cutoff = 400.0 * powf(20.0, self.tone);
        self.damp.set_frequency(cutoff);
    }
}
