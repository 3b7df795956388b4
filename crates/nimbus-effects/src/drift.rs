//! Modulated dual-tap chorus.
//!
//! One short delay line per channel, read at two LFO-swept taps half a cycle
//! apart. The taps move against each other, so their sum keeps roughly
//! constant level while the pitch of each wanders. The right channel's LFO
//! runs in quadrature to the left for width.
//!
//! # Parameters
//!
//! - `rate`: LFO speed, 0..1 → 0.05–4 Hz
//! - `wobble`: sweep depth, 0..1 → 0.3–7 ms

use crate::params::ParamMap;
use core::f32::consts::TAU;
use libm::sinf;
use nimbus_core::{DelayLine, Interpolation, SmoothedParam, ms_to_samples};

/// Center delay around which the taps sweep.
const CENTER_MS: f32 = 12.0;

const MIN_RATE_HZ: f32 = 0.05;
const MAX_RATE_HZ: f32 = 4.0;
const MIN_DEPTH_MS: f32 = 0.3;
const MAX_DEPTH_MS: f32 = 7.0;

/// Dual-tap modulated delay.
#[derive(Debug, Clone)]
pub struct Drift {
    line_left: DelayLine,
    line_right: DelayLine,

    phase: f32,
    phase_inc: f32,
    rate: f32,
    /// Sweep depth in samples, smoothed at the delay-time rate so changes do
    /// not step the read position
    depth: SmoothedParam,

    sample_rate: f32,
    center: f32,
}

impl Drift {
    /// Create a chorus at the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        let mut make_line = || {
            let capacity = ms_to_samples(CENTER_MS + MAX_DEPTH_MS, sample_rate) as usize + 16;
            let mut line = DelayLine::new(capacity);
            line.set_interpolation(Interpolation::Cubic);
            line
        };
        let mut drift = Self {
            line_left: make_line(),
            line_right: make_line(),
            phase: 0.0,
            phase_inc: 0.0,
            rate: 0.3,
            depth: SmoothedParam::with_coeff(
                ms_to_samples(MIN_DEPTH_MS + 0.4 * (MAX_DEPTH_MS - MIN_DEPTH_MS), sample_rate),
                1e-4,
            ),
            sample_rate,
            center: ms_to_samples(CENTER_MS, sample_rate),
        };
        drift.update_rate();
        drift
    }

    /// Set one named parameter; unknown keys are ignored.
    pub fn set_parameter(&mut self, key: &str, value: f64) {
        let v = (value as f32).clamp(0.0, 1.0);
        match key {
            "rate" => {
                self.rate = v;
                self.update_rate();
            }
            "wobble" => {
                let depth_ms = MIN_DEPTH_MS + v * (MAX_DEPTH_MS - MIN_DEPTH_MS);
                self.depth.set_target(ms_to_samples(depth_ms, self.sample_rate));
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

    /// Process a mono sample, returning the wet chorus signal.
    pub fn process(&mut self, input: f32) -> f32 {
        let depth = self.depth.advance();
        let phase = self.advance_phase();
        Self::tick(&mut self.line_left, input, self.center, depth, phase)
    }

    /// Process one stereo pair; the right LFO runs in quadrature.
    pub fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        let depth = self.depth.advance();
        let phase = self.advance_phase();
        let mut phase_r = phase + 0.25;
        if phase_r >= 1.0 {
            phase_r -= 1.0;
        }
        (
            Self::tick(&mut self.line_left, left, self.center, depth, phase),
            Self::tick(&mut self.line_right, right, self.center, depth, phase_r),
        )
    }

    /// Clear buffers and restart the LFO.
    pub fn reset(&mut self) {
        self.line_left.clear();
        self.line_right.clear();
        self.phase = 0.0;
        self.depth.snap_to_target();
    }

    /// Rebuild buffers for a new sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        let depth_ratio = self.depth.target() / self.sample_rate;
        self.sample_rate = sample_rate;
        self.center = ms_to_samples(CENTER_MS, sample_rate);
        let mut make_line = || {
            let capacity = ms_to_samples(CENTER_MS + MAX_DEPTH_MS, sample_rate) as usize + 16;
            let mut line = DelayLine::new(capacity);
            line.set_interpolation(Interpolation::Cubic);
            line
        };
        self.line_left = make_line();
        self.line_right = make_line();
        self.depth.set_immediate(depth_ratio * sample_rate);
        self.update_rate();
    }

    #[inline]
    fn tick(line: &mut DelayLine, input: f32, center: f32, depth: f32, phase: f32) -> f32 {
        // Two taps half a cycle apart, summed at constant power
        let offset = depth * sinf(TAU * phase);
        let tap_a = line.read(center + offset);
        let tap_b = line.read(center - offset);
        line.write(input);
        (tap_a + tap_b) * 0.5
    }

    #[inline]
    fn advance_phase(&mut self) -> f32 {
        let phase = self.phase;
        self.phase += self.phase_inc;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        phase
    }

    fn update_rate(&mut self) {
        let hz = MIN_RATE_HZ + self.rate * (MAX_RATE_HZ - MIN_RATE_HZ);
        self.phase_inc = hz / self.sample_rate;
    }
}
