//! Shimmer echo.
//!
//! A feedback delay whose loop signal is partially pitch-shifted before being
//! written back, so each repeat climbs (or falls) by the lift interval. With
//! the lift an octave up and shimmer high, the tail turns into the classic
//! upward-spiralling shimmer wash.
//!
//! # Parameters
//!
//! - `time`: delay time, 0..1 → 100–1200 ms
//! - `feedback`: repeat level, 0..1 → loop gain 0–0.9
//! - `shimmer`: blend of shifted vs. plain signal in the loop, 0..1
//! - `lift`: shift interval, 0..1 → −12..+12 semitones (0.5 = none)

use crate::params::ParamMap;
use nimbus_core::{
    DelayLine, GrainPitchShifter, Interpolation, OnePole, SmoothedParam, flush_denormal, lerp,
    ms_to_samples,
};

const MIN_TIME_MS: f32 = 100.0;
const MAX_TIME_MS: f32 = 1200.0;

/// Echo with a pitch shifter inside the feedback loop.
#[derive(Debug, Clone)]
pub struct Ghost {
    line: DelayLine,
    shifter: GrainPitchShifter,
    damp: OnePole,

    delay_samples: SmoothedParam,
    feedback: SmoothedParam,
    shimmer: SmoothedParam,

    lift: f32,
    sample_rate: f32,
}

impl Ghost {
    /// Create a shimmer echo at the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        let mut line = DelayLine::from_time(sample_rate, MAX_TIME_MS / 1000.0 + 0.1);
        line.set_interpolation(Interpolation::Cubic);
        let mut shifter = GrainPitchShifter::new(sample_rate);
        shifter.set_semitones(12.0);
        Self {
            line,
            shifter,
            // Loop damping keeps repeated shifts from whistling
            damp: OnePole::new(sample_rate, 5000.0),
            delay_samples: SmoothedParam::with_coeff(
                ms_to_samples(MIN_TIME_MS + 0.4 * (MAX_TIME_MS - MIN_TIME_MS), sample_rate),
                1e-4,
            ),
            feedback: SmoothedParam::with_coeff(0.45, 1e-3),
            shimmer: SmoothedParam::with_coeff(0.5, 1e-3),
            lift: 1.0,
            sample_rate,
        }
    }

    /// Set one named parameter; unknown keys are ignored.
    pub fn set_parameter(&mut self, key: &str, value: f64) {
        let v = (value as f32).clamp(0.0, 1.0);
        match key {
            "time" => {
                let ms = MIN_TIME_MS + v * (MAX_TIME_MS - MIN_TIME_MS);
                self.delay_samples
                    .set_target(ms_to_samples(ms, self.sample_rate));
            }
            "feedback" => self.feedback.set_target(v * 0.9),
            "shimmer" => self.shimmer.set_target(v),
            "lift" => {
                self.lift = v;
                self.shifter.set_semitones((v - 0.5) * 24.0);
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

    /// Process a mono sample, returning the wet echo signal.
    pub fn process(&mut self, input: f32) -> f32 {
        let delay = self.delay_samples.advance();
        let fb = self.feedback.advance();
        let shimmer = self.shimmer.advance();

        let delayed = self.line.read(delay);
        let damped = self.damp.process(delayed);
        let looped = if self.shifter.is_active() {
            lerp(damped, self.shifter.process(damped), shimmer)
        } else {
            damped
        };
        self.line.write(flush_denormal(input + looped * fb));
        delayed
    }

    /// Process one stereo pair through the mono loop.
    pub fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        let wet = self.process((left + right) * 0.5);
        (wet, wet)
    }

    /// Clear delay, shifter, and loop filter.
    pub fn reset(&mut self) {
        self.line.clear();
        self.shifter.reset();
        self.damp.reset();
        self.delay_samples.snap_to_target();
        self.feedback.snap_to_target();
        self.shimmer.snap_to_target();
    }

    /// Rebuild buffers for a new sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        let delay_ratio = self.delay_samples.target() / self.sample_rate;
        self.sample_rate = sample_rate;
        let mut line = DelayLine::from_time(sample_rate, MAX_TIME_MS / 1000.0 + 0.1);
        line.set_interpolation(Interpolation::Cubic);
        self.line = line;
        self.shifter.set_sample_rate(sample_rate);
        self.shifter.set_semitones((self.lift - 0.5) * 24.0);
        self.damp.set_sample_rate(sample_rate);
        self.delay_samples.set_immediate(delay_ratio * sample_rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_repeat_at_delay_time() {
        let mut ghost = Ghost::new(48000.0);
        ghost.set_parameter("time", 0.0); // 100ms = 4800 samples
        ghost.set_parameter("feedback", 0.5);
        ghost.reset();

        ghost.process(1.0);
        let mut peak_index: u32 = 0;
        let mut peak = 0.0f32;
        for i in 1..9600 {
            let out = ghost.process(0.0).abs();
            if out > peak {
                peak = out;
                peak_index = i;
            }
        }
        assert!(
            peak_index.abs_diff(4800) <= 4,
            "First repeat expected near 4800, got {}",
            peak_index
        );
    }

    #[test]
    fn neutral_lift_bypasses_shifter() {
        let mut with_lift = Ghost::new(48000.0);
        with_lift.set_parameter("lift", 0.5);
        with_lift.set_parameter("shimmer", 1.0);
        with_lift.set_parameter("time", 0.0);
        with_lift.set_parameter("feedback", 0.5);
        with_lift.reset();

        let mut plain = Ghost::new(48000.0);
        plain.set_parameter("lift", 0.5);
        plain.set_parameter("shimmer", 0.0);
        plain.set_parameter("time", 0.0);
        plain.set_parameter("feedback", 0.5);
        plain.reset();

        // With the lift at unison, shimmer amount must not matter
        for i in 0..24_000 {
            let input = if i == 0 { 1.0 } else { 0.0 };
            let a = with_lift.process(input);
            let b = plain.process(input);
            assert_eq!(a, b, "Unison lift should skip the shifter at sample {}", i);
        }
    }

    #[test]
    fn tail_decays() {
        let mut ghost = Ghost::new(48000.0);
        ghost.set_parameter("time", 0.0);
        ghost.set_parameter("feedback", 0.6);
        ghost.set_parameter("shimmer", 0.8);
        ghost.set_parameter("lift", 1.0);
        ghost.reset();

        ghost.process(1.0);
        let mut late_peak = 0.0f32;
        for i in 0..192_000 {
            let out = ghost.process(0.0);
            assert!(out.is_finite());
            if i > 180_000 {
                late_peak = late_peak.max(out.abs());
            }
        }
        assert!(late_peak < 0.01, "Shimmer tail should decay, got {}", late_peak);
    }

    #[test]
    fn reset_silences() {
        let mut ghost = Ghost::new(48000.0);
        ghost.set_parameter("feedback", 0.8);
        for _ in 0..48_000 {
            ghost.process(0.7);
        }
        ghost.reset();
        for _ in 0..8192 {
            assert_eq!(ghost.process(0.0), 0.0, "Loop should be silent after reset");
        }
    }
}
