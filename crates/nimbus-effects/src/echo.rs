//! Tempo-syncable echo.
//!
//! A feedback delay with one-pole damping in the loop. Delay time either
//! runs free from the `time` control or locks to a musical division of the
//! host tempo, forwarded through the reserved `bpm` parameter key.
//!
//! # Parameters
//!
//! - `time`: free delay time, 0..1 → 20–1500 ms
//! - `feedback`: repeat level, 0..1 → loop gain 0–0.95
//! - `tone`: loop damping cutoff, 0..1 → 600 Hz–12 kHz
//! - `sync`: ≥0.5 locks the delay to the tempo division
//! - `division`: normalized pick from half note down to sixteenth
//! - `bpm`: reserved tempo key (any positive value)

use crate::params::ParamMap;
use nimbus_core::{
    DelayLine, Interpolation, NoteDivision, OnePole, SmoothedParam, flush_denormal, ms_to_samples,
};
use libm::powf;

const MIN_TIME_MS: f32 = 20.0;
const MAX_TIME_MS: f32 = 1500.0;
/// Extra capacity so slow half-note divisions at low tempo still fit.
const MAX_DELAY_SECONDS: f32 = 2.5;

/// Feedback echo with damping and tempo sync.
#[derive(Debug, Clone)]
pub struct Echo {
    line_left: DelayLine,
    line_right: DelayLine,
    damp_left: OnePole,
    damp_right: OnePole,

    /// Smoothed delay in samples at the delay-time coefficient, so time changes
    /// glide instead of stepping
    delay_samples: SmoothedParam,
    feedback: SmoothedParam,
    tone: SmoothedParam,

    time: f32,
    sync: bool,
    division: NoteDivision,
    bpm: f32,

    sample_rate: f32,
    cached_tone: f32,
}

impl Echo {
    /// Create an echo at the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        let mut make_line = || {
            let mut line = DelayLine::from_time(sample_rate, MAX_DELAY_SECONDS);
            line.set_interpolation(Interpolation::Cubic);
            line
        };
        let default_time = 0.25;
        let default_samples =
            ms_to_samples(MIN_TIME_MS + default_time * (MAX_TIME_MS - MIN_TIME_MS), sample_rate);
        Self {
            line_left: make_line(),
            line_right: make_line(),
            damp_left: OnePole::new(sample_rate, 6000.0),
            damp_right: OnePole::new(sample_rate, 6000.0),
            delay_samples: SmoothedParam::with_coeff(default_samples, 1e-4),
            feedback: SmoothedParam::with_coeff(0.4, 1e-3),
            tone: SmoothedParam::with_coeff(0.7, 1e-3),
            time: default_time,
            sync: false,
            division: NoteDivision::Quarter,
            bpm: 120.0,
            sample_rate,
            cached_tone: -1.0,
        }
    }

    /// Set one named parameter; unknown keys are ignored.
    pub fn set_parameter(&mut self, key: &str, value: f64) {
        match key {
            "time" => {
                self.time = (value as f32).clamp(0.0, 1.0);
                self.retarget_delay();
            }
            "feedback" => {
                let v = (value as f32).clamp(0.0, 1.0);
                self.feedback.set_target(v * 0.95);
            }
            "tone" => self.tone.set_target((value as f32).clamp(0.0, 1.0)),
            "sync" => {
                self.sync = value >= 0.5;
                self.retarget_delay();
            }
            "division" => {
                self.division = NoteDivision::from_normalized((value as f32).clamp(0.0, 1.0));
                self.retarget_delay();
            }
            crate::params::BPM_KEY => {
                self.bpm = (value as f32).max(1.0);
                self.retarget_delay();
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
        self.feedback.advance();
        self.update_tone();

        Self::tick(
            &mut self.line_left,
            &mut self.damp_left,
            input,
            delay,
            self.feedback.get(),
        )
    }

    /// Process one stereo pair.
    pub fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        let delay = self.delay_samples.advance();
        self.feedback.advance();
        self.update_tone();
        let fb = self.feedback.get();

        (
            Self::tick(&mut self.line_left, &mut self.damp_left, left, delay, fb),
            Self::tick(&mut self.line_right, &mut self.damp_right, right, delay, fb),
        )
    }

    /// Clear delay buffers and loop filters.
    pub fn reset(&mut self) {
        self.line_left.clear();
        self.line_right.clear();
        self.damp_left.reset();
        self.damp_right.reset();
        self.delay_samples.snap_to_target();
        self.feedback.snap_to_target();
        self.tone.snap_to_target();
        self.cached_tone = -1.0;
        self.update_tone();
    }

    /// Rebuild buffers for a new sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        let mut make_line = || {
            let mut line = DelayLine::from_time(sample_rate, MAX_DELAY_SECONDS);
            line.set_interpolation(Interpolation::Cubic);
            line
        };
        self.line_left = make_line();
        self.line_right = make_line();
        self.damp_left.set_sample_rate(sample_rate);
        self.damp_right.set_sample_rate(sample_rate);
        self.retarget_delay();
        self.delay_samples.snap_to_target();
        self.cached_tone = -1.0;
        self.update_tone();
    }

    /// Current delay target in milliseconds (after sync resolution).
    pub fn delay_ms(&self) -> f32 {
        self.delay_samples.target() * 1000.0 / self.sample_rate
    }

    #[inline]
    fn tick(line: &mut DelayLine, damp: &mut OnePole, input: f32, delay: f32, fb: f32) -> f32 {
        let delayed = line.read(delay);
        let looped = damp.process(delayed);
        line.write(flush_denormal(input + looped * fb));
        delayed
    }

    fn retarget_delay(&mut self) {
        let ms = if self.sync {
            self.division.to_ms(self.bpm)
        } else {
            MIN_TIME_MS + self.time * (MAX_TIME_MS - MIN_TIME_MS)
        };
        let ms = ms.clamp(MIN_TIME_MS, MAX_DELAY_SECONDS * 1000.0);
        self.delay_samples
            .set_target(ms_to_samples(ms, self.sample_rate));
    }

    fn update_tone(&mut self) {
        let tone = self.tone.advance();
        if (tone - self.cached_tone).abs() < 0.001 {
            return;
        }
        self.cached_tone = tone;
        // 600 Hz .. 12 kHz, exponential sweep
        let cutoff = 600.0 * powf(20.0, tone);
        self.damp_left.set_frequency(cutoff);
        self.damp_right.set_frequency(cutoff);
    }
}
