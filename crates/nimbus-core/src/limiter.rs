//! Soft-knee output limiter.
//!
//! Envelope-driven gain reduction above a ceiling, followed by a smooth
//! saturating bound. Output magnitude never exceeds [`SoftLimiter::MAX_OUTPUT`],
//! while signal below the ceiling passes untouched, so there is no pumping on quiet
//! material.

use crate::envelope::EnvelopeFollower;
use libm::tanhf;

/// Peak limiter with soft-knee gain reduction and a hard output bound.
///
/// Two stages:
///
/// 1. A peak envelope follower (fast attack, slow release) drives gain
///    reduction toward `ceiling / envelope` whenever the envelope exceeds
///    the ceiling.
/// 2. Any residual overshoot is folded into the range
///    `(ceiling, MAX_OUTPUT)` by a tanh knee, so output magnitude is
///    strictly below `MAX_OUTPUT`.
#[derive(Debug, Clone)]
pub struct SoftLimiter {
    follower: EnvelopeFollower,
    ceiling: f32,
    gain: f32,
}

impl SoftLimiter {
    /// Absolute output bound; the tanh knee approaches but never reaches it.
    pub const MAX_OUTPUT: f32 = 1.5;

    /// Create a limiter with the given ceiling (clamped to [0.1, 1.2]).
    pub fn new(sample_rate: f32, ceiling: f32) -> Self {
        Self {
            follower: EnvelopeFollower::new(sample_rate, 0.5, 80.0),
            ceiling: ceiling.clamp(0.1, 1.2),
            gain: 1.0,
        }
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let env = self.follower.process(input);
        let target_gain = if env > self.ceiling {
            self.ceiling / env
        } else {
            1.0
        };
        // Smooth the gain a little so reduction engages without clicks
        self.gain += (target_gain - self.gain) * 0.05;
        Self::knee(input * self.gain, self.ceiling)
    }

    /// Process a stereo pair with linked gain (keyed from the louder channel).
    #[inline]
    pub fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        let key = left.abs().max(right.abs());
        let env = self.follower.process(key);
        let target_gain = if env > self.ceiling {
            self.ceiling / env
        } else {
            1.0
        };
        self.gain += (target_gain - self.gain) * 0.05;
        (
            Self::knee(left * self.gain, self.ceiling),
            Self::knee(right * self.gain, self.ceiling),
        )
    }

    /// Reset envelope and gain state.
    pub fn reset(&mut self) {
        self.follower.reset();
        self.gain = 1.0;
    }

    /// Update the sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.follower.set_sample_rate(sample_rate);
    }

    /// Identity below the ceiling; overshoot is compressed into
    /// `(ceiling, MAX_OUTPUT)` with a tanh curve. Continuous at the ceiling.
    #[inline]
    fn knee(x: f32, ceiling: f32) -> f32 {
        let mag = x.abs();
        if mag <= ceiling {
            x
        } else {
            let headroom = Self::MAX_OUTPUT - ceiling;
            let shaped = ceiling + headroom * tanhf((mag - ceiling) / headroom);
            shaped.copysign(x)
        }
    }
}
