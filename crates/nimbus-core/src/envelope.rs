//! Peak envelope follower.
//!
//! Tracks signal amplitude with separate attack and release time constants.
//! Fast attack / slow release is the usual shape for limiting: the envelope
//! jumps up on transients and relaxes gradually.

use crate::flush_denormal;
use libm::expf;

/// Peak envelope follower with exponential attack/release.
///
/// ```rust
/// use nimbus_core::EnvelopeFollower;
///
/// let mut env = EnvelopeFollower::new(48000.0, 1.0, 100.0);
/// let level = env.process(0.8);
/// ```
#[derive(Debug, Clone)]
pub struct EnvelopeFollower {
    envelope: f32,
    attack_coeff: f32,
    release_coeff: f32,
    attack_ms: f32,
    release_ms: f32,
    sample_rate: f32,
}

impl EnvelopeFollower {
    /// Create an envelope follower.
    ///
    /// # Arguments
    /// * `sample_rate` - Sample rate in Hz
    /// * `attack_ms` - Attack time constant in milliseconds
    /// * `release_ms` - Release time constant in milliseconds
    pub fn new(sample_rate: f32, attack_ms: f32, release_ms: f32) -> Self {
        let mut follower = Self {
            envelope: 0.0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            attack_ms,
            release_ms,
            sample_rate,
        };
        follower.recalculate_coeffs();
        follower
    }

    /// Set attack and release times in milliseconds.
    pub fn set_times(&mut self, attack_ms: f32, release_ms: f32) {
        self.attack_ms = attack_ms.max(0.01);
        self.release_ms = release_ms.max(0.01);
        self.recalculate_coeffs();
    }

    /// Update the sample rate, keeping the time constants.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_coeffs();
    }

    /// Advance by one sample and return the current envelope.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let rectified = input.abs();
        let coeff = if rectified > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope = flush_denormal(rectified + coeff * (self.envelope - rectified));
        self.envelope
    }

    /// Current envelope value without advancing.
    #[inline]
    pub fn value(&self) -> f32 {
        self.envelope
    }

    /// Reset the envelope to zero.
    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }

    fn recalculate_coeffs(&mut self) {
        self.attack_coeff = expf(-1.0 / (self.attack_ms / 1000.0 * self.sample_rate).max(1.0));
        self.release_coeff = expf(-1.0 / (self.release_ms / 1000.0 * self.sample_rate).max(1.0));
    }
}
