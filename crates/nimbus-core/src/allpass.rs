//! Schroeder allpass filters for reverb diffusion.
//!
//! An allpass passes all frequencies at equal magnitude while smearing phase,
//! which densifies an impulse response without coloring it. Because the
//! structure is unity-gain for any coefficient in (−1, 1), it is safe to run
//! unconditionally inside a feedback loop.
//!
//! Two variants:
//!
//! - [`AllpassFilter`] - fixed integer delay, used for static diffusion
//! - [`ModulatedAllpass`] - the read offset wanders around a nominal delay,
//!   adding chorus-like shimmer to the diffusion without discontinuities

use crate::delay::{DelayLine, Interpolation};
use crate::flush_denormal;

/// Fixed-delay Schroeder allpass.
///
/// Lattice form: with `v = input + coeff·delayed` written into the buffer,
/// the output is `−coeff·v + delayed`. The transfer function is
/// `(−coeff + z^−D) / (1 − coeff·z^−D)`, exactly unity magnitude at every
/// frequency.
///
/// # Example
///
/// ```rust
/// use nimbus_core::AllpassFilter;
///
/// let mut allpass = AllpassFilter::new(500);
/// allpass.set_coeff(0.5);
/// let out = allpass.process(1.0);
/// ```
#[derive(Debug, Clone)]
pub struct AllpassFilter {
    delay: DelayLine,
    delay_samples: f32,
    coeff: f32,
}

impl AllpassFilter {
    /// Create an allpass with the given delay length in samples.
    pub fn new(delay_samples: usize) -> Self {
        let mut delay = DelayLine::new(delay_samples + 6);
        delay.set_interpolation(Interpolation::None);
        Self {
            delay,
            delay_samples: delay_samples as f32,
            coeff: 0.5,
        }
    }

    /// Set the diffusion coefficient, clamped to (−0.99, 0.99).
    ///
    /// Values around 0.5 suit reverb diffusion.
    #[inline]
    pub fn set_coeff(&mut self, coeff: f32) {
        self.coeff = coeff.clamp(-0.99, 0.99);
    }

    /// Current diffusion coefficient.
    #[inline]
    pub fn coeff(&self) -> f32 {
        self.coeff
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let delayed = self.delay.read(self.delay_samples);
        let v = input + self.coeff * delayed;
        self.delay.write(flush_denormal(v));
        -self.coeff * v + delayed
    }

    /// Clear internal state.
    pub fn clear(&mut self) {
        self.delay.clear();
    }

    /// Delay length in samples.
    pub fn delay_samples(&self) -> usize {
        self.delay_samples as usize
    }
}

/// Schroeder allpass whose read position is modulated around a nominal delay.
///
/// Same lattice topology as [`AllpassFilter`], but each call takes a
/// modulation offset added to the nominal delay and reads with linear
/// interpolation, so a slowly swept offset produces smooth diffusion shimmer.
#[derive(Debug, Clone)]
pub struct ModulatedAllpass {
    delay: DelayLine,
    nominal_delay: f32,
    coeff: f32,
}

impl ModulatedAllpass {
    /// Create a modulated allpass.
    ///
    /// # Arguments
    /// * `nominal_delay` - Center delay in samples
    /// * `mod_headroom` - Largest expected |offset| in samples
    pub fn new(nominal_delay: usize, mod_headroom: usize) -> Self {
        Self {
            delay: DelayLine::new(nominal_delay + mod_headroom + 6),
            nominal_delay: nominal_delay as f32,
            coeff: 0.5,
        }
    }

    /// Set the diffusion coefficient, clamped to (−0.99, 0.99).
    #[inline]
    pub fn set_coeff(&mut self, coeff: f32) {
        self.coeff = coeff.clamp(-0.99, 0.99);
    }

    /// Process one sample, reading at `nominal_delay + mod_offset`.
    ///
    /// The read is clamped inside the buffer by the delay line, so any finite
    /// offset is safe.
    #[inline]
    pub fn process(&mut self, input: f32, mod_offset: f32) -> f32 {
        let delayed = self.delay.read(self.nominal_delay + mod_offset);
        let v = input + self.coeff * delayed;
        self.delay.write(flush_denormal(v));
        -self.coeff * v + delayed
    }

    /// Clear internal state.
    pub fn clear(&mut self) {
        self.delay.clear();
    }
}
