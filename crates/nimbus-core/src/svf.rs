//! State-variable filter (TPT form).
//!
//! A topology-preserving-transform SVF after Zavalishin ("The Art of VA
//! Filter Design"), producing lowpass, bandpass, and highpass outputs
//! simultaneously from one structure. Stable under audio-rate coefficient
//! changes, which makes it the right choice for resonators inside feedback
//! networks.

use crate::flush_denormal;
use libm::tanf;

/// Simultaneous filter outputs for one input sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvfOutput {
    /// Lowpass output (12 dB/oct)
    pub lowpass: f32,
    /// Bandpass output (6 dB/oct skirts)
    pub bandpass: f32,
    /// Highpass output (12 dB/oct)
    pub highpass: f32,
}

/// Two-pole state-variable filter.
///
/// ```rust
/// use nimbus_core::StateVariableFilter;
///
/// let mut svf = StateVariableFilter::new(48000.0, 1200.0, 1.5);
/// let out = svf.process(0.5);
/// let band = out.bandpass;
/// ```
#[derive(Debug, Clone)]
pub struct StateVariableFilter {
    sample_rate: f32,
    freq: f32,
    q: f32,
    // Coefficients
    g: f32,
    k: f32,
    a1: f32,
    a2: f32,
    a3: f32,
    // Integrator state
    ic1eq: f32,
    ic2eq: f32,
}

impl StateVariableFilter {
    /// Create an SVF at the given cutoff and resonance.
    ///
    /// # Arguments
    /// * `sample_rate` - Sample rate in Hz
    /// * `freq_hz` - Cutoff/center frequency in Hz
    /// * `q` - Resonance (0.5 = heavily damped, 0.707 = Butterworth, >1 = resonant)
    pub fn new(sample_rate: f32, freq_hz: f32, q: f32) -> Self {
        let mut svf = Self {
            sample_rate,
            freq: freq_hz,
            q: q.max(0.1),
            g: 0.0,
            k: 0.0,
            a1: 0.0,
            a2: 0.0,
            a3: 0.0,
            ic1eq: 0.0,
            ic2eq: 0.0,
        };
        svf.recalculate_coeffs();
        svf
    }

    /// Set the cutoff/center frequency.
    ///
    /// Clamped to [10 Hz, 0.49 * sample_rate].
    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.freq = freq_hz.clamp(10.0, self.sample_rate * 0.49);
        self.recalculate_coeffs();
    }

    /// Set the resonance (Q), floored at 0.1.
    pub fn set_q(&mut self, q: f32) {
        self.q = q.max(0.1);
        self.recalculate_coeffs();
    }

    /// Update the sample rate, keeping frequency and Q.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_coeffs();
    }

    /// Process one sample, returning all three outputs.
    #[inline]
    pub fn process(&mut self, input: f32) -> SvfOutput {
        let v3 = input - self.ic2eq;
        let v1 = self.a1 * self.ic1eq + self.a2 * v3;
        let v2 = self.ic2eq + self.a2 * self.ic1eq + self.a3 * v3;
        self.ic1eq = flush_denormal(2.0 * v1 - self.ic1eq);
        self.ic2eq = flush_denormal(2.0 * v2 - self.ic2eq);

        SvfOutput {
            lowpass: v2,
            bandpass: v1,
            highpass: input - self.k * v1 - v2,
        }
    }

    /// Reset integrator state to zero.
    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }

    fn recalculate_coeffs(&mut self) {
        let freq = self.freq.clamp(10.0, self.sample_rate * 0.49);
        self.g = tanf(core::f32::consts::PI * freq / self.sample_rate);
        self.k = 1.0 / self.q;
        self.a1 = 1.0 / (1.0 + self.g * (self.g + self.k));
        self.a2 = self.g * self.a1;
        self.a3 = self.g * self.a2;
    }
}
