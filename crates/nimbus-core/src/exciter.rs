//! Harmonic exciter for the "glow" character.
//!
//! Soft saturation generates harmonics; two resonant bandpass filters pick
//! out midrange and presence bands of that harmonic content, which is blended
//! back at low level. The blend is energy-neutral: the dry path is attenuated
//! as the harmonic path comes up, so the stage neither pumps nor decays the
//! loop it sits in.

use crate::svf::StateVariableFilter;
use libm::tanhf;

/// Saturation + twin bandpass resonator exciter.
///
/// `amount` in [0, 1] scales both the drive into the saturator and the level
/// of re-injected harmonics. At 0 the stage is a pass-through.
#[derive(Debug, Clone)]
pub struct GlowExciter {
    band_low: StateVariableFilter,
    band_high: StateVariableFilter,
    amount: f32,
}

impl GlowExciter {
    /// Resonator centers in Hz: warm midrange and airy presence.
    const LOW_CENTER_HZ: f32 = 1200.0;
    const HIGH_CENTER_HZ: f32 = 3400.0;

    /// Create an exciter at the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            band_low: StateVariableFilter::new(sample_rate, Self::LOW_CENTER_HZ, 1.4),
            band_high: StateVariableFilter::new(sample_rate, Self::HIGH_CENTER_HZ, 1.8),
            amount: 0.0,
        }
    }

    /// Set the excitation amount, clamped to [0, 1].
    #[inline]
    pub fn set_amount(&mut self, amount: f32) {
        self.amount = amount.clamp(0.0, 1.0);
    }

    /// Current excitation amount.
    #[inline]
    pub fn amount(&self) -> f32 {
        self.amount
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        if self.amount <= 0.0 {
            return input;
        }

        let drive = 1.0 + self.amount * 2.5;
        let saturated = tanhf(input * drive) / drive;

        let harmonics =
            self.band_low.process(saturated).bandpass + self.band_high.process(saturated).bandpass;

        // Energy-neutral blend: dry level gives way as harmonics come in
        let mix = self.amount * 0.35;
        (input * (1.0 - mix * 0.5)) + harmonics * mix
    }

    /// Reset resonator state.
    pub fn reset(&mut self) {
        self.band_low.reset();
        self.band_high.reset();
    }

    /// Update the sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.band_low.set_sample_rate(sample_rate);
        self.band_high.set_sample_rate(sample_rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rms(exciter: &mut GlowExciter, freq: f32) -> f32 {
        let sample_rate = 48000.0;
        let n = 48000;
        let mut acc = 0.0f32;
        for i in 0..n {
            let x = 0.5 * libm::sinf(core::f32::consts::TAU * freq * i as f32 / sample_rate);
            let out = exciter.process(x);
            if i > n / 2 {
                acc += out * out;
            }
        }
        libm::sqrtf(acc * 2.0 / n as f32)
    }

    #[test]
    fn zero_amount_is_passthrough() {
        let mut exciter = GlowExciter::new(48000.0);
        exciter.set_amount(0.0);
        for i in 0..1000 {
            let x = libm::sinf(i as f32 * 0.1);
            assert_eq!(exciter.process(x), x);
        }
    }

    #[test]
    fn blend_is_roughly_energy_neutral() {
        let mut dry = GlowExciter::new(48000.0);
        dry.set_amount(0.0);
        let mut wet = GlowExciter::new(48000.0);
        wet.set_amount(0.8);

        let dry_rms = rms(&mut dry, 440.0);
        let wet_rms = rms(&mut wet, 440.0);
        let ratio = wet_rms / dry_rms;
        assert!(
            ratio > 0.7 && ratio < 1.4,
            "Excited level should stay near dry level, ratio {}",
            ratio
        );
    }

    #[test]
    fn adds_harmonic_content() {
        // A low tone through the exciter should gain energy near the
        // resonator bands that a pass-through lacks.
        let sample_rate = 48000.0;
        let mut exciter = GlowExciter::new(48000.0);
        exciter.set_amount(1.0);
        let mut probe = StateVariableFilter::new(sample_rate, 1200.0, 4.0);
        let mut probe_dry = StateVariableFilter::new(sample_rate, 1200.0, 4.0);

        let mut excited_band = 0.0f32;
        let mut dry_band = 0.0f32;
        for i in 0..48000 {
            let x = 0.8 * libm::sinf(core::f32::consts::TAU * 400.0 * i as f32 / sample_rate);
            let e = exciter.process(x);
            if i > 24000 {
                let b = probe.process(e).bandpass;
                excited_band += b * b;
                let d = probe_dry.process(x).bandpass;
                dry_band += d * d;
            }
        }
        assert!(
            excited_band > dry_band,
            "Exciter should add band energy: {} vs {}",
            excited_band,
            dry_band
        );
    }

    #[test]
    fn finite_and_bounded() {
        let mut exciter = GlowExciter::new(48000.0);
        exciter.set_amount(1.0);
        for i in 0..10000 {
            let x = if i % 2 == 0 { 1.0 } else { -1.0 };
            let out = exciter.process(x);
            assert!(out.is_finite());
            assert!(out.abs() < 4.0);
        }
    }
}
