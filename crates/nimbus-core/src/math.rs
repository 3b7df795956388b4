//! Mathematical utilities for DSP.
//!
//! Allocation-free helpers shared across the effect library, suitable for
//! `no_std`. All transcendental math goes through `libm`.

use libm::{exp2f, expf, logf, tanhf};

/// Convert decibels to linear gain.
///
/// 0 dB → 1.0, −6 dB → ~0.5, +6 dB → ~2.0.
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    // 10^(dB/20) = e^(dB * ln(10)/20)
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert linear gain to decibels.
///
/// Input is floored at 1e-10 to avoid -inf.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    logf(linear.max(1e-10)) * FACTOR
}

/// Pitch ratio for a shift in semitones: `2^(semitones/12)`.
///
/// +12 → 2.0 (octave up), −12 → 0.5 (octave down), 0 → 1.0.
#[inline]
pub fn semitone_ratio(semitones: f32) -> f32 {
    exp2f(semitones / 12.0)
}

/// Soft clip using hyperbolic tangent.
///
/// Smooth saturation approaching ±1 asymptotically. Used as the final bound
/// on feedback paths where a hard clip would add harsh harmonics.
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    tanhf(x)
}

/// Linear interpolation between `a` (t=0) and `b` (t=1).
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Convert milliseconds to samples.
#[inline]
pub fn ms_to_samples(ms: f32, sample_rate: f32) -> f32 {
    ms * sample_rate / 1000.0
}

/// Convert samples to milliseconds.
#[inline]
pub fn samples_to_ms(samples: f32, sample_rate: f32) -> f32 {
    samples * 1000.0 / sample_rate
}

/// Flush subnormal (denormalized) floats to zero.
///
/// Subnormal floats cause severe CPU performance degradation on most
/// architectures. Values below 1e-20 are replaced with zero, leaving margin
/// before the IEEE 754 subnormal range begins. Use in any feedback loop where
/// signal can decay indefinitely toward zero.
#[allow(clippy::inline_always)]
#[inline(always)]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

/// Crossfade between dry and wet signals.
///
/// Equivalent to `dry * (1 - mix) + wet * mix` with one fewer multiply.
///
/// * `mix` - Blend factor in \[0.0, 1.0\]: 0.0 = all dry, 1.0 = all wet
#[inline]
pub fn wet_dry_mix(dry: f32, wet: f32, mix: f32) -> f32 {
    dry + (wet - dry) * mix
}

/// Stereo crossfade between dry and wet signals.
#[inline]
pub fn wet_dry_mix_stereo(dry_l: f32, dry_r: f32, wet_l: f32, wet_r: f32, mix: f32) -> (f32, f32) {
    (
        wet_dry_mix(dry_l, wet_l, mix),
        wet_dry_mix(dry_r, wet_r, mix),
    )
}

/// Sum stereo to mono (average).
#[inline]
pub fn mono_sum(left: f32, right: f32) -> f32 {
    (left + right) * 0.5
}
