//! Damped feedback comb filter for reverb tanks.
//!
//! A delay line whose output is lowpass-filtered and fed back to the input.
//! The damping makes high frequencies decay faster than lows, mimicking air
//! absorption. Banks of these (with mutually prime delay lengths) form the
//! parallel section of Schroeder/Freeverb-style reverbs.

use crate::delay::{DelayLine, Interpolation};
use crate::flush_denormal;

/// Feedback comb filter with one-pole damping in the loop.
///
/// ```text
/// out      = delay[n - D]
/// filtered = out * (1 - damp) + filtered * damp
/// delay[n] = input + filtered * feedback
/// ```
#[derive(Debug, Clone)]
pub struct CombFilter {
    delay: DelayLine,
    delay_samples: f32,
    feedback: f32,
    damp: f32,
    filter_state: f32,
}

impl CombFilter {
    /// Create a comb filter with the given delay length in samples.
    pub fn new(delay_samples: usize) -> Self {
        let mut delay = DelayLine::new(delay_samples + 6);
        delay.set_interpolation(Interpolation::None);
        Self {
            delay,
            delay_samples: delay_samples as f32,
            feedback: 0.5,
            damp: 0.2,
            filter_state: 0.0,
        }
    }

    /// Set the feedback amount, clamped to [0, 0.98] for guaranteed decay.
    #[inline]
    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, 0.98);
    }

    /// Set the damping amount in [0, 1]; higher = darker tail.
    #[inline]
    pub fn set_damp(&mut self, damp: f32) {
        self.damp = damp.clamp(0.0, 1.0);
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let out = self.delay.read(self.delay_samples);
        self.filter_state = flush_denormal(out * (1.0 - self.damp) + self.filter_state * self.damp);
        self.delay
            .write(flush_denormal(input + self.filter_state * self.feedback));
        out
    }

    /// Clear delay buffer and filter memory.
    pub fn clear(&mut self) {
        self.delay.clear();
        self.filter_state = 0.0;
    }

    /// Delay length in samples.
    pub fn delay_samples(&self) -> usize {
        self.delay_samples as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impulse_repeats_at_delay_interval() {
        let mut comb = CombFilter::new(50);
        comb.set_feedback(0.5);
        comb.set_damp(0.0);

        let mut outputs = [0.0f32; 160];
        outputs[0] = comb.process(1.0);
        for out in outputs.iter_mut().skip(1) {
            *out = comb.process(0.0);
        }

        // Echoes at 50 and 100 samples, scaled by feedback each pass
        assert!((outputs[50] - 1.0).abs() < 1e-6);
        assert!((outputs[100] - 0.5).abs() < 1e-6);
        assert!((outputs[150] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn decays_to_silence() {
        let mut comb = CombFilter::new(97);
        comb.set_feedback(0.85);
        comb.set_damp(0.3);

        for _ in 0..500 {
            comb.process(0.3);
        }
        let mut peak = 0.0f32;
        for i in 0..96000 {
            let out = comb.process(0.0).abs();
            if i > 90000 {
                peak = peak.max(out);
            }
        }
        assert!(peak < 1e-3, "Comb should decay, residual {}", peak);
    }

    #[test]
    fn feedback_clamped_below_unity() {
        let mut comb = CombFilter::new(10);
        comb.set_feedback(1.5);
        for _ in 0..10_000 {
            let out = comb.process(0.1);
            assert!(out.abs() < 100.0, "Comb must not diverge, got {}", out);
        }
    }

    #[test]
    fn no_denormals_after_silence() {
        let mut comb = CombFilter::new(64);
        comb.set_feedback(0.9);
        for _ in 0..1000 {
            comb.process(0.5);
        }
        for i in 0..100_000 {
            let out = comb.process(0.0);
            assert!(
                out == 0.0 || out.abs() > f32::MIN_POSITIVE,
                "Denormal at sample {}: {:.2e}",
                i,
                out
            );
        }
    }
}
