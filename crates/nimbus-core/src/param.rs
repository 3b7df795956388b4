//! Parameter smoothing for zipper-free control changes.
//!
//! Control updates arrive as discrete steps; applying them directly produces
//! audible "zipper" artifacts. [`SmoothedParam`] tracks a raw target and a
//! smoothed shadow value that moves toward the target by a one-pole update
//! each sample:
//!
//! ```text
//! smoothed += (target - smoothed) * coeff
//! ```
//!
//! The coefficient is either derived from a smoothing time in milliseconds or
//! set directly as a fixed per-sample constant. Parameters that control delay
//! *time* want a much smaller coefficient (≈1e-4) than amplitude or mix
//! controls (≈1e-3 to 2e-3): a delay-time step is a pitch artifact, not just a
//! level step.
//!
//! ```rust
//! use nimbus_core::SmoothedParam;
//!
//! let mut gain = SmoothedParam::with_config(1.0, 48000.0, 10.0);
//! gain.set_target(0.5);
//! for _ in 0..480 {
//!     let g = gain.advance();
//!     // use g for processing...
//! }
//! ```

use libm::expf;

/// A parameter with built-in one-pole smoothing.
#[derive(Debug, Clone)]
pub struct SmoothedParam {
    /// Current smoothed value
    current: f32,
    /// Target value we're smoothing towards
    target: f32,
    /// Per-sample smoothing coefficient (1 = instant, →0 = very slow)
    coeff: f32,
    /// Sample rate in Hz
    sample_rate: f32,
    /// Smoothing time in milliseconds; negative when the coefficient is fixed
    smoothing_time_ms: f32,
}

impl SmoothedParam {
    /// Create a new smoothed parameter with an initial value.
    ///
    /// Smoothing is disabled until [`set_smoothing_time_ms`](Self::set_smoothing_time_ms)
    /// or a `with_*` constructor configures it.
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            coeff: 1.0,
            sample_rate: 48000.0,
            smoothing_time_ms: 0.0,
        }
    }

    /// Create a smoothed parameter from a smoothing time constant.
    ///
    /// # Arguments
    /// * `initial` - Initial value (current and target)
    /// * `sample_rate` - Sample rate in Hz
    /// * `smoothing_time_ms` - Time constant in milliseconds
    pub fn with_config(initial: f32, sample_rate: f32, smoothing_time_ms: f32) -> Self {
        let mut param = Self::new(initial);
        param.sample_rate = sample_rate;
        param.smoothing_time_ms = smoothing_time_ms;
        param.recalculate_coeff();
        param
    }

    /// Create a smoothed parameter with a fixed per-sample coefficient.
    ///
    /// The coefficient is independent of sample rate and is not recalculated
    /// by [`set_sample_rate`](Self::set_sample_rate). Use small values
    /// (≈1e-4) for delay-time parameters and moderate values (≈1e-3) for
    /// amplitude-like parameters.
    pub fn with_coeff(initial: f32, coeff: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            coeff: coeff.clamp(0.0, 1.0),
            sample_rate: 48000.0,
            smoothing_time_ms: -1.0,
        }
    }

    /// Set the target value; the parameter smooths toward it.
    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Set target and snap the current value to it (no smoothing).
    #[inline]
    pub fn set_immediate(&mut self, value: f32) {
        self.target = value;
        self.current = value;
    }

    /// Update the sample rate.
    ///
    /// Recalculates the coefficient unless it was fixed via
    /// [`with_coeff`](Self::with_coeff).
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        if self.smoothing_time_ms >= 0.0 {
            self.recalculate_coeff();
        }
    }

    /// Set the smoothing time in milliseconds.
    ///
    /// 0 disables smoothing; 5–10 ms suits gain/mix; 100+ ms for slow drifts.
    pub fn set_smoothing_time_ms(&mut self, time_ms: f32) {
        self.smoothing_time_ms = time_ms.max(0.0);
        self.recalculate_coeff();
    }

    /// Advance by one sample and return the new smoothed value.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        self.current += self.coeff * (self.target - self.current);
        self.current
    }

    /// Current smoothed value without advancing.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// The raw target value.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// True once the smoothed value is within epsilon of the target.
    #[inline]
    pub fn is_settled(&self) -> bool {
        (self.current - self.target).abs() < 1e-6
    }

    /// Jump the smoothed value to the target immediately.
    #[inline]
    pub fn snap_to_target(&mut self) {
        self.current = self.target;
    }

    /// Derive the one-pole coefficient from sample rate and smoothing time.
    ///
    /// The update `y[n] = y[n-1] + coeff * (target - y[n-1])` is a first-order
    /// IIR with pole at `1 - coeff`. For a time constant `tau` seconds (63.2%
    /// of the step), `coeff = 1 - exp(-1 / (tau * sample_rate))`. After 5·tau
    /// the value has covered 99.3% of the step.
    fn recalculate_coeff(&mut self) {
        if self.smoothing_time_ms <= 0.0 || self.sample_rate <= 0.0 {
            self.coeff = 1.0;
        } else {
            let samples = self.smoothing_time_ms / 1000.0 * self.sample_rate;
            self.coeff = 1.0 - expf(-1.0 / samples);
        }
    }
}

impl Default for SmoothedParam {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instant_when_no_smoothing() {
        let mut param = SmoothedParam::new(1.0);
        param.set_target(0.5);
        let val = param.advance();
        assert!((val - 0.5).abs() < 1e-6, "Should snap instantly");
    }

    #[test]
    fn converges_within_five_time_constants() {
        let mut param = SmoothedParam::with_config(0.0, 48000.0, 10.0);
        param.set_target(1.0);

        // 50ms = 5x the time constant
        for _ in 0..(48000 * 50 / 1000) {
            param.advance();
        }

        assert!(
            (param.get() - 1.0).abs() < 0.01,
            "Should be within 1% of target after 5 tau, got {}",
            param.get()
        );
    }

    #[test]
    fn gradual_approach() {
        let mut param = SmoothedParam::with_config(0.0, 48000.0, 10.0);
        param.set_target(1.0);

        // After one time constant, a one-pole reaches ~63.2%
        for _ in 0..480 {
            param.advance();
        }
        let expected = 1.0 - expf(-1.0);
        assert!(
            (param.get() - expected).abs() < 0.05,
            "After one time constant, expected ~{}, got {}",
            expected,
            param.get()
        );
    }

    #[test]
    fn fixed_coeff_survives_sample_rate_change() {
        let mut param = SmoothedParam::with_coeff(0.0, 1e-4);
        param.set_sample_rate(96000.0);
        param.set_target(1.0);
        param.advance();
        // One step of coeff 1e-4 from 0 toward 1
        assert!((param.get() - 1e-4).abs() < 1e-7);
    }

    #[test]
    fn fixed_small_coeff_moves_slowly() {
        let mut fast = SmoothedParam::with_coeff(0.0, 2e-3);
        let mut slow = SmoothedParam::with_coeff(0.0, 1e-4);
        fast.set_target(1.0);
        slow.set_target(1.0);
        for _ in 0..1000 {
            fast.advance();
            slow.advance();
        }
        assert!(
            slow.get() < fast.get(),
            "Delay-time coefficient should lag the mix coefficient: {} vs {}",
            slow.get(),
            fast.get()
        );
    }

    #[test]
    fn snap_and_settled() {
        let mut param = SmoothedParam::with_config(0.0, 48000.0, 100.0);
        param.set_target(0.7);
        assert!(!param.is_settled());
        param.snap_to_target();
        assert!(param.is_settled());
        assert_eq!(param.get(), 0.7);
    }
}
