//! Room reverb.
//!
//! A Freeverb tank: eight parallel damped combs feeding four series allpass
//! diffusers, behind a short pre-delay. The right channel runs a detuned
//! copy of the tank for stereo width. Tunings are the classic 44.1 kHz set,
//! rescaled to the actual sample rate.
//!
//! # Parameters
//!
//! - `size`: tank size / feedback floor, 0..1
//! - `decay`: tail length on top of the size floor, 0..1
//! - `damp`: high-frequency absorption in the combs, 0..1 (1 = dark)
//! - `predelay`: gap before the tail starts, 0..1 → 0–100 ms

use crate::params::ParamMap;
use nimbus_core::{
    AllpassFilter, CombFilter, DelayLine, Interpolation, SmoothedParam, ms_to_samples,
};

/// Comb delay tunings in samples at the 44.1 kHz reference rate, mutually
/// prime to avoid coincident resonances.
const COMB_TUNINGS_44K: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];

/// Allpass diffuser tunings at the reference rate.
const ALLPASS_TUNINGS_44K: [usize; 4] = [556, 441, 341, 225];

/// Right-channel offset in samples, for decorrelation.
const STEREO_SPREAD: usize = 23;

const REFERENCE_RATE: f32 = 44100.0;
const MAX_PREDELAY_MS: f32 = 100.0;

/// Parallel-comb room reverb.
#[derive(Debug, Clone)]
pub struct Space {
    combs_left: [CombFilter; 8],
    combs_right: [CombFilter; 8],
    allpasses_left: [AllpassFilter; 4],
    allpasses_right: [AllpassFilter; 4],

    predelay_line: DelayLine,
    predelay_samples: SmoothedParam,

    size: f32,
    decay: f32,
    damp: f32,

    sample_rate: f32,
    cached_size: f32,
    cached_decay: f32,
    cached_damp: f32,
}

fn scale_to_rate(reference_samples: usize, sample_rate: f32) -> usize {
    let scaled = reference_samples as f32 * sample_rate / REFERENCE_RATE;
    (scaled as usize).max(8)
}

impl Space {
    /// Create a reverb tank at the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        let combs_left = COMB_TUNINGS_44K.map(|t| CombFilter::new(scale_to_rate(t, sample_rate)));
        let combs_right = COMB_TUNINGS_44K
            .map(|t| CombFilter::new(scale_to_rate(t + STEREO_SPREAD, sample_rate)));
        let allpasses_left = ALLPASS_TUNINGS_44K.map(|t| {
            let mut ap = AllpassFilter::new(scale_to_rate(t, sample_rate));
            ap.set_coeff(0.5);
            ap
        });
        let allpasses_right = ALLPASS_TUNINGS_44K.map(|t| {
            let mut ap = AllpassFilter::new(scale_to_rate(t + STEREO_SPREAD, sample_rate));
            ap.set_coeff(0.5);
            ap
        });
        let mut space = Self {
            combs_left,
            combs_right,
            allpasses_left,
            allpasses_right,
            predelay_line: DelayLine::from_time(sample_rate, MAX_PREDELAY_MS / 1000.0),
            // Pre-delay moves a read position; smooth it at the delay rate
            predelay_samples: SmoothedParam::with_coeff(
                ms_to_samples(10.0, sample_rate),
                1e-4,
            ),
            size: 0.5,
            decay: 0.5,
            damp: 0.4,
            sample_rate,
            cached_size: -1.0,
            cached_decay: -1.0,
            cached_damp: -1.0,
        };
        space.update_tank();
        space
    }

    /// Set one named parameter; unknown keys are ignored.
    pub fn set_parameter(&mut self, key: &str, value: f64) {
        let v = (value as f32).clamp(0.0, 1.0);
        match key {
            "size" => self.size = v,
            "decay" => self.decay = v,
            "damp" => self.damp = v,
            "predelay" => {
                self.predelay_samples
                    .set_target(ms_to_samples(v * MAX_PREDELAY_MS, self.sample_rate));
                return;
            }
            _ => return,
        }
        self.update_tank();
    }

    /// Apply a parameter map.
    pub fn update_parameters(&mut self, params: &ParamMap) {
        for (key, value) in params.iter() {
            self.set_parameter(key, value);
        }
    }

    /// Process a mono sample, returning the wet reverb signal.
    pub fn process(&mut self, input: f32) -> f32 {
        let tank_in = self.feed(input);
        let mut acc = 0.0;
        for comb in &mut self.combs_left {
            acc += comb.process(tank_in);
        }
        for allpass in &mut self.allpasses_left {
            acc = allpass.process(acc);
        }
        acc
    }

    /// Process one stereo pair through the twin tanks.
    pub fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        // Both tanks are fed the mono sum; width comes from detuning
        let tank_in = self.feed((left + right) * 0.5);

        let mut out_l = 0.0;
        for comb in &mut self.combs_left {
            out_l += comb.process(tank_in);
        }
        for allpass in &mut self.allpasses_left {
            out_l = allpass.process(out_l);
        }

        let mut out_r = 0.0;
        for comb in &mut self.combs_right {
            out_r += comb.process(tank_in);
        }
        for allpass in &mut self.allpasses_right {
            out_r = allpass.process(out_r);
        }

        (out_l, out_r)
    }

    /// Clear the tank and pre-delay.
    pub fn reset(&mut self) {
        for comb in self.combs_left.iter_mut().chain(self.combs_right.iter_mut()) {
            comb.clear();
        }
        for allpass in self
            .allpasses_left
            .iter_mut()
            .chain(self.allpasses_right.iter_mut())
        {
            allpass.clear();
        }
        self.predelay_line.clear();
        self.predelay_samples.snap_to_target();
    }

    /// Rebuild the tank for a new sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        if (sample_rate - self.sample_rate).abs() < f32::EPSILON {
            return;
        }
        let (size, decay, damp) = (self.size, self.decay, self.damp);
        let predelay_ratio = self.predelay_samples.target() / self.sample_rate;
        *self = Self::new(sample_rate);
        self.size = size;
        self.decay = decay;
        self.damp = damp;
        self.predelay_samples
            .set_immediate(predelay_ratio * sample_rate);
        self.cached_size = -1.0;
        self.update_tank();
    }

    /// Current pre-delay target in milliseconds.
    pub fn predelay_ms(&self) -> f32 {
        self.predelay_samples.target() * 1000.0 / self.sample_rate
    }

    /// Run the pre-delay and attenuate so 8 parallel combs sum near unity.
    #[inline]
    fn feed(&mut self, input: f32) -> f32 {
        let predelay = self.predelay_samples.advance();
        let delayed = self.predelay_line.read_write(input, predelay);
        delayed * 0.125
    }

    fn update_tank(&mut self) {
        if (self.size - self.cached_size).abs() < 1e-6
            && (self.decay - self.cached_decay).abs() < 1e-6
            && (self.damp - self.cached_damp).abs() < 1e-6
        {
            return;
        }
        self.cached_size = self.size;
        self.cached_decay = self.decay;
        self.cached_damp = self.damp;

        // Freeverb feedback: size sets the floor, decay fills toward 0.98
        let scaled_size = 0.28 + self.size * 0.7;
        let feedback = scaled_size + self.decay * (0.98 - scaled_size);
        for comb in self.combs_left.iter_mut().chain(self.combs_right.iter_mut()) {
            comb.set_feedback(feedback);
            comb.set_damp(self.damp);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impulse_produces_decaying_tail() {
        let mut space = Space::new(48000.0);
        space.set_parameter("size", 0.5);
        space.set_parameter("decay", 0.5);
        space.set_parameter("predelay", 0.0);

        let mut energy_early = 0.0f64;
        let mut energy_late = 0.0f64;
        let first = space.process(1.0);
        assert!(first.is_finite());
        for i in 0..48_000 {
            let out = space.process(0.0);
            assert!(out.is_finite(), "Reverb output must stay finite");
            if i < 12_000 {
                energy_early += f64::from(out * out);
            } else if i >= 36_000 {
                energy_late += f64::from(out * out);
            }
        }
        assert!(energy_early > 0.0, "Tail should contain energy");
        assert!(
            energy_late < energy_early,
            "Tail should decay: early {} late {}",
            energy_early,
            energy_late
        );
    }

    #[test]
    fn longer_decay_longer_tail() {
        let tail_energy = |decay: f64| {
            let mut space = Space::new(48000.0);
            space.set_parameter("size", 0.5);
            space.set_parameter("decay", decay);
            space.process(1.0);
            let mut energy = 0.0f64;
            for i in 0..96_000 {
                let out = space.process(0.0);
                if i >= 48_000 {
                    energy += f64::from(out * out);
                }
            }
            energy
        };

        let short = tail_energy(0.1);
        let long = tail_energy(0.9);
        assert!(
            long > short * 2.0,
            "Higher decay should lengthen the tail: short {} long {}",
            short,
            long
        );
    }

    #[test]
    fn predelay_postpones_onset() {
        let onset = |predelay: f64| {
            let mut space = Space::new(48000.0);
            space.set_parameter("predelay", predelay);
            space.reset();
            space.process(1.0);
            let mut i = 1;
            loop {
                if space.process(0.0).abs() > 1e-7 {
                    return i;
                }
                i += 1;
                assert!(i < 48_000, "Tail never arrived");
            }
        };

        let immediate = onset(0.0);
        let delayed = onset(0.5); // 50ms = 2400 samples
        assert!(
            delayed >= immediate + 2_000,
            "Pre-delay should postpone the tail: {} vs {}",
            immediate,
            delayed
        );
    }

    #[test]
    fn stereo_channels_decorrelated() {
        let mut space = Space::new(48000.0);
        let (mut sum_ll, mut sum_rr, mut sum_lr) = (0.0f64, 0.0f64, 0.0f64);
        space.process_stereo(1.0, 1.0);
        for _ in 0..48_000 {
            let (l, r) = space.process_stereo(0.0, 0.0);
            sum_ll += f64::from(l * l);
            sum_rr += f64::from(r * r);
            sum_lr += f64::from(l * r);
        }
        let correlation = sum_lr / (sum_ll.sqrt() * sum_rr.sqrt()).max(1e-12);
        assert!(
            correlation < 0.98,
            "Detuned tanks should decorrelate, correlation {}",
            correlation
        );
    }

    #[test]
    fn reset_silences_tank() {
        let mut space = Space::new(48000.0);
        for _ in 0..4096 {
            space.process(0.7);
        }
        space.reset();
        for _ in 0..8192 {
            let out = space.process(0.0);
            assert_eq!(out, 0.0, "Tank should be silent after reset");
        }
    }

    #[test]
    fn tunings_rescale_with_sample_rate() {
        assert_eq!(scale_to_rate(1116, 44100.0), 1116);
        assert_eq!(scale_to_rate(1116, 88200.0), 2232);
        // Never collapses below the delay-line minimum
        assert!(scale_to_rate(225, 8000.0) >= 8);
    }
}
