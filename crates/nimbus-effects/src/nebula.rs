//! "Nebula", an 8-line feedback delay network reverb.
//!
//! Eight cross-coupled delay lines, each with its own diffusion, damping,
//! pitch and excitation chain, mixed every sample by an 8×8 Hadamard
//! butterfly. The Hadamard transform is orthogonal, so the mix redistributes
//! energy between lines without amplifying it; decay is controlled entirely
//! by the feedback gain and the per-line damping.
//!
//! # Parameters
//!
//! All in [0, 1]:
//!
//! - `cloud`: diffusion density (allpass coefficients)
//! - `depth`: size; scales line delays and lengthens decay
//! - `glow`: brightness; reduces damping and feeds the harmonic exciter
//! - `drift`: modulation; delay wobble and diffusion random walk
//! - `shift`: pitch shift in the feedback path, 0.5 = neutral, full range ±24 st
//! - `sustain`: feedback emphasis; near 1.0 the tail approaches self-sustain
//!   (drone regime), bounded by the safety governor
//!
//! # Stability
//!
//! The network has two defenses against divergence and nothing else: a
//! feedback governor that walks the global feedback gain down one small step
//! per violating sample whenever any post-gain line magnitude exceeds a
//! threshold, and a soft tanh bound on the stored feedback. Output is
//! DC-blocked and soft-limited per channel.

use crate::params::ParamMap;
use nimbus_core::{
    AllpassFilter, DcBlocker, DelayLine, GlowExciter, GrainPitchShifter, Interpolation, OnePole,
    RandomWalk, SmoothedParam, SoftLimiter, db_to_linear, flush_denormal, lerp, mono_sum,
    ms_to_samples, soft_clip,
};

/// Number of delay lines in the network.
pub const LINE_COUNT: usize = 8;

/// Base line delays in milliseconds, mutually detuned to avoid coincident
/// resonances. Scaled by the `depth` control at runtime.
const BASE_DELAYS_MS: [f32; LINE_COUNT] = [31.1, 37.3, 41.9, 43.7, 53.0, 59.3, 61.7, 67.9];

/// Per-line delay modulation rates in Hz: slow, mutually detuned sinusoids.
const MOD_RATES_HZ: [f32; LINE_COUNT] = [0.071, 0.089, 0.103, 0.127, 0.149, 0.167, 0.181, 0.197];

/// `depth` maps the delay scale into [0.6, 2.2].
const DEPTH_SCALE_MIN: f32 = 0.6;
const DEPTH_SCALE_SPAN: f32 = 1.6;

/// Post-gain magnitude above which the governor takes a safety step.
const SAFETY_THRESHOLD: f32 = 2.0;
/// Governor reduction per violating sample.
const GOVERNOR_STEP: f32 = 0.002;
/// Governor recovery per quiet sample.
const GOVERNOR_RECOVERY: f32 = 2e-6;
/// The governor never ducks feedback below this fraction.
const GOVERNOR_FLOOR: f32 = 0.1;

/// Fixed low-pass reference for the damping blend.
const DAMP_REFERENCE_HZ: f32 = 3500.0;

/// Stereo tap: per-line weight, cross-feed, and make-up gain.
const TAP_SCALE: f32 = 0.25;
const CROSS_FEED: f32 = 0.2;
const MAKEUP_DB: f32 = 2.5;

/// Output limiter ceiling.
const LIMITER_CEILING: f32 = 0.85;

/// 1/√8, the normalization for the 8-point Hadamard butterfly.
const HADAMARD_SCALE: f32 = 0.353_553_39;

/// In-place 8-point Hadamard transform: three stages of pairwise
/// sum/difference, then a 1/√8 scale. Orthogonal, hence energy-preserving.
#[inline]
fn hadamard8(v: &mut [f32; LINE_COUNT]) {
    let mut h = 1;
    while h < LINE_COUNT {
        let mut i = 0;
        while i < LINE_COUNT {
            for j in i..i + h {
                let a = v[j];
                let b = v[j + h];
                v[j] = a + b;
                v[j + h] = a - b;
            }
            i += h * 2;
        }
        h *= 2;
    }
    for x in v.iter_mut() {
        *x *= HADAMARD_SCALE;
    }
}

/// One delay line with its per-line transform chain.
#[derive(Debug, Clone)]
struct FdnLine {
    delay: DelayLine,
    /// Unscaled nominal delay in samples
    base_delay: f32,
    diffuser_a: AllpassFilter,
    diffuser_b: AllpassFilter,
    damp: OnePole,
    shifter: GrainPitchShifter,
    exciter: GlowExciter,
    /// Slow diffusion drift, instance-owned for deterministic rendering
    walk: RandomWalk,
    mod_phase: f32,
    /// Per-line starting phase, restored on clear
    base_phase: f32,
    mod_inc: f32,
    /// Injection polarity decorrelates adjacent lines
    inject_gain: f32,
    /// Feedback sample stored for the next tick
    feedback: f32,
}

impl FdnLine {
    fn new(index: usize, sample_rate: f32) -> Self {
        let base_delay = ms_to_samples(BASE_DELAYS_MS[index], sample_rate);
        // Capacity covers the maximum depth scale plus modulation headroom
        let max_seconds = BASE_DELAYS_MS[index] / 1000.0 * 2.3 + 0.004;
        let mut delay = DelayLine::from_time(sample_rate, max_seconds);
        delay.set_interpolation(Interpolation::Cubic);

        let diff_a = ms_to_samples(5.1 + index as f32 * 0.83, sample_rate) as usize;
        let diff_b = ms_to_samples(7.9 + index as f32 * 1.07, sample_rate) as usize;

        Self {
            delay,
            base_delay,
            diffuser_a: AllpassFilter::new(diff_a.max(8)),
            diffuser_b: AllpassFilter::new(diff_b.max(8)),
            damp: OnePole::new(sample_rate, DAMP_REFERENCE_HZ),
            shifter: GrainPitchShifter::new(sample_rate),
            exciter: GlowExciter::new(sample_rate),
            walk: RandomWalk::new(0x4E42_0001u32.wrapping_add(index as u32 * 7919), 0.002),
            mod_phase: index as f32 / LINE_COUNT as f32 * core::f32::consts::TAU,
            base_phase: index as f32 / LINE_COUNT as f32 * core::f32::consts::TAU,
            mod_inc: core::f32::consts::TAU * MOD_RATES_HZ[index] / sample_rate,
            inject_gain: if index % 2 == 0 { 0.5 } else { -0.5 },
            feedback: 0.0,
        }
    }

    fn clear(&mut self) {
        self.delay.clear();
        self.diffuser_a.clear();
        self.diffuser_b.clear();
        self.damp.reset();
        self.shifter.reset();
        self.exciter.reset();
        self.walk.reset();
        self.mod_phase = self.base_phase;
        self.feedback = 0.0;
    }
}

/// 8-line FDN reverb.
///
/// ```rust
/// use nimbus_effects::Nebula;
///
/// let mut nebula = Nebula::new(48000.0);
/// nebula.set_parameter("depth", 0.8);
/// let (l, r) = nebula.process_stereo(0.5, 0.5);
/// ```
#[derive(Debug, Clone)]
pub struct Nebula {
    lines: [FdnLine; LINE_COUNT],

    // Smoothed controls. `depth` moves line delays, so it uses the slow
    // delay-time coefficient; the rest use mix-rate coefficients.
    cloud: SmoothedParam,
    depth: SmoothedParam,
    glow: SmoothedParam,
    drift: SmoothedParam,
    shift: SmoothedParam,
    sustain: SmoothedParam,

    /// Global feedback safety multiplier in [GOVERNOR_FLOOR, 1]
    governor: f32,

    dc_left: DcBlocker,
    dc_right: DcBlocker,
    limiter: SoftLimiter,

    sample_rate: f32,
    makeup: f32,

    /// Cached shift value; grain ratio is only recomputed on real change
    cached_shift: f32,
}

impl Nebula {
    /// Create a Nebula reverb at the given sample rate with default
    /// parameters (`cloud` 0.5, `depth` 0.5, `glow` 0.3, `drift` 0.2,
    /// `shift` neutral, `sustain` 0.5).
    pub fn new(sample_rate: f32) -> Self {
        let mut nebula = Self {
            lines: core::array::from_fn(|i| FdnLine::new(i, sample_rate)),
            cloud: SmoothedParam::with_coeff(0.5, 1e-3),
            depth: SmoothedParam::with_coeff(0.5, 1e-4),
            glow: SmoothedParam::with_coeff(0.3, 1e-3),
            drift: SmoothedParam::with_coeff(0.2, 1e-3),
            shift: SmoothedParam::with_coeff(0.5, 1e-3),
            sustain: SmoothedParam::with_coeff(0.5, 2e-3),
            governor: 1.0,
            dc_left: DcBlocker::new(sample_rate),
            dc_right: DcBlocker::new(sample_rate),
            limiter: SoftLimiter::new(sample_rate, LIMITER_CEILING),
            sample_rate,
            makeup: db_to_linear(MAKEUP_DB),
            cached_shift: -1.0,
        };
        nebula.update_shift();
        nebula
    }

    /// Set one named parameter. Values are clamped to [0, 1]; unknown keys
    /// are ignored.
    pub fn set_parameter(&mut self, key: &str, value: f64) {
        let v = (value as f32).clamp(0.0, 1.0);
        match key {
            "cloud" => self.cloud.set_target(v),
            "depth" => self.depth.set_target(v),
            "glow" => self.glow.set_target(v),
            "drift" => self.drift.set_target(v),
            "shift" => self.shift.set_target(v),
            "sustain" => self.sustain.set_target(v),
            _ => {}
        }
    }

    /// Apply a parameter map via [`set_parameter`](Self::set_parameter).
    pub fn update_parameters(&mut self, params: &ParamMap) {
        for (key, value) in params.iter() {
            self.set_parameter(key, value);
        }
    }

    /// Process a mono sample; the stereo tails are averaged back down.
    pub fn process(&mut self, input: f32) -> f32 {
        let (l, r) = self.process_stereo(input, input);
        mono_sum(l, r)
    }

    /// Process one stereo pair, returning the wet reverb signal.
    #[allow(clippy::needless_range_loop)]
    pub fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        // Advance smoothed controls
        let cloud = self.cloud.advance();
        let depth = self.depth.advance();
        let glow = self.glow.advance();
        let drift = self.drift.advance();
        self.shift.advance();
        let sustain = self.sustain.advance();

        self.update_shift();

        let mono = mono_sum(left, right);
        let depth_scale = DEPTH_SCALE_MIN + depth * DEPTH_SCALE_SPAN;
        let mod_depth = ms_to_samples(0.2 + drift * 1.3, self.sample_rate);
        let damp_amount = (0.2 + depth * 0.5 - glow * 0.25).clamp(0.1, 0.85);
        let exciter_amount = glow * 0.6;
        let shifter_active = self.lines[0].shifter.is_active();

        let mut outs = [0.0f32; LINE_COUNT];

        for i in 0..LINE_COUNT {
            let line = &mut self.lines[i];

            // 1. Inject: dry input plus last sample's feedback
            line.delay
                .write(flush_denormal(mono * line.inject_gain + line.feedback));

            // 2. Read at the modulated delay (cubic Hermite)
            line.mod_phase += line.mod_inc;
            if line.mod_phase >= core::f32::consts::TAU {
                line.mod_phase -= core::f32::consts::TAU;
            }
            let delay_samples =
                line.base_delay * depth_scale + libm::sinf(line.mod_phase) * mod_depth;
            let mut v = line.delay.read(delay_samples);

            // 3. Per-line transform chain: diffusion → damping → pitch → glow
            let diff_coeff = (0.25 + cloud * 0.45 + line.walk.step() * 0.12 * drift).clamp(0.05, 0.85);
            line.diffuser_a.set_coeff(diff_coeff);
            line.diffuser_b.set_coeff(diff_coeff * 0.8);
            v = line.diffuser_a.process(v);
            v = line.diffuser_b.process(v);

            // Blend toward the low-pass reference; never fully closed, so the
            // tail can't freeze into silence
            let lp = line.damp.process(v);
            v = lerp(v, lp, damp_amount);

            if shifter_active {
                v = line.shifter.process(v);
            }

            line.exciter.set_amount(exciter_amount);
            v = line.exciter.process(v);

            outs[i] = v;
        }

        // 4. Hadamard mix: orthogonal redistribution across lines
        let mut mixed = outs;
        hadamard8(&mut mixed);

        // 5. Feedback governor and soft bound
        let feedback_gain = (0.62 + depth * 0.25 + sustain * 0.18).min(1.05) * self.governor;
        let mut violated = false;
        for i in 0..LINE_COUNT {
            let after_gain = mixed[i] * feedback_gain;
            if after_gain.abs() > SAFETY_THRESHOLD {
                violated = true;
            }
            self.lines[i].feedback =
                flush_denormal(SAFETY_THRESHOLD * soft_clip(after_gain / SAFETY_THRESHOLD));
        }
        if violated {
            // One safety step per violating sample, never an instant cut
            self.governor = (self.governor - GOVERNOR_STEP).max(GOVERNOR_FLOOR);
            #[cfg(feature = "tracing")]
            tracing::trace!(governor = self.governor, "feedback governor step");
        } else if self.governor < 1.0 {
            self.governor = (self.governor + GOVERNOR_RECOVERY).min(1.0);
        }

        // 6. Stereo tap: even lines left, odd lines right, with cross-feed
        let tap_l = (outs[0] + outs[2] + outs[4] + outs[6]) * TAP_SCALE;
        let tap_r = (outs[1] + outs[3] + outs[5] + outs[7]) * TAP_SCALE;
        let out_l = (tap_l + tap_r * CROSS_FEED) * self.makeup;
        let out_r = (tap_r + tap_l * CROSS_FEED) * self.makeup;

        // 7. Post: DC block and soft-knee limiting per channel
        let out_l = self.dc_left.process(out_l);
        let out_r = self.dc_right.process(out_r);
        self.limiter.process_stereo(out_l, out_r)
    }

    /// Return all internal state to silence. Smoothed controls snap to their
    /// targets; the governor is restored to unity.
    pub fn reset(&mut self) {
        for line in &mut self.lines {
            line.clear();
        }
        self.cloud.snap_to_target();
        self.depth.snap_to_target();
        self.glow.snap_to_target();
        self.drift.snap_to_target();
        self.shift.snap_to_target();
        self.sustain.snap_to_target();
        self.governor = 1.0;
        self.dc_left.reset();
        self.dc_right.reset();
        self.limiter.reset();
        self.cached_shift = -1.0;
        self.update_shift();
    }

    /// Rebuild delay structures for a new sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.lines = core::array::from_fn(|i| FdnLine::new(i, sample_rate));
        self.dc_left.set_sample_rate(sample_rate);
        self.dc_right.set_sample_rate(sample_rate);
        self.limiter.set_sample_rate(sample_rate);
        self.cached_shift = -1.0;
        self.update_shift();
    }

    /// Shortest nominal line delay in samples at current settings, the
    /// network's onset latency.
    pub fn shortest_delay_samples(&self) -> f32 {
        let depth_scale = DEPTH_SCALE_MIN + self.depth.get() * DEPTH_SCALE_SPAN;
        let mut min = f32::MAX;
        for line in &self.lines {
            min = min.min(line.base_delay * depth_scale);
        }
        min
    }

    /// Current governor value (1.0 = no safety reduction active).
    pub fn governor(&self) -> f32 {
        self.governor
    }

    /// Push the smoothed shift control into the grain shifters when it has
    /// actually moved; `2^x` per line per sample is not worth paying for a
    /// static control.
    fn update_shift(&mut self) {
        let shift = self.shift.get();
        if (shift - self.cached_shift).abs() < 1e-4 {
            return;
        }
        self.cached_shift = shift;
        let semitones = (shift - 0.5) * 48.0;
        for line in &mut self.lines {
            line.shifter.set_semitones(semitones);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hadamard_preserves_energy() {
        let mut v = [0.9f32, -0.4, 0.2, 0.7, -0.8, 0.1, 0.5, -0.3];
        let energy_in: f32 = v.iter().map(|x| x * x).sum();
        hadamard8(&mut v);
        let energy_out: f32 = v.iter().map(|x| x * x).sum();
        assert!(
            (energy_in - energy_out).abs() < 1e-4,
            "Orthogonal mix must preserve energy: {} vs {}",
            energy_in,
            energy_out
        );
    }

    #[test]
    fn hadamard_single_line_spreads_everywhere() {
        let mut v = [0.0f32; 8];
        v[3] = 1.0;
        hadamard8(&mut v);
        for (i, x) in v.iter().enumerate() {
            assert!(
                (x.abs() - HADAMARD_SCALE).abs() < 1e-6,
                "Line {} should carry ±1/√8, got {}",
                i,
                x
            );
        }
    }

    #[test]
    fn impulse_tail_is_finite_and_bounded() {
        let mut nebula = Nebula::new(48000.0);
        let (l, r) = nebula.process_stereo(1.0, 0.0);
        assert!(l.is_finite() && r.is_finite());
        for _ in 0..96_000 {
            let (l, r) = nebula.process_stereo(0.0, 0.0);
            assert!(l.is_finite() && r.is_finite());
            assert!(l.abs() < 1.5 && r.abs() < 1.5);
        }
    }

    #[test]
    fn onset_latency_matches_shortest_line() {
        let mut nebula = Nebula::new(48000.0);
        nebula.reset();
        let shortest = nebula.shortest_delay_samples();

        nebula.process_stereo(1.0, 0.0);
        let mut first_nonzero = None;
        for i in 1..20_000 {
            let (l, r) = nebula.process_stereo(0.0, 0.0);
            if l.abs() > 1e-7 || r.abs() > 1e-7 {
                first_nonzero = Some(i);
                break;
            }
        }
        let first = first_nonzero.expect("Reverb should produce output");
        assert!(
            (first as f32) > shortest * 0.5 && (first as f32) < shortest * 2.5,
            "Onset at {} inconsistent with shortest line delay {}",
            first,
            shortest
        );
    }

    #[test]
    fn governor_engages_under_hot_feedback() {
        let mut nebula = Nebula::new(48000.0);
        nebula.set_parameter("sustain", 1.0);
        nebula.set_parameter("depth", 1.0);
        nebula.reset();

        // Hammer the network with full-scale input
        for i in 0..192_000 {
            let x = if i % 2 == 0 { 1.0 } else { -0.9 };
            let (l, r) = nebula.process_stereo(x, x);
            assert!(l.is_finite() && r.is_finite());
            assert!(l.abs() < 1.5 && r.abs() < 1.5, "Output must stay bounded");
        }
        assert!(nebula.governor() <= 1.0);
    }

    #[test]
    fn reset_returns_to_silence() {
        let mut nebula = Nebula::new(48000.0);
        for i in 0..10_000 {
            nebula.process_stereo(libm::sinf(i as f32 * 0.1), 0.3);
        }
        nebula.reset();

        // The first shortest-delay's worth of samples must be exactly zero
        let n = nebula.shortest_delay_samples() as usize;
        for i in 0..n {
            let (l, r) = nebula.process_stereo(0.0, 0.0);
            assert_eq!(l, 0.0, "Left must be silent at sample {} after reset", i);
            assert_eq!(r, 0.0, "Right must be silent at sample {} after reset", i);
        }
    }

    #[test]
    fn renders_identically_after_reset() {
        let mut nebula = Nebula::new(48000.0);
        nebula.set_parameter("drift", 0.8);
        nebula.set_parameter("cloud", 0.7);
        nebula.set_parameter("sustain", 0.6);

        // Disturb every piece of internal state, then reset
        for i in 0..12_345 {
            nebula.process_stereo(libm::sinf(i as f32 * 0.05), 0.3);
        }
        nebula.reset();

        let mut render = || {
            let mut out = Vec::with_capacity(4096);
            out.push(nebula.process_stereo(1.0, -0.5));
            for _ in 1..4096 {
                out.push(nebula.process_stereo(0.0, 0.0));
            }
            nebula.reset();
            out
        };
        let first = render();
        let second = render();
        assert_eq!(
            first, second,
            "Reset must restore phases and walks, making renders repeatable"
        );
    }

    #[test]
    fn unknown_keys_ignored_and_values_clamped() {
        let mut nebula = Nebula::new(48000.0);
        nebula.set_parameter("no_such_param", 0.9);
        nebula.set_parameter("depth", 7.0);
        nebula.set_parameter("cloud", -3.0);
        // Clamped values must land in range and processing must stay sane
        for _ in 0..4800 {
            let (l, r) = nebula.process_stereo(0.5, -0.5);
            assert!(l.is_finite() && r.is_finite());
        }
    }

    #[test]
    fn neutral_shift_skips_grain_shifters() {
        let nebula = Nebula::new(48000.0);
        assert!(
            !nebula.lines[0].shifter.is_active(),
            "Default shift of 0.5 must be neutral"
        );
    }
}
