//! Grain-based pitch shifter.
//!
//! Two overlapping grains read from a small ring buffer at delays that sweep
//! linearly, which resamples the signal at a rate of `2^(semitones/12)`.
//! Each grain is weighted by a Hann window keyed to its sweep phase, and the
//! grains sit half a cycle apart, so one is always fading in while the other
//! fades out, giving a continuous shift with no block boundaries.
//!
//! When the requested shift is below about one cent the shifter reports
//! itself inactive; callers skip it entirely rather than pay the comb
//! filtering of two correlated taps for an inaudible shift.

use crate::delay::{DelayLine, Interpolation};
use crate::math::semitone_ratio;
use libm::{cosf, floorf};

/// Two-grain delay-line pitch shifter with Hann crossfade.
///
/// ```rust
/// use nimbus_core::GrainPitchShifter;
///
/// let mut shifter = GrainPitchShifter::new(48000.0);
/// shifter.set_semitones(7.0); // perfect fifth up
/// let out = shifter.process(0.5);
/// ```
#[derive(Debug, Clone)]
pub struct GrainPitchShifter {
    buffer: DelayLine,
    /// Grain sweep window in samples
    window: f32,
    /// Sweep phase of the first grain, in [0, 1)
    phase: f32,
    /// Playback ratio: 2^(semitones/12)
    ratio: f32,
    semitones: f32,
}

impl GrainPitchShifter {
    /// Grain window length in milliseconds. Long enough that the sweep stays
    /// slow, short enough to avoid obvious doubling.
    const WINDOW_MS: f32 = 55.0;

    /// Shifts below this many semitones (~1 cent) are treated as neutral.
    const NEUTRAL_EPSILON: f32 = 0.01;

    /// Create a pitch shifter at the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        let window = Self::WINDOW_MS * sample_rate / 1000.0;
        let mut buffer = DelayLine::new(window as usize + 8);
        buffer.set_interpolation(Interpolation::Cubic);
        Self {
            buffer,
            window,
            phase: 0.0,
            ratio: 1.0,
            semitones: 0.0,
        }
    }

    /// Set the shift in semitones, clamped to ±24.
    pub fn set_semitones(&mut self, semitones: f32) {
        self.semitones = semitones.clamp(-24.0, 24.0);
        self.ratio = semitone_ratio(self.semitones);
    }

    /// Current shift in semitones.
    pub fn semitones(&self) -> f32 {
        self.semitones
    }

    /// True when the configured shift is audible (≥ ~1 cent).
    ///
    /// Callers should bypass [`process`](Self::process) when this is false.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.semitones.abs() >= Self::NEUTRAL_EPSILON
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.buffer.write(input);

        // Tap delays sweep at rate (1 - ratio): a rising delay replays the
        // buffer slower (pitch down), a falling delay replays faster (up).
        self.phase += (1.0 - self.ratio) / self.window;
        self.phase -= floorf(self.phase);

        let phase2 = {
            let p = self.phase + 0.5;
            p - floorf(p)
        };

        let d1 = 1.0 + self.phase * self.window;
        let d2 = 1.0 + phase2 * self.window;

        // Hann weights: a grain is silent exactly when its delay wraps
        let g1 = 0.5 - 0.5 * cosf(core::f32::consts::TAU * self.phase);
        let g2 = 1.0 - g1;

        self.buffer.read(d1) * g1 + self.buffer.read(d2) * g2
    }

    /// Clear the ring buffer and grain phases.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.phase = 0.0;
    }

    /// Update the sample rate, resizing the grain window.
    ///
    /// Reallocates the ring buffer; only call from a non-audio context.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        let window = Self::WINDOW_MS * sample_rate / 1000.0;
        let mut buffer = DelayLine::new(window as usize + 8);
        buffer.set_interpolation(Interpolation::Cubic);
        self.buffer = buffer;
        self.window = window;
        self.phase = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::TAU;

    /// Estimate the dominant frequency of `signal` by counting rising
    /// zero crossings.
    fn dominant_freq(signal: &[f32], sample_rate: f32) -> f32 {
        let mut crossings = 0;
        let mut first = None;
        let mut last = 0;
        for i in 1..signal.len() {
            if signal[i - 1] <= 0.0 && signal[i] > 0.0 {
                crossings += 1;
                if first.is_none() {
                    first = Some(i);
                }
                last = i;
            }
        }
        if crossings < 2 {
            return 0.0;
        }
        let span = (last - first.unwrap()) as f32 / sample_rate;
        (crossings - 1) as f32 / span
    }

    #[test]
    fn neutral_below_one_cent() {
        let mut shifter = GrainPitchShifter::new(48000.0);
        shifter.set_semitones(0.005);
        assert!(!shifter.is_active());
        shifter.set_semitones(0.02);
        assert!(shifter.is_active());
        shifter.set_semitones(-0.02);
        assert!(shifter.is_active());
    }

    #[test]
    fn semitones_clamped() {
        let mut shifter = GrainPitchShifter::new(48000.0);
        shifter.set_semitones(60.0);
        assert_eq!(shifter.semitones(), 24.0);
    }

    #[test]
    fn octave_up_doubles_frequency() {
        let sample_rate = 48000.0;
        let mut shifter = GrainPitchShifter::new(sample_rate);
        shifter.set_semitones(12.0);

        let freq = 220.0;
        let mut output = Vec::new();
        for i in 0..48000 {
            let x = libm::sinf(TAU * freq * i as f32 / sample_rate);
            let y = shifter.process(x);
            if i > 24000 {
                output.push(y);
            }
        }

        let measured = dominant_freq(&output, sample_rate);
        assert!(
            (measured - 440.0).abs() < 25.0,
            "Octave up from 220 Hz should read ~440 Hz, got {}",
            measured
        );
    }

    #[test]
    fn octave_down_halves_frequency() {
        let sample_rate = 48000.0;
        let mut shifter = GrainPitchShifter::new(sample_rate);
        shifter.set_semitones(-12.0);

        let freq = 440.0;
        let mut output = Vec::new();
        for i in 0..48000 {
            let x = libm::sinf(TAU * freq * i as f32 / sample_rate);
            let y = shifter.process(x);
            if i > 24000 {
                output.push(y);
            }
        }

        let measured = dominant_freq(&output, sample_rate);
        assert!(
            (measured - 220.0).abs() < 15.0,
            "Octave down from 440 Hz should read ~220 Hz, got {}",
            measured
        );
    }

    #[test]
    fn output_bounded_for_bounded_input() {
        let mut shifter = GrainPitchShifter::new(48000.0);
        shifter.set_semitones(7.3);
        for i in 0..96000 {
            let x = libm::sinf(i as f32 * 0.07) * 0.9;
            let out = shifter.process(x);
            assert!(out.is_finite());
            assert!(out.abs() <= 1.5, "Grain sum overshot: {}", out);
        }
    }

    #[test]
    fn reset_silences() {
        let mut shifter = GrainPitchShifter::new(48000.0);
        shifter.set_semitones(5.0);
        for i in 0..4800 {
            shifter.process(libm::sinf(i as f32 * 0.1));
        }
        shifter.reset();
        let out = shifter.process(0.0);
        assert_eq!(out, 0.0);
    }
}
