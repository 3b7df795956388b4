//! Fractional delay line for time-based effects.
//!
//! [`DelayLine`] is a fixed-capacity circular sample buffer with a write
//! cursor that advances by exactly one per sample, wrapping modulo capacity.
//! Reads take a fractional delay in samples and interpolate.
//!
//! # Interpolation
//!
//! | Policy | Taps | Use |
//! |--------|------|-----|
//! | [`Interpolation::None`] | 1 | Fixed integer delays (Schroeder allpass) |
//! | [`Interpolation::Linear`] | 2 | Fast/noisy modulation where purity doesn't matter |
//! | [`Interpolation::Cubic`] | 4 | Pitch-critical reads (FDN lines, pitch-shift feeders) |
//!
//! The cubic policy is a Catmull-Rom Hermite: smooth through the sample
//! points, so sweeping the delay across an integer boundary produces no
//! discontinuity.
//!
//! Delay requests are clamped to `[1, capacity − 4]` samples so that the
//! 4-point interpolation window always stays inside the buffer.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;

/// Interpolation policy for fractional delay reads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    /// No interpolation (truncate to nearest sample)
    None,
    /// Linear interpolation between two samples
    #[default]
    Linear,
    /// 4-point cubic Hermite (Catmull-Rom), smoother under modulation
    Cubic,
}

/// Circular-buffer delay line with fractional reads.
///
/// The buffer is heap-allocated once at construction and never reallocates;
/// no allocation occurs during audio processing.
///
/// # Example
///
/// ```rust
/// use nimbus_core::DelayLine;
///
/// // 50ms max delay at 48kHz
/// let mut delay = DelayLine::from_time(48000.0, 0.05);
/// delay.write(1.0);
/// let out = delay.read(10.5);
/// ```
#[derive(Debug, Clone)]
pub struct DelayLine {
    /// Circular buffer storage
    buffer: Vec<f32>,
    /// Write cursor; advances by one per write, wraps modulo capacity
    write_pos: usize,
    interpolation: Interpolation,
}

impl DelayLine {
    /// Create a delay line with the given capacity in samples.
    ///
    /// # Panics
    ///
    /// Panics if `capacity < 8`: the clamp window `[1, capacity − 4]` needs
    /// room to be meaningful.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 8, "Delay capacity must be >= 8 samples");
        Self {
            buffer: vec![0.0; capacity],
            write_pos: 0,
            interpolation: Interpolation::Linear,
        }
    }

    /// Create a delay line from sample rate and maximum delay time in seconds.
    ///
    /// The capacity includes a few samples of slack for the interpolation
    /// window.
    pub fn from_time(sample_rate: f32, max_seconds: f32) -> Self {
        let max_samples = (sample_rate * max_seconds) as usize + 8;
        Self::new(max_samples)
    }

    /// Set the interpolation policy for fractional reads.
    pub fn set_interpolation(&mut self, interp: Interpolation) {
        self.interpolation = interp;
    }

    /// Read a delayed sample.
    ///
    /// `delay_samples` is the delay in samples, possibly fractional, counted
    /// back from the most recently written sample (delay 1 = last written).
    /// Requests outside `[1, capacity − 4]` are clamped.
    #[inline]
    pub fn read(&self, delay_samples: f32) -> f32 {
        let len = self.buffer.len();
        let delay_clamped = delay_samples.clamp(1.0, (len - 4) as f32);

        let delay_int = delay_clamped as usize;
        let t = delay_clamped - delay_int as f32;

        // Sample `delay_int` samples before the last written one.
        let read_pos = (self.write_pos + len - delay_int) % len;

        match self.interpolation {
            Interpolation::None => self.buffer[read_pos],

            Interpolation::Linear => {
                let older = (read_pos + len - 1) % len;
                let a = self.buffer[read_pos];
                let b = self.buffer[older];
                a + (b - a) * t
            }

            Interpolation::Cubic => {
                // Catmull-Rom through y1 (delay_int) and y2 (delay_int + 1),
                // with y0 one sample newer and y3 one sample older.
                let p0 = (read_pos + 1) % len;
                let p1 = read_pos;
                let p2 = (read_pos + len - 1) % len;
                let p3 = (read_pos + len - 2) % len;

                let y0 = self.buffer[p0];
                let y1 = self.buffer[p1];
                let y2 = self.buffer[p2];
                let y3 = self.buffer[p3];

                let c0 = y1;
                let c1 = 0.5 * (y2 - y0);
                let c2 = y0 - 2.5 * y1 + 2.0 * y2 - 0.5 * y3;
                let c3 = 0.5 * (y3 - y0) + 1.5 * (y1 - y2);

                ((c3 * t + c2) * t + c1) * t + c0
            }
        }
    }

    /// Write a sample at the cursor and advance it.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    /// Combined read-then-write.
    #[inline]
    pub fn read_write(&mut self, sample: f32, delay_samples: f32) -> f32 {
        let output = self.read(delay_samples);
        self.write(sample);
        output
    }

    /// Zero the buffer and rewind the cursor.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }

    /// Buffer capacity in samples.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Largest delay honored by [`read`](Self::read) before clamping.
    pub fn max_delay(&self) -> f32 {
        (self.buffer.len() - 4) as f32
    }
}
