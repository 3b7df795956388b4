//! DC blocking filter.
//!
//! First-order highpass (Julius O. Smith's DC blocker):
//!
//! ```text
//! H(z) = (1 - z^-1) / (1 - R * z^-1)
//! ```
//!
//! Nonlinear stages inside feedback networks accumulate near-zero-frequency
//! bias; a blocker per output channel removes it without touching audible
//! content. The -3 dB cutoff is `f_c = (1 - R) / (2π) * f_s`.

use core::f32::consts::PI;

/// First-order highpass DC blocker.
///
/// ```rust
/// use nimbus_core::DcBlocker;
///
/// let mut blocker = DcBlocker::new(48000.0);
/// let out = blocker.process(0.5 + 0.1); // 0.1 DC offset removed over time
/// ```
#[derive(Debug, Clone)]
pub struct DcBlocker {
    /// R coefficient (pole position; controls cutoff)
    coeff: f32,
    /// Previous input x[n-1]
    x_prev: f32,
    /// Previous output y[n-1]
    y_prev: f32,
}

impl DcBlocker {
    /// Default cutoff target in Hz: below the audible range, high enough to
    /// settle quickly.
    const DEFAULT_CUTOFF_HZ: f32 = 5.0;

    /// Create a DC blocker with a ~5 Hz cutoff at the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            coeff: Self::calculate_coeff(Self::DEFAULT_CUTOFF_HZ, sample_rate),
            x_prev: 0.0,
            y_prev: 0.0,
        }
    }

    /// Create a DC blocker with an explicit R coefficient.
    ///
    /// Higher values give a lower cutoff. Clamped to [0.9, 0.9999].
    pub fn with_coeff(coeff: f32) -> Self {
        Self {
            coeff: coeff.clamp(0.9, 0.9999),
            x_prev: 0.0,
            y_prev: 0.0,
        }
    }

    /// Process one sample: `y[n] = x[n] - x[n-1] + R * y[n-1]`.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = input - self.x_prev + self.coeff * self.y_prev;
        self.x_prev = input;
        self.y_prev = output;
        output
    }

    /// Reset state to zero.
    pub fn reset(&mut self) {
        self.x_prev = 0.0;
        self.y_prev = 0.0;
    }

    /// Update the sample rate, keeping the ~5 Hz cutoff.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.coeff = Self::calculate_coeff(Self::DEFAULT_CUTOFF_HZ, sample_rate);
    }

    /// Current R coefficient.
    pub fn coeff(&self) -> f32 {
        self.coeff
    }

    /// `R = 1 - 2π*fc/fs`, clamped to [0.9, 0.9999].
    fn calculate_coeff(cutoff_hz: f32, sample_rate: f32) -> f32 {
        let r = 1.0 - (2.0 * PI * cutoff_hz / sample_rate);
        r.clamp(0.9, 0.9999)
    }
}
