//! Musical timing for tempo-synced effects.

use libm::roundf;

/// Musical note divisions for tempo sync.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NoteDivision {
    /// Half note (2 beats)
    Half,
    /// Quarter note (1 beat)
    #[default]
    Quarter,
    /// Dotted eighth note (3/4 beat)
    DottedEighth,
    /// Eighth note (1/2 beat)
    Eighth,
    /// Sixteenth note (1/4 beat)
    Sixteenth,
}

impl NoteDivision {
    /// Number of beats this division represents.
    pub fn beats(&self) -> f32 {
        match self {
            NoteDivision::Half => 2.0,
            NoteDivision::Quarter => 1.0,
            NoteDivision::DottedEighth => 0.75,
            NoteDivision::Eighth => 0.5,
            NoteDivision::Sixteenth => 0.25,
        }
    }

    /// Duration in milliseconds at the given BPM.
    ///
    /// ```rust
    /// use nimbus_core::NoteDivision;
    ///
    /// // At 120 BPM a quarter note is 500 ms
    /// assert!((NoteDivision::Quarter.to_ms(120.0) - 500.0).abs() < 0.1);
    /// ```
    pub fn to_ms(&self, bpm: f32) -> f32 {
        self.beats() * 60000.0 / bpm.max(1.0)
    }

    /// Duration in samples at the given BPM and sample rate.
    pub fn to_samples(&self, bpm: f32, sample_rate: f32) -> f32 {
        self.to_ms(bpm) / 1000.0 * sample_rate
    }

    /// Repetition frequency in Hz at the given BPM.
    pub fn to_hz(&self, bpm: f32) -> f32 {
        (bpm.max(1.0) / 60.0) / self.beats()
    }

    /// Map a normalized control in [0, 1] onto the division set.
    ///
    /// 0 → Half, 1 → Sixteenth, evenly quantized in between. Out-of-range
    /// values clamp.
    pub fn from_normalized(value: f32) -> Self {
        const ORDER: [NoteDivision; 5] = [
            NoteDivision::Half,
            NoteDivision::Quarter,
            NoteDivision::DottedEighth,
            NoteDivision::Eighth,
            NoteDivision::Sixteenth,
        ];
        let idx = roundf(value.clamp(0.0, 1.0) * (ORDER.len() - 1) as f32) as usize;
        ORDER[idx.min(ORDER.len() - 1)]
    }
}
