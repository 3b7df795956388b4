//! Deterministic randomness for modulation.
//!
//! Effects that want organic drift keep an instance-owned [`Lcg`] rather
//! than any global RNG: given a fixed seed the sequence is reproducible,
//! which keeps rendering deterministic and tests stable.

/// Linear congruential generator (Numerical Recipes constants).
///
/// Not cryptographic, not even statistically strong. Just cheap, portable
/// noise for audio modulation.
#[derive(Debug, Clone)]
pub struct Lcg {
    state: u32,
}

impl Lcg {
    /// Create a generator from a seed.
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Next raw 32-bit value.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state
    }

    /// Uniform value in [0, 1).
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / 16_777_216.0
    }

    /// Uniform value in [-1, 1).
    #[inline]
    pub fn next_bipolar(&mut self) -> f32 {
        self.next_f32() * 2.0 - 1.0
    }
}

/// Bounded random walk in [-1, 1].
///
/// Each step nudges the value by a uniform amount scaled by `rate`; the
/// result is a slowly wandering control signal, smoother than white noise but
/// never periodic. Used for per-line diffusion drift in the FDN.
#[derive(Debug, Clone)]
pub struct RandomWalk {
    rng: Lcg,
    seed: u32,
    value: f32,
    rate: f32,
}

impl RandomWalk {
    /// Create a walk from a seed and per-step rate.
    pub fn new(seed: u32, rate: f32) -> Self {
        Self {
            rng: Lcg::new(seed),
            seed,
            value: 0.0,
            rate,
        }
    }

    /// Set the per-step rate (step magnitude bound).
    pub fn set_rate(&mut self, rate: f32) {
        self.rate = rate.max(0.0);
    }

    /// Advance one step and return the new value.
    #[inline]
    pub fn step(&mut self) -> f32 {
        self.value = (self.value + self.rng.next_bipolar() * self.rate).clamp(-1.0, 1.0);
        self.value
    }

    /// Current value without stepping.
    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Return the walk to zero and re-seed the generator, so a reset walk
    /// replays the same sequence.
    pub fn reset(&mut self) {
        self.rng = Lcg::new(self.seed);
        self.value = 0.0;
    }
}
