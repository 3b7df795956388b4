//! Nimbus Core - DSP primitives for real-time audio effects
//!
//! Foundational building blocks for the nimbus effect engine, designed for
//! sample-by-sample processing with zero allocation in the audio path.
//!
//! # Building Blocks
//!
//! ## Parameter Smoothing
//!
//! - [`SmoothedParam`] - Exponential smoothing for zipper-free automation
//!
//! ## Delay & Diffusion
//!
//! - [`DelayLine`] - Circular buffer with linear/cubic-Hermite fractional reads
//! - [`AllpassFilter`] - Schroeder allpass for diffusion (unity gain)
//! - [`ModulatedAllpass`] - Allpass with a modulated read offset
//! - [`CombFilter`] - Damped feedback comb for reverb tanks
//!
//! ## Filters
//!
//! - [`OnePole`] - 6 dB/oct lowpass for damping and tone shaping
//! - [`DcBlocker`] - First-order highpass removing near-DC bias
//! - [`StateVariableFilter`] - TPT SVF with simultaneous LP/BP/HP outputs
//!
//! ## Pitch & Character
//!
//! - [`GrainPitchShifter`] - Two-grain delay-line pitch shifter with Hann crossfade
//! - [`GlowExciter`] - Saturation plus twin bandpass resonators
//!
//! ## Dynamics
//!
//! - [`EnvelopeFollower`] - Peak envelope detection
//! - [`SoftLimiter`] - Soft-knee output limiter with a hard ceiling
//!
//! ## Utilities
//!
//! - [`Lcg`] / [`RandomWalk`] - Instance-owned deterministic randomness
//! - [`NoteDivision`] - Musical division → time conversions for tempo sync
//! - Math helpers: [`db_to_linear`], [`flush_denormal`], [`wet_dry_mix`], etc.
//!
//! # no_std Support
//!
//! The crate is `no_std` compatible; disable the default `std` feature:
//!
//! ```toml
//! [dependencies]
//! nimbus-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: buffers allocate once at construction, never in `process`
//! - **No std math**: `libm` throughout, usable on embedded targets
//! - **Bounded state**: feedback paths flush denormals and clamp coefficients

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod allpass;
pub mod comb;
pub mod dc_blocker;
pub mod delay;
pub mod envelope;
pub mod exciter;
pub mod limiter;
pub mod math;
pub mod noise;
pub mod one_pole;
pub mod param;
pub mod pitch;
pub mod svf;
pub mod tempo;

pub use allpass::{AllpassFilter, ModulatedAllpass};
pub use comb::CombFilter;
pub use dc_blocker::DcBlocker;
pub use delay::{DelayLine, Interpolation};
pub use envelope::EnvelopeFollower;
pub use exciter::GlowExciter;
pub use limiter::SoftLimiter;
pub use math::{
    db_to_linear, flush_denormal, lerp, linear_to_db, mono_sum, ms_to_samples, samples_to_ms,
    semitone_ratio, soft_clip, wet_dry_mix, wet_dry_mix_stereo,
};
pub use noise::{Lcg, RandomWalk};
pub use one_pole::OnePole;
pub use param::SmoothedParam;
pub use pitch::GrainPitchShifter;
pub use svf::{StateVariableFilter, SvfOutput};
pub use tempo::NoteDivision;
