//! Nimbus Effects - the effect library and chain engine
//!
//! Complete audio effects built from `nimbus-core` primitives, plus the
//! machinery to run them: named parameters, serial chaining with per-slot
//! wet/dry and bypass, and a lock-free control→audio parameter bridge.
//!
//! # Effects
//!
//! - [`Nebula`] - 8-line FDN reverb with diffusion, pitch shift, and glow
//! - [`Echo`] - tempo-syncable feedback delay
//! - [`Space`] - Schroeder room reverb
//! - [`Drift`] - dual-tap modulated chorus
//! - [`Ghost`] - shimmer echo with pitch-shifted feedback
//! - [`Melt`] - degrading texture loop
//!
//! Every effect exposes the same surface: `process` / `process_stereo`
//! returning the wet signal, `set_parameter` with clamped named values,
//! `update_parameters` from a [`ParamMap`], `reset` to silence, and
//! `set_sample_rate`.
//!
//! # Chaining
//!
//! [`EffectChain`] runs up to [`MAX_SLOTS`] effects in series, built from
//! [`EffectDescriptor`] values (serializable with the `serde` feature).
//! Unknown effect ids become bypass slots, so configurations from newer
//! versions degrade gracefully.
//!
//! ```rust
//! use nimbus_effects::{EffectChain, EffectDescriptor};
//!
//! let mut chain = EffectChain::build(
//!     &[
//!         EffectDescriptor::new("echo"),
//!         EffectDescriptor::new("nebula"),
//!     ],
//!     48000.0,
//! );
//! for _ in 0..64 {
//!     let (l, r) = chain.process_stereo(0.0, 0.0);
//!     assert!(l.is_finite() && r.is_finite());
//! }
//! ```
//!
//! # Threading
//!
//! [`ParamBridge`] carries parameter changes from a control thread to the
//! audio thread without locks; see its module docs for the protocol.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod bridge;
pub mod chain;
pub mod drift;
pub mod echo;
pub mod ghost;
pub mod melt;
pub mod nebula;
pub mod params;
pub mod space;

pub use bridge::ParamBridge;
pub use chain::{EffectChain, EffectDescriptor, EffectKind, EffectSlot, MAX_SLOTS};
pub use drift::Drift;
pub use echo::Echo;
pub use ghost::Ghost;
pub use melt::Melt;
pub use nebula::{LINE_COUNT, Nebula};
pub use params::{BPM_KEY, ParamMap};
pub use space::Space;
